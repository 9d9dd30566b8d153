//! Database models split into domain-specific modules.

pub mod collection;
pub mod common;
pub mod game;
pub mod review;
pub mod user;

pub use collection::*;
pub use common::*;
pub use game::*;
pub use review::*;
pub use user::*;
