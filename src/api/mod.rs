pub mod auth;
mod collections;
pub mod envelope;
pub mod error;
mod games;
mod images;
mod ingest;
pub mod pagination;
mod reviews;
mod users;
mod validation;

#[cfg(test)]
mod tests;

use axum::{
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let user_routes = Router::new()
        .route("/", get(users::list_users))
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route(
            "/:id",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .route("/:id/reviews", get(users::list_user_reviews));

    let game_routes = Router::new()
        .route("/", get(games::list_games))
        // Static segments take priority over /:id
        .route("/genres", get(games::list_genres))
        .route("/genres/:genre", get(games::list_games_by_genre))
        .route("/platforms", get(games::list_platforms))
        .route("/platforms/:platform", get(games::list_games_by_platform))
        .route("/sort", get(games::list_games_by_release))
        .route("/:id", get(games::get_game))
        .route("/:id/genres", get(games::get_game_genres))
        .route(
            "/:id/reviews",
            get(reviews::list_game_reviews).post(reviews::create_review),
        )
        .route("/:id/collections/:kind", patch(collections::toggle_collection))
        .route("/:id/addfavorite", patch(collections::toggle_favorite));

    let review_routes = Router::new().route("/", get(reviews::list_reviews)).route(
        "/:id",
        get(reviews::get_review)
            .patch(reviews::update_review)
            .delete(reviews::delete_review),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(greeting))
        .route("/health", get(health_check))
        .nest("/users", user_routes)
        .nest("/games", game_routes)
        .nest("/reviews", review_routes)
        .route("/genres", get(games::list_genres))
        .route("/collections/:kind", get(collections::list_collection))
        .route("/favoritegames", get(collections::list_favorites))
        .route("/create", post(images::create_image))
        .route("/fetch-games", get(ingest::fetch_games))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn greeting() -> &'static str {
    "Welcome to the gamecritic API"
}

async fn health_check() -> &'static str {
    "OK"
}
