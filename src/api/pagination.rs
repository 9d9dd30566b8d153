//! Page/size query parameters to LIMIT/OFFSET.

use serde::{Deserialize, Serialize};

use super::error::{ApiError, ValidationErrorBuilder};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Raw `page` / `size` query values. Kept as strings so bad input is reported
/// through the validation envelope rather than axum's plain-text rejection.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub size: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page_number: i64,
    pub page_hits: i64,
    pub start_index: i64,
    pub end_index: i64,
}

impl Pagination {
    pub fn new(page_number: i64, page_hits: i64) -> Self {
        let start_index = (page_number - 1).saturating_mul(page_hits);
        Self {
            page_number,
            page_hits,
            start_index,
            end_index: start_index.saturating_add(page_hits),
        }
    }

    pub fn from_params(params: &PageParams) -> Result<Self, ApiError> {
        let mut errors = ValidationErrorBuilder::new();

        let page_number = parse_positive(params.page.as_deref(), 1, "page", &mut errors);
        let page_hits = parse_positive(params.size.as_deref(), DEFAULT_PAGE_SIZE, "size", &mut errors);

        if page_hits > MAX_PAGE_SIZE {
            errors.add("size", format!("size must be at most {}", MAX_PAGE_SIZE));
        }

        errors.finish()?;
        Ok(Self::new(page_number, page_hits))
    }

    pub fn limit(&self) -> i64 {
        self.page_hits
    }

    pub fn offset(&self) -> i64 {
        self.start_index
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

fn parse_positive(
    raw: Option<&str>,
    default: i64,
    field: &str,
    errors: &mut ValidationErrorBuilder,
) -> i64 {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => default,
        Some(value) => match value.parse::<i64>() {
            Ok(n) if n >= 1 => n,
            Ok(_) => {
                errors.add(field, format!("{} must be at least 1", field));
                default
            }
            Err(_) => {
                errors.add(field, format!("{} must be a whole number", field));
                default
            }
        },
    }
}
