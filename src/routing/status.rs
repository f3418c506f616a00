//! Outcome → HTTP status.

use axum::http::StatusCode;

use crate::command::{ErrorCategory, ErrorCollection, Outcome};

/// Status for a single error's category.
pub fn status_for_category(category: ErrorCategory) -> StatusCode {
    match category {
        ErrorCategory::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorCategory::NotFound => StatusCode::NOT_FOUND,
        ErrorCategory::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorCategory::NotAllowed => StatusCode::FORBIDDEN,
        ErrorCategory::Data | ErrorCategory::Runtime => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

/// Only a single error can promote to a specific status; more than one is
/// always 422. A failure with no errors is unknown.
pub fn status_for(errors: &ErrorCollection) -> StatusCode {
    match errors.as_slice() {
        [] => StatusCode::INTERNAL_SERVER_ERROR,
        [error] => status_for_category(error.category()),
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

pub fn status_for_outcome(outcome: &Outcome) -> StatusCode {
    match outcome {
        Outcome::Success(_) => StatusCode::OK,
        Outcome::Failure(errors) => status_for(errors),
    }
}
