// src/errors.rs
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::WorkflowState;

#[derive(Error, Debug)]
pub enum HeadshotError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Transform(String),

    #[error("Cannot move from {from} to {to}")]
    InvalidTransition {
        from: WorkflowState,
        to: WorkflowState,
    },

    #[error("{0}")]
    NotReady(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ResponseError for HeadshotError {
    fn error_response(&self) -> HttpResponse {
        match self {
            HeadshotError::Validation(_) => HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Validation error",
                "message": self.to_string()
            })),
            HeadshotError::Transform(_) => {
                HttpResponse::ServiceUnavailable().json(serde_json::json!({
                    "error": "AI service error",
                    "message": self.to_string()
                }))
            }
            HeadshotError::InvalidTransition { .. } | HeadshotError::NotReady(_) => {
                HttpResponse::Conflict().json(serde_json::json!({
                    "error": "Action not available",
                    "message": self.to_string()
                }))
            }
            HeadshotError::NotFound(_) => HttpResponse::NotFound().json(serde_json::json!({
                "error": "Not found",
                "message": self.to_string()
            })),
            HeadshotError::ImageProcessing(_) => {
                HttpResponse::UnprocessableEntity().json(serde_json::json!({
                    "error": "Image processing error",
                    "message": self.to_string()
                }))
            }
            HeadshotError::Config(_) => {
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "Configuration error",
                    "message": self.to_string()
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn statuses_follow_variant() {
        let cases = [
            (HeadshotError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (HeadshotError::Transform("down".into()), StatusCode::SERVICE_UNAVAILABLE),
            (HeadshotError::NotReady("busy".into()), StatusCode::CONFLICT),
            (HeadshotError::NotFound("session".into()), StatusCode::NOT_FOUND),
        ];
        for (err, status) in cases {
            assert_eq!(err.error_response().status(), status);
        }
    }

    #[test]
    fn transition_error_names_both_states() {
        let err = HeadshotError::InvalidTransition {
            from: WorkflowState::Generating,
            to: WorkflowState::Editing,
        };
        assert_eq!(err.to_string(), "Cannot move from GENERATING to EDITING");
        assert_eq!(err.error_response().status(), actix_web::http::StatusCode::CONFLICT);
    }
}
