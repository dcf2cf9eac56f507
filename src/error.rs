//! Error types for every stage of a request, and their HTTP mapping.

use std::path::PathBuf;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

use crate::validate::FieldError;

/// One or more payload fields failed validation.
#[derive(Debug, Clone, Error)]
#[error("request validation failed with {} error(s)", errors.len())]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template not found: {0}")]
    NotFound(String),

    #[error("failed to render template {name}: {message}")]
    Render { name: String, message: String },

    #[error("failed to load template {}: {message}", path.display())]
    Load { path: PathBuf, message: String },
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("layout failed: {0}")]
    Layout(String),

    #[error("render task failed: {0}")]
    Blocking(String),
}

impl From<taffy::TaffyError> for RenderError {
    fn from(e: taffy::TaffyError) -> Self {
        RenderError::Layout(e.to_string())
    }
}

/// Command-line configuration errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing value for {0}")]
    MissingValue(String),

    #[error("invalid value {value:?} for {flag}")]
    InvalidValue { flag: String, value: String },

    #[error("unknown argument: {0}")]
    UnknownArgument(String),
}

/// Everything a request handler can fail with.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

#[derive(Serialize)]
struct DetailBody<T: Serialize> {
    detail: T,
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Template(_) | ServiceError::Render(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        match self {
            ServiceError::Validation(e) => builder.json(DetailBody { detail: &e.errors }),
            ServiceError::Template(e) => {
                log::error!("template error: {e}");
                builder.json(DetailBody {
                    detail: "document template unavailable",
                })
            }
            ServiceError::Render(e) => {
                log::error!("render error: {e}");
                builder.json(DetailBody {
                    detail: "failed to render PDF document",
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::Loc;

    #[test]
    fn validation_maps_to_422() {
        let err = ServiceError::from(ValidationError {
            errors: vec![FieldError::new(
                vec![Loc::from("body"), Loc::from("hours")],
                "Field required",
                "missing",
            )],
        });
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn internal_errors_map_to_500() {
        let template = ServiceError::from(TemplateError::NotFound("report.html".into()));
        let render = ServiceError::from(RenderError::Layout("boom".into()));
        assert_eq!(template.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(render.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn load_error_names_the_path() {
        let err = TemplateError::Load {
            path: PathBuf::from("templates/report.html"),
            message: "unexpected end".into(),
        };
        assert!(err.to_string().contains("templates/report.html"));
    }
}
