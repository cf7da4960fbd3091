// src/models/mod.rs
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use derive_more::Display;
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::store::StoreError;

pub mod history;
pub mod id;
pub mod keyframe;
pub mod model;
pub mod project;
pub mod team;
pub mod user;

pub use history::*;
pub use id::*;
pub use keyframe::*;
pub use model::*;
pub use project::*;
pub use team::*;
pub use user::*;

// JWT claims: only the user id and the expiry, nothing that can go stale
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Claims {
    pub id: String,
    pub exp: i64,
}

// HTTP-facing error kinds
#[derive(Debug, Display, PartialEq)]
pub enum ServiceError {
    #[display(fmt = "Internal Server Error")]
    InternalServerError,
    #[display(fmt = "{}", _0)]
    BadRequest(String),
    #[display(fmt = "Unauthorized")]
    Unauthorized,
    #[display(fmt = "Not Found")]
    NotFound,
    #[display(fmt = "Forbidden: you don't have permission to access this resource")]
    Forbidden,
    #[display(fmt = "{}", _0)]
    Conflict(String),
}

impl std::error::Error for ServiceError {}

impl ServiceError {
    /// Wraps a storage failure, logging it under the component tag before it
    /// is reduced to the short message the client sees.
    pub fn storage(tag: &str, err: StoreError) -> ServiceError {
        match err {
            StoreError::NotFound => ServiceError::NotFound,
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            other => {
                error!("❌ [{}] storage failure: {}", tag, other);
                ServiceError::InternalServerError
            }
        }
    }

    pub fn bad_id(raw: &str) -> ServiceError {
        ServiceError::BadRequest(format!("Invalid ID format: {}", raw))
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::Forbidden => StatusCode::FORBIDDEN,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

/// Parses a path segment into an [`Id`], answering 400 on garbage.
pub fn parse_id(raw: &str) -> Result<Id, ServiceError> {
    raw.parse().map_err(|_| ServiceError::bad_id(raw))
}
