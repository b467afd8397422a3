use crate::helper::form_helpers::JsonMap;
use crate::helper::upload_helpers::UploadError;
use crate::models::db_operations::resource_db_operations::DbError;
use crate::models::ValidationError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

const GENERIC_STORAGE_ERROR: &str = "A server error occurred. Please try again later.";
const GENERIC_PROVIDER_ERROR: &str = "The media host could not process the file. Please try again.";

/// Error type for every `/api` handler. Renders as `{success: false, error}`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
    #[error("Media host error: {0}")]
    Provider(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::Validation(e.0)
    }
}

impl From<UploadError> for ApiError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::Validation(v) => ApiError::Validation(v.0),
            UploadError::Rejected(_) | UploadError::Transport(_) => ApiError::Provider(e.to_string()),
            UploadError::Io(_) | UploadError::Blocking(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Storage(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Provider(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ApiError::Validation(msg) | ApiError::NotFound(msg) | ApiError::Conflict(msg) => msg.clone(),
            ApiError::Storage(_) | ApiError::Internal(_) => {
                log::error!("{}", self);
                GENERIC_STORAGE_ERROR.to_string()
            }
            ApiError::Provider(_) => {
                log::error!("{}", self);
                GENERIC_PROVIDER_ERROR.to_string()
            }
        };
        HttpResponse::build(self.status_code()).json(json!({ "success": false, "error": message }))
    }
}

/// `{ "success": true, <key>: value }`
pub fn success_with<T: Serialize>(key: &str, value: &T) -> Result<HttpResponse, ApiError> {
    let mut body = JsonMap::new();
    body.insert("success".to_string(), Value::Bool(true));
    body.insert(key.to_string(), serde_json::to_value(value).map_err(DbError::from)?);
    Ok(HttpResponse::Ok().json(Value::Object(body)))
}
