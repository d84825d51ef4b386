mod health_check;
mod preflight;
mod waitlist;
mod waitlist_count;
mod welcome_email;

pub use health_check::*;
pub use preflight::*;
pub use waitlist::*;
pub use waitlist_count::*;
pub use welcome_email::*;

use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{HttpRequest, HttpResponse};

/// JSON error payload shared by every endpoint.
#[derive(serde::Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate: Option<bool>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            duplicate: None,
        }
    }

    pub fn duplicate(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            duplicate: Some(true),
        }
    }
}

/// Malformed or non-JSON request bodies are client errors.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    tracing::info!(error.message = %err, "Rejected a malformed request body");
    let response = HttpResponse::BadRequest().json(ErrorBody::new(format!(
        "Invalid request body: {}",
        err
    )));

    InternalError::from_response(err, response).into()
}
