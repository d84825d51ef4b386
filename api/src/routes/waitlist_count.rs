use crate::domain::WaitlistStore;
use crate::routes::ErrorBody;
use crate::utils::error_chain_fmt;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use anyhow::Context;

#[derive(thiserror::Error)]
pub enum CountError {
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for CountError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for CountError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(ErrorBody::new("Failed to fetch waitlist count"))
    }
}

#[derive(serde::Serialize)]
pub struct CountResponse {
    pub count: u64,
}

#[tracing::instrument(name = "Counting the waitlist", skip(store))]
pub async fn waitlist_count(
    store: web::Data<dyn WaitlistStore>,
) -> Result<HttpResponse, CountError> {
    let count = store
        .count()
        .await
        .context("Failed to count waitlist entries")?;
    tracing::info!(count, "Waitlist count");

    Ok(HttpResponse::Ok().json(CountResponse { count }))
}
