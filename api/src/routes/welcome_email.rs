use crate::domain::welcome_email::{render_welcome_email, WELCOME_EMAIL_SUBJECT};
use crate::domain::{EmailClient, TransportError, WaitlistEmail};
use crate::routes::{ErrorBody, WaitlistRequest};
use crate::utils::error_chain_fmt;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};

#[derive(thiserror::Error)]
pub enum WelcomeEmailError {
    #[error("{0}")]
    ValidationError(String),
    #[error(transparent)]
    TransportError(#[from] TransportError),
}

impl std::fmt::Debug for WelcomeEmailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for WelcomeEmailError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody::new(self.to_string()))
    }
}

#[derive(serde::Serialize)]
pub struct WelcomeEmailResponse {
    pub id: String,
}

/// Sends the welcome email to an arbitrary address without touching the waitlist.
#[tracing::instrument(
    name = "Sending a welcome email",
    skip(body, email_client),
    fields(recipient = tracing::field::Empty)
)]
pub async fn send_welcome_email(
    body: web::Json<WaitlistRequest>,
    email_client: web::Data<dyn EmailClient>,
) -> Result<HttpResponse, WelcomeEmailError> {
    let recipient: WaitlistEmail = body
        .0
        .try_into()
        .map_err(WelcomeEmailError::ValidationError)?;
    tracing::Span::current().record("recipient", tracing::field::display(&recipient));

    let id = email_client
        .send_email_to(
            &recipient,
            WELCOME_EMAIL_SUBJECT,
            &render_welcome_email(&recipient),
        )
        .await?;

    Ok(HttpResponse::Ok().json(WelcomeEmailResponse { id }))
}
