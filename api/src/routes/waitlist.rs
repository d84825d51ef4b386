use crate::domain::welcome_email::{render_welcome_email, WELCOME_EMAIL_SUBJECT};
use crate::domain::{
    email_client, EmailClient, StoreError, WaitlistEmail, WaitlistEntry, WaitlistStore,
    LANDING_PAGE_SOURCE,
};
use crate::routes::ErrorBody;
use crate::utils::error_chain_fmt;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use anyhow::Context;

const DUPLICATE_MESSAGE: &str =
    "This email is already on the waitlist! Check your inbox for our welcome email.";

#[derive(thiserror::Error)]
pub enum AdmissionError {
    #[error("{0}")]
    ValidationError(String),
    #[error("{}", DUPLICATE_MESSAGE)]
    Duplicate,
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for AdmissionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for AdmissionError {
    fn status_code(&self) -> StatusCode {
        match self {
            AdmissionError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AdmissionError::Duplicate => StatusCode::CONFLICT,
            AdmissionError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AdmissionError::ValidationError(message) => ErrorBody::new(message),
            AdmissionError::Duplicate => ErrorBody::duplicate(DUPLICATE_MESSAGE),
            AdmissionError::UnexpectedError(_) => {
                ErrorBody::new("Failed to join the waitlist. Please try again later.")
            }
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<StoreError> for AdmissionError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(_) => AdmissionError::Duplicate,
            StoreError::UnexpectedError(e) => AdmissionError::UnexpectedError(e),
        }
    }
}

#[derive(serde::Deserialize)]
pub struct WaitlistRequest {
    pub email: Option<String>,
}

impl TryFrom<WaitlistRequest> for WaitlistEmail {
    type Error = String;

    fn try_from(value: WaitlistRequest) -> Result<Self, Self::Error> {
        WaitlistEmail::parse(value.email.unwrap_or_default())
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    pub success: bool,
    pub data: WaitlistEntry,
    pub email_sent: bool,
}

#[tracing::instrument(
    name = "Adding an email to the waitlist",
    skip(body, store, email_client),
    fields(waitlist_email = tracing::field::Empty)
)]
pub async fn join_waitlist(
    body: web::Json<WaitlistRequest>,
    store: web::Data<dyn WaitlistStore>,
    email_client: web::Data<dyn EmailClient>,
) -> Result<HttpResponse, AdmissionError> {
    let email: WaitlistEmail = body.0.try_into().map_err(AdmissionError::ValidationError)?;
    tracing::Span::current().record("waitlist_email", tracing::field::display(&email));

    if store
        .exists(&email)
        .await
        .context("Failed to check the waitlist for an existing entry")?
    {
        tracing::info!("Email is already on the waitlist");
        return Err(AdmissionError::Duplicate);
    }

    let entry = WaitlistEntry::new(email, LANDING_PAGE_SOURCE);
    store.insert(&entry).await?;
    tracing::info!(entry_id = %entry.id, "Email added to the waitlist");

    let outcome = email_client::send_and_record(
        email_client.get_ref(),
        &entry.email,
        WELCOME_EMAIL_SUBJECT,
        &render_welcome_email(&entry.email),
    )
    .await;

    Ok(HttpResponse::Created().json(AdmissionResponse {
        success: true,
        data: entry,
        email_sent: outcome.success,
    }))
}
