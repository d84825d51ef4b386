use crate::domain::waitlist_email::WaitlistEmail;
use crate::utils::error_chain_fmt;
use async_trait::async_trait;
use serde::Serialize;

/// Identifier the provider assigned to an accepted message.
pub type MessageId = String;

#[derive(thiserror::Error)]
pub enum TransportError {
    #[error("{0}")]
    NotConfigured(String),
    #[error("The email provider rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[async_trait]
pub trait EmailClient: Send + Sync {
    async fn send_email_to(
        &self,
        recipient: &WaitlistEmail,
        subject: &str,
        html_content: &str,
    ) -> Result<MessageId, TransportError>;
}

/// Outcome of one send attempt, kept for logging and aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSendResult {
    pub recipient: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_message_id: Option<MessageId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl EmailSendResult {
    pub fn from_attempt(
        recipient: &WaitlistEmail,
        attempt: &Result<MessageId, TransportError>,
    ) -> Self {
        match attempt {
            Ok(message_id) => Self {
                recipient: recipient.to_string(),
                success: true,
                provider_message_id: Some(message_id.clone()),
                error_detail: None,
            },
            Err(e) => Self {
                recipient: recipient.to_string(),
                success: false,
                provider_message_id: None,
                error_detail: Some(e.to_string()),
            },
        }
    }
}

/// Send one email and record the outcome instead of propagating it.
#[tracing::instrument(
    name = "Sending an email",
    skip(email_client, subject, html_content),
    fields(recipient = %recipient)
)]
pub async fn send_and_record<TEmail: EmailClient + ?Sized>(
    email_client: &TEmail,
    recipient: &WaitlistEmail,
    subject: &str,
    html_content: &str,
) -> EmailSendResult {
    let attempt = email_client
        .send_email_to(recipient, subject, html_content)
        .await;

    match &attempt {
        Ok(message_id) => tracing::info!(message_id = %message_id, "Email accepted by provider"),
        Err(e) => tracing::warn!(
            error.cause_chain = ?e,
            error.message = %e,
            "Failed to send email"
        ),
    }

    EmailSendResult::from_attempt(recipient, &attempt)
}
