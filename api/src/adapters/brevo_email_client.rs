use crate::domain::{EmailClient, MessageId, TransportError, WaitlistEmail};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use std::time::Duration;

/// Brevo transactional email API (`/v3/smtp/email`).
#[derive(Clone)]
pub struct BrevoEmailClient {
    http_client: Client,
    base_url: String,
    sender: WaitlistEmail,
    sender_name: String,
    api_key: Secret<String>,
}

impl BrevoEmailClient {
    pub fn new(
        base_url: String,
        sender: WaitlistEmail,
        sender_name: String,
        api_key: Secret<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            base_url,
            sender,
            sender_name,
            api_key,
        })
    }
}

#[async_trait]
impl EmailClient for BrevoEmailClient {
    #[tracing::instrument(name = "Sending email with Brevo", skip(self, subject, html_content))]
    async fn send_email_to(
        &self,
        recipient: &WaitlistEmail,
        subject: &str,
        html_content: &str,
    ) -> Result<MessageId, TransportError> {
        if self.api_key.expose_secret().is_empty() {
            return Err(TransportError::NotConfigured(
                "Brevo API key is not configured".to_string(),
            ));
        }

        let url = format!("{}/v3/smtp/email", self.base_url);
        let request_body = SendEmailRequest {
            sender: Contact {
                name: Some(self.sender_name.as_str()),
                email: self.sender.as_ref(),
            },
            to: vec![Contact {
                name: None,
                email: recipient.as_ref(),
            }],
            subject,
            html_content,
        };

        let response = self
            .http_client
            .post(&url)
            .header("api-key", self.api_key.expose_secret())
            .header("accept", "application/json")
            .json(&request_body)
            .send()
            .await
            .context("Failed to reach the Brevo API")?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let sent: SendEmailResponse = response
            .json()
            .await
            .context("Brevo returned an unexpected response body")?;

        Ok(sent.message_id)
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailRequest<'a> {
    sender: Contact<'a>,
    to: Vec<Contact<'a>>,
    subject: &'a str,
    html_content: &'a str,
}

#[derive(serde::Serialize)]
struct Contact<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    email: &'a str,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailResponse {
    message_id: String,
}
