use crate::domain::{EmailClient, MessageId, TransportError, WaitlistEmail};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use std::time::Duration;

#[derive(Clone)]
pub struct ResendEmailClient {
    http_client: Client,
    base_url: String,
    sender: WaitlistEmail,
    sender_name: String,
    api_key: Secret<String>,
}

impl ResendEmailClient {
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
impl EmailClient for ResendEmailClient {
    #[tracing::instrument(name = "Sending email with Resend", skip(self, subject, html_content))]
    async fn send_email_to(
        &self,
        recipient: &WaitlistEmail,
        subject: &str,
        html_content: &str,
    ) -> Result<MessageId, TransportError> {
        if self.api_key.expose_secret().is_empty() {
            return Err(TransportError::NotConfigured(
                "Resend API key is not configured".to_string(),
            ));
        }

        let url = format!("{}/emails", self.base_url);
        let from = format!("{} <{}>", self.sender_name, self.sender.as_ref());
        let request_body = SendEmailRequest {
            from: &from,
            to: vec![recipient.as_ref()],
            subject,
            html: html_content,
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request_body)
            .send()
            .await
            .context("Failed to reach the Resend API")?;

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
            .context("Resend returned an unexpected response body")?;

        Ok(sent.id)
    }
}

#[derive(serde::Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
}

#[derive(serde::Deserialize)]
struct SendEmailResponse {
    id: String,
}
