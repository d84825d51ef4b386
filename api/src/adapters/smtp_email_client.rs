use crate::domain::{EmailClient, MessageId, TransportError, WaitlistEmail};
use anyhow::Context;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::{ExposeSecret, Secret};
use std::time::Duration;
use uuid::Uuid;

const IMPLICIT_TLS_PORT: u16 = 465;

#[derive(Clone)]
pub struct SmtpEmailClient {
    host: String,
    port: u16,
    username: String,
    password: Secret<String>,
    sender: WaitlistEmail,
    sender_name: String,
    timeout: Duration,
}

impl SmtpEmailClient {
    pub fn new(
        host: String,
        port: u16,
        username: String,
        password: Secret<String>,
        sender: WaitlistEmail,
        sender_name: String,
        timeout: Duration,
    ) -> Self {
        Self {
            host,
            port,
            username,
            password,
            sender,
            sender_name,
            timeout,
        }
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, TransportError> {
        if self.username.is_empty() || self.password.expose_secret().is_empty() {
            return Err(TransportError::NotConfigured(
                "SMTP credentials are not configured".to_string(),
            ));
        }

        let tls_parameters =
            TlsParameters::new(self.host.clone()).context("Failed to build TLS parameters")?;

        Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.host)
            .port(self.port)
            .tls(tls_for_port(self.port, tls_parameters))
            .credentials(Credentials::new(
                self.username.clone(),
                self.password.expose_secret().clone(),
            ))
            .timeout(Some(self.timeout))
            .build())
    }

    fn message(
        &self,
        recipient: &WaitlistEmail,
        subject: &str,
        html_content: &str,
        message_id: &str,
    ) -> Result<Message, anyhow::Error> {
        let from = Mailbox::new(
            Some(self.sender_name.clone()),
            self.sender
                .as_ref()
                .parse::<Address>()
                .context("Sender is not a deliverable address")?,
        );
        let to = Mailbox::new(
            None,
            recipient
                .as_ref()
                .parse::<Address>()
                .context("Recipient is not a deliverable address")?,
        );

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .message_id(Some(message_id.to_string()))
            .header(ContentType::TEXT_HTML)
            .body(html_content.to_string())
            .context("Failed to build the email message")
    }

    fn new_message_id(&self) -> MessageId {
        let domain = self
            .sender
            .as_ref()
            .rsplit_once('@')
            .map(|(_, domain)| domain)
            .unwrap_or("localhost");

        format!("<{}@{}>", Uuid::new_v4(), domain)
    }
}

/// Port 465 speaks TLS from the first byte, every other port upgrades with STARTTLS.
fn tls_for_port(port: u16, tls_parameters: TlsParameters) -> Tls {
    if port == IMPLICIT_TLS_PORT {
        Tls::Wrapper(tls_parameters)
    } else {
        Tls::Required(tls_parameters)
    }
}

#[async_trait]
impl EmailClient for SmtpEmailClient {
    #[tracing::instrument(
        name = "Sending email over SMTP",
        skip(self, subject, html_content),
        fields(smtp_host = %self.host, smtp_port = self.port)
    )]
    async fn send_email_to(
        &self,
        recipient: &WaitlistEmail,
        subject: &str,
        html_content: &str,
    ) -> Result<MessageId, TransportError> {
        let transport = self.transport()?;
        let message_id = self.new_message_id();
        let message = self.message(recipient, subject, html_content, &message_id)?;

        transport
            .send(message)
            .await
            .context("SMTP delivery failed")?;

        Ok(message_id)
    }
}
