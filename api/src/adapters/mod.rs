mod brevo_email_client;
mod dynamodb_waitlist_store;
mod in_memory_waitlist_store;
mod resend_email_client;
mod smtp_email_client;

pub use crate::adapters::brevo_email_client::BrevoEmailClient;
pub use crate::adapters::dynamodb_waitlist_store::DynamoDbWaitlistStore;
pub use crate::adapters::in_memory_waitlist_store::InMemoryWaitlistStore;
pub use crate::adapters::resend_email_client::ResendEmailClient;
pub use crate::adapters::smtp_email_client::SmtpEmailClient;

use crate::configuration::{DatabaseSettings, EmailClientSettings, EmailProvider, StoreKind};
use crate::domain::{EmailClient, WaitlistStore};
use anyhow::{anyhow, Context};
use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, Region};
use std::sync::Arc;

const LOCAL_DYNAMODB_ENDPOINT: &str = "http://localhost:8000";

pub fn build_email_client(
    settings: &EmailClientSettings,
) -> Result<Arc<dyn EmailClient>, anyhow::Error> {
    let sender = settings.sender().map_err(|e| anyhow!(e))?;

    let email_client: Arc<dyn EmailClient> = match settings.provider {
        EmailProvider::Smtp => Arc::new(SmtpEmailClient::new(
            settings.smtp.host.clone(),
            settings.smtp.port,
            settings.smtp.username.clone(),
            settings.smtp.password.clone(),
            sender,
            settings.sender_name.clone(),
            settings.timeout(),
        )),
        EmailProvider::Resend => Arc::new(
            ResendEmailClient::new(
                settings.api_base_url(),
                sender,
                settings.sender_name.clone(),
                settings.api.api_key.clone(),
                settings.timeout(),
            )
            .context("Failed to build the Resend HTTP client")?,
        ),
        EmailProvider::Brevo => Arc::new(
            BrevoEmailClient::new(
                settings.api_base_url(),
                sender,
                settings.sender_name.clone(),
                settings.api.api_key.clone(),
                settings.timeout(),
            )
            .context("Failed to build the Brevo HTTP client")?,
        ),
    };

    Ok(email_client)
}

pub async fn build_waitlist_store(settings: &DatabaseSettings) -> Arc<dyn WaitlistStore> {
    match settings.store {
        StoreKind::InMemory => Arc::new(InMemoryWaitlistStore::new()),
        StoreKind::DynamoDb => {
            let region = RegionProviderChain::default_provider().or_else(Region::new("us-east-1"));
            let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region);
            if settings.use_local {
                loader = loader.endpoint_url(LOCAL_DYNAMODB_ENDPOINT);
            }
            let sdk_config = loader.load().await;

            Arc::new(DynamoDbWaitlistStore::new(
                aws_sdk_dynamodb::Client::new(&sdk_config),
                settings.table_name.clone(),
            ))
        }
    }
}
