use anyhow::Context;
use futures::future::join_all;
use std::time::Duration;
use waitlist::domain::email_client::send_and_record;
use waitlist::domain::welcome_email::{render_welcome_email, WELCOME_EMAIL_SUBJECT};
use waitlist::domain::{EmailClient, EmailSendResult, WaitlistEmail, WaitlistStore};
use waitlist::utils::error_chain_fmt;

#[derive(thiserror::Error)]
pub enum NotifierError {
    #[error("Invalid test recipient: {0}")]
    InvalidTestRecipient(String),
    #[error("Batch size must be at least 1")]
    InvalidBatchSize,
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for NotifierError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Batching {
    pub size: usize,
    pub delay: Duration,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CampaignReport {
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    pub batches: usize,
    /// One entry per failed recipient.
    pub errors: Vec<EmailSendResult>,
}

impl CampaignReport {
    fn record(&mut self, result: EmailSendResult) {
        if result.success {
            self.sent += 1;
        } else {
            self.failed += 1;
            self.errors.push(result);
        }
    }
}

/// Sends a single welcome email to `address`. The waitlist is not read.
#[tracing::instrument(name = "Sending a test welcome email", skip(email_client))]
pub async fn send_test_email<TEmail: EmailClient + ?Sized>(
    email_client: &TEmail,
    address: String,
) -> Result<EmailSendResult, NotifierError> {
    let recipient = WaitlistEmail::parse(address).map_err(NotifierError::InvalidTestRecipient)?;

    Ok(send_and_record(
        email_client,
        &recipient,
        WELCOME_EMAIL_SUBJECT,
        &render_welcome_email(&recipient),
    )
    .await)
}

/// Sends the welcome email to everyone on the waitlist, oldest first.
///
/// Emails within a batch go out concurrently; the next batch starts once
/// every send in the current one has settled and `batching.delay` has
/// elapsed. Individual failures are recorded in the report and never abort
/// the run.
#[tracing::instrument(name = "Running a waitlist email campaign", skip(email_client, store))]
pub async fn run_campaign<TEmail, TStore>(
    email_client: &TEmail,
    store: &TStore,
    batching: Batching,
) -> Result<CampaignReport, NotifierError>
where
    TEmail: EmailClient + ?Sized,
    TStore: WaitlistStore + ?Sized,
{
    if batching.size == 0 {
        return Err(NotifierError::InvalidBatchSize);
    }

    let entries = store
        .list_oldest_first()
        .await
        .context("Failed to read the waitlist")?;

    let mut report = CampaignReport {
        total: entries.len(),
        ..CampaignReport::default()
    };
    let batch_count = entries.len().div_ceil(batching.size);
    tracing::info!(
        total = report.total,
        batches = batch_count,
        "Starting waitlist email campaign"
    );

    for (index, batch) in entries.chunks(batching.size).enumerate() {
        if index > 0 {
            tokio::time::sleep(batching.delay).await;
        }
        tracing::info!(
            batch = index + 1,
            of = batch_count,
            recipients = batch.len(),
            "Sending batch"
        );

        let sends = batch.iter().map(|entry| async move {
            send_and_record(
                email_client,
                &entry.email,
                WELCOME_EMAIL_SUBJECT,
                &render_welcome_email(&entry.email),
            )
            .await
        });

        for result in join_all(sends).await {
            report.record(result);
        }
        report.batches += 1;
    }

    tracing::info!(
        total = report.total,
        sent = report.sent,
        failed = report.failed,
        batches = report.batches,
        "Waitlist email campaign finished"
    );

    Ok(report)
}
