use backend::batch_notifier::{run_campaign, send_test_email, Batching};
use backend::configuration::get_configuration;
use clap::Parser;
use telemetry::{get_subscriber, init_subscriber, init_tracer};
use waitlist::adapters::{build_email_client, build_waitlist_store};

/// Email the welcome message to everyone on the waitlist.
#[derive(Parser, Debug)]
#[command(name = "send_waitlist_emails", version, about)]
struct Cli {
    /// Send a single email to this address and leave the waitlist alone
    #[arg(long, value_name = "EMAIL")]
    test: Option<String>,

    /// Recipients per batch, overriding `notifier.batch_size`
    #[arg(long)]
    batch_size: Option<usize>,

    /// Pause between batches in milliseconds, overriding `notifier.batch_delay_milliseconds`
    #[arg(long)]
    batch_delay_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut configuration = get_configuration().await?;
    if let Some(batch_size) = cli.batch_size {
        configuration.notifier.batch_size = batch_size;
    }
    if let Some(batch_delay) = cli.batch_delay_ms {
        configuration.notifier.batch_delay_milliseconds = batch_delay;
    }

    let tracer = init_tracer(&configuration.telemetry)?;
    let subscriber = get_subscriber(
        format!("{}-notifier", configuration.telemetry.dataset_name),
        "info".into(),
        std::io::stdout,
        &configuration.telemetry,
        &tracer,
    );
    init_subscriber(subscriber);

    configuration.validate()?;
    let email_client = build_email_client(&configuration.email_settings)?;

    let outcome = match cli.test {
        Some(address) => send_test_email(email_client.as_ref(), address)
            .await
            .map(|result| {
                if result.success {
                    tracing::info!(recipient = %result.recipient, "Test email sent");
                } else {
                    tracing::warn!(
                        recipient = %result.recipient,
                        error = result.error_detail.as_deref().unwrap_or_default(),
                        "Test email failed"
                    );
                }
            }),
        None => {
            let store = build_waitlist_store(&configuration.database).await;
            let batching = Batching {
                size: configuration.notifier.batch_size,
                delay: configuration.notifier.batch_delay(),
            };

            run_campaign(email_client.as_ref(), store.as_ref(), batching)
                .await
                .map(|report| {
                    for failure in &report.errors {
                        tracing::warn!(
                            recipient = %failure.recipient,
                            error = failure.error_detail.as_deref().unwrap_or_default(),
                            "Recipient was not emailed"
                        );
                    }
                })
        }
    };

    for result in tracer.force_flush() {
        if let Err(e) = result {
            tracing::error!(error.message = %e, "Failed to flush spans");
        }
    }

    outcome?;
    Ok(())
}
