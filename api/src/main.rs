use telemetry::{get_subscriber, init_subscriber, init_tracer};
use waitlist::configuration::get_configuration;
use waitlist::startup::Application;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let configuration = get_configuration().await?;

    let tracer = init_tracer(&configuration.telemetry)?;
    let subscriber = get_subscriber(
        configuration.telemetry.dataset_name.clone(),
        "info".into(),
        std::io::stdout,
        &configuration.telemetry,
        &tracer,
    );
    init_subscriber(subscriber);

    let application = Application::build(configuration).await?;
    tracing::info!(port = application.port(), "Waitlist API listening");
    let outcome = application.run_until_stopped().await;

    for result in tracer.force_flush() {
        if let Err(e) = result {
            tracing::error!(error.message = %e, "Failed to flush spans");
        }
    }

    outcome?;
    Ok(())
}
