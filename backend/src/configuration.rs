use config::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use telemetry::TelemetrySettings;
use waitlist::configuration::{load_configuration, DatabaseSettings, EmailClientSettings};

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub telemetry: TelemetrySettings,
    pub email_settings: EmailClientSettings,
    pub notifier: NotifierSettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct NotifierSettings {
    pub batch_size: usize,
    pub batch_delay_milliseconds: u64,
}

impl NotifierSettings {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_milliseconds)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Message(
                "notifier.batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Settings {
    /// Checks everything a campaign needs before any email goes out.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.notifier.validate()?;
        self.email_settings.validate()
    }
}

pub async fn get_configuration() -> Result<Settings, ConfigError> {
    let base_path = std::env::current_dir().map_err(|e| {
        ConfigError::Message(format!("Failed to determine the current directory: {}", e))
    })?;

    get_configuration_from(&base_path.join("configuration")).await
}

pub async fn get_configuration_from(configuration_directory: &Path) -> Result<Settings, ConfigError> {
    load_configuration(configuration_directory).await
}
