use crate::domain::WaitlistEmail;
use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, Region};
use config::{ConfigError, FileFormat};
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use telemetry::TelemetrySettings;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub telemetry: TelemetrySettings,
    pub application: ApplicationSettings,
    pub email_settings: EmailClientSettings,
}

#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    pub application_port: u16,
    pub host_name: String,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    #[serde(rename = "dynamodb")]
    DynamoDb,
    InMemory,
}

#[derive(Deserialize, Clone)]
pub struct DatabaseSettings {
    pub store: StoreKind,
    pub table_name: String,
    pub use_local: bool,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmailProvider {
    Smtp,
    Resend,
    Brevo,
}

#[derive(Deserialize, Clone)]
pub struct EmailClientSettings {
    pub provider: EmailProvider,
    pub sender_email: String,
    pub sender_name: String,
    pub timeout_milliseconds: u64,
    pub smtp: SmtpSettings,
    pub api: EmailApiSettings,
}

#[derive(Deserialize, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Secret<String>,
}

pub const RESEND_API_BASE_URL: &str = "https://api.resend.com";
pub const BREVO_API_BASE_URL: &str = "https://api.brevo.com";

#[derive(Deserialize, Clone)]
pub struct EmailApiSettings {
    /// Overrides the selected provider's public endpoint.
    pub base_url: Option<String>,
    pub api_key: Secret<String>,
}

impl EmailClientSettings {
    pub fn sender(&self) -> Result<WaitlistEmail, String> {
        WaitlistEmail::parse(self.sender_email.clone())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }

    /// Base URL for the HTTP providers, defaulting to the provider's own API host.
    pub fn api_base_url(&self) -> String {
        match (&self.api.base_url, self.provider) {
            (Some(base_url), _) if !base_url.is_empty() => base_url.clone(),
            (_, EmailProvider::Brevo) => BREVO_API_BASE_URL.to_string(),
            _ => RESEND_API_BASE_URL.to_string(),
        }
    }

    /// Fail fast when the selected provider has no credentials.
    ///
    /// The HTTP handlers tolerate a misconfigured provider (the send is reported
    /// as failed); batch jobs call this before doing any work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sender().map_err(|e| {
            ConfigError::Message(format!("Invalid sender email {}: {}", self.sender_email, e))
        })?;

        let missing = match self.provider {
            EmailProvider::Smtp => {
                let mut missing = vec![];
                if self.smtp.username.is_empty() {
                    missing.push("email_settings.smtp.username");
                }
                if self.smtp.password.expose_secret().is_empty() {
                    missing.push("email_settings.smtp.password");
                }
                missing
            }
            EmailProvider::Resend | EmailProvider::Brevo => {
                if self.api.api_key.expose_secret().is_empty() {
                    vec!["email_settings.api.api_key"]
                } else {
                    vec![]
                }
            }
        };

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Message(format!(
                "Missing email credentials: {}",
                missing.join(", ")
            )))
        }
    }
}

pub async fn get_configuration() -> Result<Settings, ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| ConfigError::Message(format!("Failed to determine the current directory: {}", e)))?;

    load_configuration(&base_path.join("configuration")).await
}

/// Load any settings type from `configuration_directory`, honouring `APP_ENVIRONMENT`.
pub async fn load_configuration<T: DeserializeOwned>(
    configuration_directory: &Path,
) -> Result<T, ConfigError> {
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(ConfigError::Message)?;

    let builder = match environment {
        Environment::Local => {
            let environment_filename = format!("{}.yaml", environment.as_str());

            config::Config::builder()
                .add_source(config::File::from(
                    configuration_directory.join("base.yaml"),
                ))
                .add_source(config::File::from(
                    configuration_directory.join(environment_filename),
                ))
        }
        Environment::Production => {
            let document = fetch_configuration_parameter().await?;

            config::Config::builder()
                .add_source(config::File::from_str(&document, FileFormat::Yaml))
        }
    };

    // Add in settings from environment variables (with a prefix of APP and '__' as separator)
    // E.g. `APP_EMAIL_SETTINGS__PROVIDER=resend` would set `Settings.email_settings.provider`
    let settings = builder
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<T>()
}

async fn fetch_configuration_parameter() -> Result<String, ConfigError> {
    let parameter_name = std::env::var("CONFIG_PARAMETER_NAME")
        .map_err(|_| ConfigError::NotFound("CONFIG_PARAMETER_NAME".into()))?;

    let region = RegionProviderChain::default_provider().or_else(Region::new("us-east-1"));
    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(region)
        .load()
        .await;
    let ssm_client = aws_sdk_ssm::Client::new(&sdk_config);

    let output = ssm_client
        .get_parameter()
        .name(&parameter_name)
        .with_decryption(true)
        .send()
        .await
        .map_err(|e| {
            ConfigError::Message(format!(
                "Failed to retrieve configuration parameter {}: {}",
                parameter_name, e
            ))
        })?;

    output
        .parameter
        .and_then(|p| p.value)
        .ok_or_else(|| ConfigError::Message(format!("Parameter {} has no value", parameter_name)))
}

#[derive(Debug)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a support environment. Use either local or production",
                other
            )),
        }
    }
}
