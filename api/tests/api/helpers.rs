use async_trait::async_trait;
use once_cell::sync::Lazy;
use opentelemetry_sdk::trace::TracerProvider;
use secrecy::Secret;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use telemetry::{get_subscriber, init_subscriber, TelemetrySettings};
use waitlist::adapters::{build_email_client, InMemoryWaitlistStore};
use waitlist::configuration::{load_configuration, EmailProvider, Settings};
use waitlist::domain::{EntryId, StoreError, WaitlistEmail, WaitlistEntry, WaitlistStore};
use waitlist::startup::Application;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// Ensure that the `tracing` stack is only initialised once using `once_cell`
static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter = "info".to_string();
    let subscriber_name = "test".to_string();
    let telemetry_settings = TelemetrySettings {
        otlp_endpoint: "".to_string(),
        honeycomb_api_key: Secret::new("".to_string()),
        dataset_name: "test-waitlist".to_string(),
    };
    let trace_provider = TracerProvider::builder().build();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(
            subscriber_name,
            default_filter,
            std::io::stdout,
            &telemetry_settings,
            &trace_provider,
        );
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(
            subscriber_name,
            default_filter,
            std::io::sink,
            &telemetry_settings,
            &trace_provider,
        );
        init_subscriber(subscriber);
    }
});

pub struct TestApp {
    pub address: String,
    pub email_server: MockServer,
    pub store: Arc<dyn WaitlistStore>,
    pub api_client: reqwest::Client,
}

impl TestApp {
    pub async fn post_waitlist(&self, body: &serde_json::Value) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/waitlist", &self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_waitlist_raw(&self, body: &'static str) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/waitlist", &self.address))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_count(&self) -> reqwest::Response {
        self.api_client
            .get(&format!("{}/waitlist/count", &self.address))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn count(&self) -> u64 {
        let body: serde_json::Value = self.get_count().await.json().await.unwrap();
        body["count"].as_u64().unwrap()
    }

    pub async fn post_welcome_email(&self, body: &serde_json::Value) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/waitlist/welcome-email", &self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn options(&self, route: &str) -> reqwest::Response {
        self.api_client
            .request(reqwest::Method::OPTIONS, &format!("{}{}", &self.address, route))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Every send to the email provider succeeds.
    pub async fn email_provider_accepts(&self) {
        Mock::given(path("/emails"))
            .and(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "re-msg-1"})),
            )
            .named("Resend accepts the message")
            .mount(&self.email_server)
            .await;
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with_store(Arc::new(InMemoryWaitlistStore::new())).await
}

pub async fn spawn_app_with_store(store: Arc<dyn WaitlistStore>) -> TestApp {
    Lazy::force(&TRACING);

    // Launch a mock server to stand in for the Resend API
    let email_server = MockServer::start().await;

    let configuration = {
        let configuration_directory =
            Path::new(env!("CARGO_MANIFEST_DIR")).join("../configuration");
        let mut c: Settings = load_configuration(&configuration_directory)
            .await
            .expect("Failed to read configuration.");
        // Use a random OS port
        c.application.application_port = 0;
        c.application.host_name = "127.0.0.1".to_string();
        // Use the mock server as email API
        c.email_settings.provider = EmailProvider::Resend;
        c.email_settings.api.base_url = Some(email_server.uri());
        c.email_settings.api.api_key = Secret::new("re_test".to_string());
        c.email_settings.timeout_milliseconds = 500;
        c
    };

    let email_client =
        build_email_client(&configuration.email_settings).expect("Failed to build email client.");
    let application =
        Application::build_with(configuration.application, store.clone(), email_client)
            .expect("Failed to build application.");
    let address = format!("http://127.0.0.1:{}", application.port());
    let _ = tokio::spawn(application.run_until_stopped());

    TestApp {
        address,
        email_server,
        store,
        api_client: reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap(),
    }
}

pub fn waitlist_email(email: &str) -> WaitlistEmail {
    WaitlistEmail::parse(email.to_string()).unwrap()
}

/// Counts every call so tests can assert the store was never reached.
#[derive(Default)]
pub struct SpyStore {
    inner: InMemoryWaitlistStore,
    pub calls: AtomicUsize,
}

impl SpyStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WaitlistStore for SpyStore {
    async fn exists(&self, email: &WaitlistEmail) -> Result<bool, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.exists(email).await
    }

    async fn insert(&self, entry: &WaitlistEntry) -> Result<EntryId, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(entry).await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.count().await
    }

    async fn list_oldest_first(&self) -> Result<Vec<WaitlistEntry>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.list_oldest_first().await
    }
}

/// A store whose existence check never sees prior entries, so duplicates
/// are only caught by the insert.
#[derive(Default)]
pub struct StaleReadStore {
    inner: InMemoryWaitlistStore,
}

#[async_trait]
impl WaitlistStore for StaleReadStore {
    async fn exists(&self, _email: &WaitlistEmail) -> Result<bool, StoreError> {
        Ok(false)
    }

    async fn insert(&self, entry: &WaitlistEntry) -> Result<EntryId, StoreError> {
        self.inner.insert(entry).await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.inner.count().await
    }

    async fn list_oldest_first(&self) -> Result<Vec<WaitlistEntry>, StoreError> {
        self.inner.list_oldest_first().await
    }
}

pub struct FailingStore;

#[async_trait]
impl WaitlistStore for FailingStore {
    async fn exists(&self, _email: &WaitlistEmail) -> Result<bool, StoreError> {
        Err(anyhow::anyhow!("Table is unreachable").into())
    }

    async fn insert(&self, _entry: &WaitlistEntry) -> Result<EntryId, StoreError> {
        Err(anyhow::anyhow!("Table is unreachable").into())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Err(anyhow::anyhow!("Table is unreachable").into())
    }

    async fn list_oldest_first(&self) -> Result<Vec<WaitlistEntry>, StoreError> {
        Err(anyhow::anyhow!("Table is unreachable").into())
    }
}
