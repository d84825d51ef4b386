use crate::adapters::{build_email_client, build_waitlist_store};
use crate::configuration::{ApplicationSettings, Settings};
use crate::domain::{EmailClient, WaitlistStore};
use crate::routes::{
    health_check, join_waitlist, json_error_handler, preflight, send_welcome_email, waitlist_count,
};
use actix_web::dev::{Server, Service};
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::http::Method;
use actix_web::middleware::DefaultHeaders;
use actix_web::web::Data;
use actix_web::{web, App, HttpMessage, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;
use telemetry::CustomLevelRootSpanBuilder;
use tracing_actix_web::{RequestId, TracingLogger};

pub const ALLOWED_HEADERS: &str = "authorization, x-client-info, apikey, content-type";
pub const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub async fn build(configuration: Settings) -> Result<Self, anyhow::Error> {
        let store = build_waitlist_store(&configuration.database).await;
        let email_client = build_email_client(&configuration.email_settings)?;

        Self::build_with(configuration.application, store, email_client)
    }

    /// Serve the endpoints over an already constructed store and email client.
    pub fn build_with(
        settings: ApplicationSettings,
        store: Arc<dyn WaitlistStore>,
        email_client: Arc<dyn EmailClient>,
    ) -> Result<Self, anyhow::Error> {
        let listener = TcpListener::bind(format!(
            "{}:{}",
            settings.host_name, settings.application_port
        ))?;

        let port = listener.local_addr()?.port();
        let server = run(listener, store, email_client)?;

        Ok(Self { server, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

fn run(
    listener: TcpListener,
    store: Arc<dyn WaitlistStore>,
    email_client: Arc<dyn EmailClient>,
) -> Result<Server, anyhow::Error> {
    let store_data: Data<dyn WaitlistStore> = Data::from(store);
    let email_client_data: Data<dyn EmailClient> = Data::from(email_client);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(
                DefaultHeaders::new()
                    .add(("Access-Control-Allow-Origin", "*"))
                    .add(("Access-Control-Allow-Headers", ALLOWED_HEADERS))
                    .add(("Access-Control-Allow-Methods", ALLOWED_METHODS)),
            )
            .wrap(TracingLogger::<CustomLevelRootSpanBuilder>::new())
            .wrap_fn(|req, srv| {
                let res = srv.call(req);
                async move {
                    let mut res = res.await?;
                    let request_id = res.request().extensions().get::<RequestId>().copied();
                    if let Some(request_id) = request_id {
                        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
                            res.headers_mut()
                                .insert(HeaderName::from_static("x-request-id"), value);
                        }
                    }
                    Ok(res)
                }
            })
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .route("/health_check", web::get().to(health_check))
            .service(
                web::resource("/waitlist")
                    .route(web::post().to(join_waitlist))
                    .route(web::method(Method::OPTIONS).to(preflight)),
            )
            .service(
                web::resource("/waitlist/count")
                    .route(web::get().to(waitlist_count))
                    .route(web::method(Method::OPTIONS).to(preflight)),
            )
            .service(
                web::resource("/waitlist/welcome-email")
                    .route(web::post().to(send_welcome_email))
                    .route(web::method(Method::OPTIONS).to(preflight)),
            )
            .app_data(store_data.clone())
            .app_data(email_client_data.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
