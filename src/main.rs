use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod bpmn;
mod linter;
mod model;
mod service;

use api::auth::ApiKeyAuth;
use model::Config;
use service::LintService;

/// Matches the request body limit of the original deployment
const MAX_JSON_BODY_BYTES: usize = 5 * 1024 * 1024;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present (ignore if missing)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let bind_addr = config.bind_addr();

    // Parser and rule engine are stateless; build them once and share
    let lint_service = web::Data::new(LintService::new(&config));
    tracing::info!(rules = lint_service.rule_count(), "Rule engine initialized");

    if config.api_key.is_some() {
        tracing::info!("API key auth enabled for /v1 routes");
    } else {
        tracing::warn!("ACTION_API_KEY not set, /v1 routes are unauthenticated");
    }

    let api_key = config.api_key.clone();

    tracing::info!("Starting BPMN lint service on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(lint_service.clone())
            .app_data(web::JsonConfig::default().limit(MAX_JSON_BODY_BYTES))
            .wrap(Cors::permissive())
            .configure(api::health::configure)
            .configure(api::openapi::configure)
            .service(
                web::scope("/v1")
                    .wrap(ApiKeyAuth::new(api_key.clone()))
                    .configure(api::lint::configure),
            )
    })
    .bind(&bind_addr)?
    .run()
    .await
}
