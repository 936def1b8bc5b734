//! OpenAPI specification document and endpoints

use actix_web::{get, HttpResponse, Responder};
use utoipa::OpenApi;

use crate::api::{health, lint};
use crate::model::{LintOutcome, LintStatus, NormalizedIssue, Severity};

/// OpenAPI document covering the lint and health endpoints
#[derive(OpenApi)]
#[openapi(
    paths(
        lint::lint_document,
        lint::lint_upload,
        health::liveness,
        health::readiness,
    ),
    components(schemas(
        lint::LintRequest,
        LintOutcome,
        LintStatus,
        NormalizedIssue,
        Severity,
        health::HealthStatus,
        health::ReadinessStatus,
        health::DependencyHealth,
    )),
    tags(
        (name = "lint", description = "BPMN 2.0 document linting"),
        (name = "health", description = "Service health probes")
    )
)]
pub struct ApiDoc;

/// Serve OpenAPI JSON specification
#[get("/openapi.json")]
pub async fn openapi_json() -> impl Responder {
    HttpResponse::Ok().json(ApiDoc::openapi())
}

/// Serve OpenAPI YAML specification
#[get("/openapi.yaml")]
pub async fn openapi_yaml() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/yaml")
        .body(ApiDoc::openapi().to_yaml().unwrap())
}

/// Configure OpenAPI routes
pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(openapi_json).service(openapi_yaml);
}
