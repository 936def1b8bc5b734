//! REST API endpoints for linting BPMN documents
//!
//! Two transports are supported: a JSON body carrying the XML (optionally
//! gzip+base64 compressed), and a multipart file upload (optionally a `.gz`
//! file, detected by its magic bytes).

use std::io::Read;

use actix_multipart::Multipart;
use actix_web::{post, web, HttpResponse};
use base64::Engine;
use flate2::read::GzDecoder;
use futures_util::TryStreamExt;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::api::error::ApiError;
use crate::model::LintOutcome;
use crate::service::LintService;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// JSON lint request. Exactly one of the two fields must carry the document.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LintRequest {
    /// BPMN 2.0 XML text
    #[serde(default, alias = "bpmnXml")]
    pub bpmn_xml: Option<String>,
    /// Gzip-compressed BPMN 2.0 XML, base64 encoded
    #[serde(default, alias = "bpmnXmlGzip")]
    pub bpmn_xml_gzip: Option<String>,
}

/// Lint a BPMN document supplied as JSON
#[utoipa::path(
    post,
    path = "/v1/lint",
    request_body = LintRequest,
    responses(
        (status = 200, description = "Lint completed; the status field reflects rule findings", body = LintOutcome),
        (status = 400, description = "Missing or unparseable document"),
        (status = 401, description = "Missing or invalid API key")
    ),
    tag = "lint"
)]
#[post("/lint")]
pub async fn lint_document(
    service: web::Data<LintService>,
    body: web::Json<LintRequest>,
) -> Result<HttpResponse, ApiError> {
    let xml = extract_xml(body.into_inner())?;
    lint_and_respond(&service, &xml)
}

/// Lint a BPMN document uploaded as a multipart file
#[utoipa::path(
    post,
    path = "/v1/lint/upload",
    responses(
        (status = 200, description = "Lint completed; the status field reflects rule findings", body = LintOutcome),
        (status = 400, description = "Missing or unparseable document"),
        (status = 401, description = "Missing or invalid API key")
    ),
    tag = "lint"
)]
#[post("/lint/upload")]
pub async fn lint_upload(
    service: web::Data<LintService>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let mut document: Option<Vec<u8>> = None;

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| ApiError::InvalidDocument(format!("invalid multipart payload: {e}")))?
    {
        let mut data = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| ApiError::InvalidDocument(format!("invalid multipart payload: {e}")))?
        {
            data.extend_from_slice(&chunk);
        }

        // First non-empty field wins; the field name is irrelevant
        if !data.is_empty() {
            document = Some(data);
            break;
        }
    }

    let data = document
        .ok_or_else(|| ApiError::MissingDocument("multipart upload contains no file".to_string()))?;

    let xml = if data.starts_with(&GZIP_MAGIC) {
        decode_gzip(&data)?
    } else {
        String::from_utf8(data)
            .map_err(|e| ApiError::InvalidDocument(format!("file is not valid UTF-8: {e}")))?
    };

    lint_and_respond(&service, &xml)
}

fn lint_and_respond(service: &LintService, xml: &str) -> Result<HttpResponse, ApiError> {
    let outcome = service.lint(xml)?;
    tracing::info!(
        status = ?outcome.status,
        issues = outcome.issues.len(),
        "Lint completed"
    );
    Ok(HttpResponse::Ok().json(outcome))
}

fn extract_xml(request: LintRequest) -> Result<String, ApiError> {
    match (request.bpmn_xml, request.bpmn_xml_gzip) {
        (Some(_), Some(_)) => Err(ApiError::InvalidDocument(
            "send either bpmn_xml or bpmn_xml_gzip, not both".to_string(),
        )),
        (Some(xml), None) => {
            if xml.trim().is_empty() {
                return Err(ApiError::MissingDocument("bpmn_xml is empty".to_string()));
            }
            Ok(xml)
        }
        (None, Some(blob)) => {
            let compressed = base64::engine::general_purpose::STANDARD
                .decode(blob.trim())
                .map_err(|e| ApiError::InvalidDocument(format!("base64 decode failed: {e}")))?;
            decode_gzip(&compressed)
        }
        (None, None) => Err(ApiError::MissingDocument(
            "missing bpmn_xml string in JSON body".to_string(),
        )),
    }
}

fn decode_gzip(data: &[u8]) -> Result<String, ApiError> {
    let mut xml = String::new();
    GzDecoder::new(data)
        .read_to_string(&mut xml)
        .map_err(|e| ApiError::InvalidDocument(format!("gzip decode failed: {e}")))?;
    Ok(xml)
}

/// Configure lint routes (mounted under /v1 by the caller)
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(lint_document).service(lint_upload);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Config, LintStatus};
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const VALID_XML: &str = r#"
<definitions xmlns="http://www.omg.org/spec/BPMN/20100524/MODEL" id="D">
  <process id="P1">
    <startEvent id="Start1"/>
    <endEvent id="End1"/>
    <sequenceFlow id="Flow1" sourceRef="Start1" targetRef="End1"/>
  </process>
</definitions>"#;

    fn quiet_service() -> web::Data<LintService> {
        // no-bpmndi would flag every undrawn fixture element; keep the
        // transport tests focused on transport
        let mut config = Config::default();
        config.rules.overrides.insert("no-bpmndi".to_string(), false);
        web::Data::new(LintService::new(&config))
    }

    macro_rules! lint_app {
        ($service:expr) => {
            test::init_service(
                App::new()
                    .app_data($service)
                    .service(web::scope("/v1").configure(configure)),
            )
            .await
        };
    }

    fn gzip_base64(xml: &str) -> String {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(xml.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();
        base64::engine::general_purpose::STANDARD.encode(compressed)
    }

    #[actix_web::test]
    async fn test_lint_returns_outcome() {
        let app = lint_app!(quiet_service());

        let req = test::TestRequest::post()
            .uri("/v1/lint")
            .set_json(serde_json::json!({ "bpmn_xml": VALID_XML }))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::OK);
        let outcome: LintOutcome = test::read_body_json(res).await;
        assert_eq!(outcome.status, LintStatus::Ok);
        assert!(outcome.issues.is_empty());
    }

    #[actix_web::test]
    async fn test_lint_accepts_camel_case_alias() {
        let app = lint_app!(quiet_service());

        let req = test::TestRequest::post()
            .uri("/v1/lint")
            .set_json(serde_json::json!({ "bpmnXml": VALID_XML }))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_lint_failures_are_a_successful_response() {
        let app = lint_app!(quiet_service());

        let xml = r#"
<definitions xmlns="http://www.omg.org/spec/BPMN/20100524/MODEL" id="D">
  <process id="P1">
    <task id="Task1" name="Work"/>
  </process>
</definitions>"#;

        let req = test::TestRequest::post()
            .uri("/v1/lint")
            .set_json(serde_json::json!({ "bpmn_xml": xml }))
            .to_request();
        let res = test::call_service(&app, req).await;

        // rule violations are reported with 200, not an HTTP error
        assert_eq!(res.status(), StatusCode::OK);
        let outcome: LintOutcome = test::read_body_json(res).await;
        assert_eq!(outcome.status, LintStatus::Error);
        assert!(!outcome.issues.is_empty());
    }

    #[actix_web::test]
    async fn test_missing_document_is_bad_request() {
        let app = lint_app!(quiet_service());

        let req = test::TestRequest::post()
            .uri("/v1/lint")
            .set_json(serde_json::json!({}))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_unparseable_document_is_bad_request() {
        let app = lint_app!(quiet_service());

        let req = test::TestRequest::post()
            .uri("/v1/lint")
            .set_json(serde_json::json!({ "bpmn_xml": "<workflow/>" }))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_lint_accepts_gzip_base64_blob() {
        let app = lint_app!(quiet_service());

        let req = test::TestRequest::post()
            .uri("/v1/lint")
            .set_json(serde_json::json!({ "bpmn_xml_gzip": gzip_base64(VALID_XML) }))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::OK);
        let outcome: LintOutcome = test::read_body_json(res).await;
        assert_eq!(outcome.status, LintStatus::Ok);
    }

    #[actix_web::test]
    async fn test_upload_lints_multipart_file() {
        let app = lint_app!(quiet_service());

        let boundary = "----lint-test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"diagram.bpmn\"\r\n\
             Content-Type: application/xml\r\n\r\n\
             {VALID_XML}\r\n\
             --{boundary}--\r\n"
        );

        let req = test::TestRequest::post()
            .uri("/v1/lint/upload")
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            ))
            .set_payload(body)
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::OK);
        let outcome: LintOutcome = test::read_body_json(res).await;
        assert_eq!(outcome.status, LintStatus::Ok);
    }

    #[::core::prelude::v1::test]
    fn test_extract_xml_rejects_both_fields() {
        let request = LintRequest {
            bpmn_xml: Some("<a/>".to_string()),
            bpmn_xml_gzip: Some("abc".to_string()),
        };
        assert!(matches!(
            extract_xml(request),
            Err(ApiError::InvalidDocument(_))
        ));
    }

    #[::core::prelude::v1::test]
    fn test_extract_xml_rejects_empty_document() {
        let request = LintRequest {
            bpmn_xml: Some("   ".to_string()),
            bpmn_xml_gzip: None,
        };
        assert!(matches!(
            extract_xml(request),
            Err(ApiError::MissingDocument(_))
        ));
    }

    #[::core::prelude::v1::test]
    fn test_extract_xml_rejects_bad_base64() {
        let request = LintRequest {
            bpmn_xml: None,
            bpmn_xml_gzip: Some("!!not base64!!".to_string()),
        };
        assert!(matches!(
            extract_xml(request),
            Err(ApiError::InvalidDocument(_))
        ));
    }
}
