use bytes::Bytes;
use callflow_audit::{InteractionLogger, MemorySink};
use callflow_core::config::{Mode, SignaturePolicy};
use callflow_core::model::FlowCatalog;
use callflow_guard::{SIGNATURE_HEADER, SignatureGuard, SignatureValidator};
use callflow_http::HttpIngress;
use callflow_runtime::{InMemoryFlowRepository, WebhookController};
use callflow_voice::{Renderer, VoiceSettings};
use http::{Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use std::sync::Arc;

const BASE: &str = "https://ivr.example.com";
const TOKEN: &str = "test-token";

fn ingress(policy: SignaturePolicy) -> HttpIngress {
    let catalog: FlowCatalog = serde_json::from_value(serde_json::json!({
        "lines": [ { "id": "line-1", "number": "+15559870000" } ],
        "flows": [{
            "id": "front-desk", "name": "Front desk", "isActive": true, "phoneLineId": "line-1",
            "steps": [
                { "id": "welcome", "type": "welcome", "message": "Welcome",
                  "nextSteps": { "default": "main_menu" } },
                { "id": "main_menu", "type": "menu", "message": "Press 1 for sales",
                  "nextSteps": { "1": "sales", "default": "main_menu" } },
                { "id": "sales", "type": "transfer", "message": "Connecting you",
                  "options": { "transferNumber": "+15550101" } }
            ]
        }]
    }))
    .unwrap();

    let (logger, _task) = InteractionLogger::spawn(Arc::new(MemorySink::new()), 16);
    let controller = WebhookController::new(
        Arc::new(InMemoryFlowRepository::new(catalog)),
        SignatureGuard::new(policy, Some(TOKEN)),
        Renderer::new(VoiceSettings::default()),
        logger,
    );
    HttpIngress::new(controller)
        .public_base_url(Some(BASE.to_string()))
        .mode(Mode::Prod)
}

const BODY: &str = "CallSid=CA1&From=%2B15551230000&To=%2B15559870000&Digits=1";

fn signed_post(path_and_query: &str, body: &str) -> Request<Full<Bytes>> {
    let url = format!("{BASE}{path_and_query}");
    let params: Vec<(String, String)> = serde_urlencoded::from_str(body).unwrap();
    let signature = SignatureValidator::new(TOKEN).expected_signature(&url, &params);

    Request::builder()
        .method(Method::POST)
        .uri(path_and_query)
        .header("content-type", "application/x-www-form-urlencoded")
        .header(SIGNATURE_HEADER, signature)
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

async fn body_text(response: http::Response<Full<Bytes>>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn signed_webhook_gets_markup() {
    let ingress = ingress(SignaturePolicy::Enforce);
    let response = ingress
        .dispatch(signed_post("/voice?step=main_menu", BODY))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/xml; charset=utf-8"
    );
    let xml = body_text(response).await;
    assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    assert!(xml.contains(">+15550101</Number>"));
}

#[tokio::test]
async fn forged_signature_is_unauthorized() {
    let ingress = ingress(SignaturePolicy::Enforce);
    let mut request = signed_post("/voice?step=main_menu", BODY);
    *request.body_mut() = Full::new(Bytes::from(BODY.replace("Digits=1", "Digits=2")));

    let response = ingress.dispatch(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_text(response).await.is_empty());
}

#[tokio::test]
async fn signature_covers_the_query_string() {
    let ingress = ingress(SignaturePolicy::Enforce);
    let signed = signed_post("/voice?step=main_menu", BODY);
    let signature = signed.headers()[SIGNATURE_HEADER].clone();

    let replayed = Request::builder()
        .method(Method::POST)
        .uri("/voice?step=welcome")
        .header(SIGNATURE_HEADER, signature)
        .body(Full::new(Bytes::from(BODY)))
        .unwrap();

    assert_eq!(
        ingress.dispatch(replayed).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn log_only_serves_unsigned_requests() {
    let ingress = ingress(SignaturePolicy::LogOnly);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/voice")
        .body(Full::new(Bytes::from(BODY)))
        .unwrap();

    let response = ingress.dispatch(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Welcome"));
}

#[tokio::test]
async fn callbacks_are_acknowledged() {
    let ingress = ingress(SignaturePolicy::Enforce);
    let body = "CallSid=CA1&CallStatus=completed&DialCallStatus=completed";
    let response = ingress
        .dispatch(signed_post("/voice/call-status?step=sales", body))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.ends_with("<Response/>"));
}

#[tokio::test]
async fn health_reports_mode_and_policy() {
    let ingress = ingress(SignaturePolicy::Enforce);
    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .body(Full::new(Bytes::new()))
        .unwrap();

    let response = ingress.dispatch(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["mode"], "prod");
    assert_eq!(json["signature_policy"], "enforce");
}

#[tokio::test]
async fn unknown_routes_and_methods_are_not_found() {
    let ingress = ingress(SignaturePolicy::Enforce);

    for (method, path) in [(Method::POST, "/nope"), (Method::GET, "/voice")] {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .body(Full::new(Bytes::new()))
            .unwrap();
        assert_eq!(
            ingress.dispatch(request).await.status(),
            StatusCode::NOT_FOUND
        );
    }
}

#[tokio::test]
async fn oversized_bodies_are_refused() {
    let ingress = ingress(SignaturePolicy::LogOnly);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/voice")
        .body(Full::new(Bytes::from(vec![b'a'; callflow_http::MAX_BODY_BYTES + 1])))
        .unwrap();

    assert_eq!(
        ingress.dispatch(request).await.status(),
        StatusCode::PAYLOAD_TOO_LARGE
    );
}

#[tokio::test]
async fn office_closed_is_200_voice_markup() {
    let ingress = ingress(SignaturePolicy::Enforce);
    let body = "CallSid=CA2&From=%2B15551230000&To=%2B15550000000";
    let response = ingress.dispatch(signed_post("/voice", body)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/xml; charset=utf-8"
    );
    let xml = body_text(response).await;
    assert!(xml.contains("Our office is currently closed"));
    assert!(xml.ends_with("<Hangup/></Response>"));
}

#[tokio::test]
async fn trailing_slash_reaches_the_same_route() {
    let ingress = ingress(SignaturePolicy::Enforce);
    let response = ingress
        .dispatch(signed_post("/voice/?step=main_menu", BODY))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains(">+15550101</Number>"));
}
