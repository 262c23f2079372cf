use std::collections::HashMap;
use std::time::Duration;

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Form, Json, Router};
use hope_server::{
    CompletionProvider, Notifier, OpenAiCompletion, OtpGateway, TwilioSmsNotifier,
    TwilioVerifyGateway,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

async fn verifications(
    Path(service): Path<String>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    if !headers.contains_key("authorization") || service != "VA-test" {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "Authenticate", "code": 20003})));
    }
    if form.get("To").map(String::as_str) == Some("+910000000000") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "Invalid parameter `To`", "code": 60200, "more_info": "x"})),
        );
    }
    (StatusCode::CREATED, Json(json!({"status": "pending", "sid": "VE1"})))
}

async fn verification_check(Form(form): Form<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
    match form.get("Code").map(String::as_str) {
        Some("123456") => (StatusCode::OK, Json(json!({"status": "approved"}))),
        Some("404404") => (StatusCode::NOT_FOUND, Json(json!({"message": "not found"}))),
        _ => (StatusCode::OK, Json(json!({"status": "pending"}))),
    }
}

async fn messages(Form(form): Form<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
    if form.get("From").is_none() || form.get("Body").is_none() {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "missing"})));
    }
    (StatusCode::CREATED, Json(json!({"sid": "SM1"})))
}

async fn completions(Json(body): Json<Value>) -> Json<Value> {
    let prompt = body["messages"][0]["content"].as_str().unwrap_or_default();
    Json(json!({"choices": [{"message": {"role": "assistant", "content": format!("echo: {prompt}")}}]}))
}

async fn spawn_provider() -> String {
    let app = Router::new()
        .route("/Services/:service/Verifications", post(verifications))
        .route("/Services/:service/VerificationCheck", post(verification_check))
        .route("/Accounts/:account/Messages.json", post(messages))
        .route("/chat/completions", post(completions));
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

fn verify_gateway(base: &str) -> TwilioVerifyGateway {
    TwilioVerifyGateway::new(base, "VA-test", "AC-test", "secret", Duration::from_secs(5))
}

#[tokio::test]
async fn verify_gateway_sends_and_checks_codes() {
    let base = spawn_provider().await;
    let gateway = verify_gateway(&base);
    let sent = gateway.send("+919876543210").await.expect("send");
    assert_eq!(sent.status, "pending");

    let approved = gateway.check("+919876543210", "123456").await.expect("check");
    assert!(approved.approved);
    let pending = gateway.check("+919876543210", "000000").await.expect("check");
    assert!(!pending.approved);
    let missing = gateway.check("+919876543210", "404404").await.expect("check");
    assert!(!missing.approved);
}

#[tokio::test]
async fn provider_errors_surface_only_their_message() {
    let base = spawn_provider().await;
    let err = verify_gateway(&base)
        .send("+910000000000")
        .await
        .expect_err("rejected");
    let text = err.to_string();
    assert!(text.contains("Invalid parameter"));
    assert!(!text.contains("60200"));
    assert!(!text.contains("more_info"));
}

#[tokio::test]
async fn unreachable_provider_is_a_gateway_error() {
    let gateway = verify_gateway("http://127.0.0.1:9");
    assert!(gateway.send("+919876543210").await.is_err());
}

#[tokio::test]
async fn sms_and_completion_clients_talk_to_their_providers() {
    let base = spawn_provider().await;
    let sms = TwilioSmsNotifier::new(&base, "AC-test", "secret", "+15550000000", Duration::from_secs(5));
    sms.send_sms("+919876543210", "hello").await.expect("sms");

    let completion = OpenAiCompletion::new(&base, "sk-test", "gpt-3.5-turbo");
    let reply = completion.complete("how are you").await.expect("complete");
    assert_eq!(reply, "echo: how are you");
}
