#![allow(dead_code)]

use std::sync::Arc;

use hope_server::{
    build_router, AppState, Dependencies, FakeCompletion, FakeOtpGateway, GatewayConfig,
    RecordingNotifier, ServerConfig, SqliteStore, SystemClock,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const OTP_CODE: &str = "123456";
pub const ALERT_CONTACT: &str = "+919999999999";
pub const ADMIN_EMAIL: &str = "root@hope.test";
pub const ADMIN_PASSWORD: &str = "root-password";

pub struct TestApp {
    pub base: String,
    pub state: AppState,
    pub otp: Arc<FakeOtpGateway>,
    pub notifier: Arc<RecordingNotifier>,
    pub client: reqwest::Client,
}

pub fn test_config() -> ServerConfig {
    let defaults = ServerConfig::default();
    ServerConfig {
        jwt_secret: "integration-secret-0123456789".to_string(),
        gateway: GatewayConfig {
            account_sid: "AC-test".to_string(),
            auth_token: "token".to_string(),
            verify_service_sid: "VA-test".to_string(),
            admin_alert_contact: Some(ALERT_CONTACT.to_string()),
            ..defaults.gateway.clone()
        },
        login_max_failures: 3,
        ..defaults
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config()).await
}

pub async fn spawn_app_with(cfg: ServerConfig) -> TestApp {
    let otp = Arc::new(FakeOtpGateway::new(OTP_CODE));
    let notifier = Arc::new(RecordingNotifier::new());
    let store = SqliteStore::open_in_memory().expect("in-memory store");
    let state = AppState::new(
        Dependencies {
            store: Arc::new(store),
            otp: otp.clone(),
            notifier: notifier.clone(),
            completion: Arc::new(FakeCompletion("You are not alone.".to_string())),
            clock: Arc::new(SystemClock),
        },
        &cfg,
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let app = build_router(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    TestApp {
        base: format!("http://{addr}"),
        state,
        otp,
        notifier,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> reqwest::Response {
        let mut req = self.client.post(self.url(path)).json(&body);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        req.send().await.expect("post")
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("put")
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        let mut req = self.client.get(self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        req.send().await.expect("get")
    }

    pub async fn delete(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("delete")
    }

    /// Runs request-otp then register; returns `(token, userId)`.
    pub async fn register_user(&self, phone: &str, email: &str) -> (String, String) {
        let resp = self
            .post(
                "/auth/request-otp",
                None,
                json!({"phoneNumber": phone, "countryCode": "91"}),
            )
            .await;
        assert_eq!(resp.status(), 200);
        let resp = self
            .post(
                "/auth/register",
                None,
                json!({
                    "phoneNumber": phone,
                    "name": "Asha",
                    "email": email,
                    "password": "user-password",
                    "otp": OTP_CODE,
                }),
            )
            .await;
        assert_eq!(resp.status(), 201);
        let body: Value = resp.json().await.expect("register body");
        (
            body["token"].as_str().expect("token").to_string(),
            body["user"]["userId"].as_str().expect("userId").to_string(),
        )
    }

    pub async fn admin_token(&self) -> String {
        self.state
            .admin
            .seed_admin("Root", "9000000010", ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .expect("seed admin");
        self.login(json!({"email": ADMIN_EMAIL, "password": ADMIN_PASSWORD}))
            .await
    }

    pub async fn login(&self, body: Value) -> String {
        let resp = self.post("/auth/login", None, body).await;
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.expect("login body");
        body["token"].as_str().expect("token").to_string()
    }

    /// Admin creates a doctor, who then logs in by phone. Returns
    /// `(token, doctorId)`.
    pub async fn doctor(&self, admin: &str, phone: &str) -> (String, String) {
        let resp = self
            .post(
                "/admin/doctors",
                Some(admin),
                json!({"phoneNumber": phone, "name": "Dr. Rao", "password": "doctor-password"}),
            )
            .await;
        assert_eq!(resp.status(), 201);
        let body: Value = resp.json().await.expect("doctor body");
        let id = body["userId"].as_str().expect("userId").to_string();
        let token = self
            .login(json!({"phoneNumber": phone, "password": "doctor-password"}))
            .await;
        (token, id)
    }
}
