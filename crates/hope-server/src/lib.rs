// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};
use axum::Router;

mod config;
mod effect_adapters;
mod gateway;
mod http;
mod middleware;
mod password;
mod rate_limiter;
mod relay;
mod services;
mod session;
mod store;

pub use config::{
    env_bool, validate_startup_config_contract, BootstrapAdmin, CompletionConfig, GatewayConfig,
    RateLimitConfig, ServerConfig,
};
pub use effect_adapters::clock_adapters::{Clock, ManualClock, SystemClock};
pub use gateway::{
    redact_phone, CompletionProvider, DisabledCompletion, FakeCompletion, FakeOtpGateway,
    LogNotifier, Notifier, OpenAiCompletion, OtpCheck, OtpGateway, OtpSend, RecordingNotifier,
    TwilioSmsNotifier, TwilioVerifyGateway,
};
pub use http::response_contract::HttpError;
pub use relay::{Relay, Subscription};
pub use services::{
    AdminService, AlertService, AssistantReply, AssistantService, AuthPolicy, AuthService,
    ChatManager, LoginOutcome, NewAdminInput, NewDoctorInput, ProfileInput, Registration,
    RegistrationInput,
};
pub use session::{require_role, Session, SessionIssuer};
pub use store::{
    connect_with_retry, AccountStore, ChatStore, Inserted, MemoryStore, RetryPolicy, SqliteStore,
    Store,
};

pub const CRATE_NAME: &str = "hope-server";

/// Outbound seams and storage handed to [`AppState::new`].
pub struct Dependencies {
    pub store: Arc<dyn Store>,
    pub otp: Arc<dyn OtpGateway>,
    pub notifier: Arc<dyn Notifier>,
    pub completion: Arc<dyn CompletionProvider>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub chat: Arc<ChatManager>,
    pub admin: Arc<AdminService>,
    pub assistant: Arc<AssistantService>,
    pub relay: Arc<Relay>,
    pub sessions: Arc<SessionIssuer>,
    pub request_id_seed: Arc<AtomicU64>,
    pub max_body_bytes: usize,
}

impl AppState {
    #[must_use]
    pub fn new(deps: Dependencies, cfg: &ServerConfig) -> Self {
        let Dependencies {
            store,
            otp,
            notifier,
            completion,
            clock,
        } = deps;
        let sessions = Arc::new(SessionIssuer::new(
            &cfg.jwt_secret,
            cfg.token_ttl,
            Arc::clone(&clock),
        ));
        let alerts = Arc::new(AlertService::new(
            Arc::clone(&notifier),
            cfg.gateway.admin_alert_contact.clone(),
        ));
        let chat = Arc::new(ChatManager::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            cfg.room_duration,
        ));
        let auth = Arc::new(AuthService::new(
            Arc::clone(&store),
            otp,
            notifier,
            Arc::clone(&sessions),
            Arc::clone(&clock),
            AuthPolicy {
                default_country_code: cfg.default_country_code.clone(),
                login_max_failures: cfg.login_max_failures,
                login_lock: cfg.login_lock,
                otp_rate_limit: cfg.otp_rate_limit.clone(),
            },
        ));
        let admin = Arc::new(AdminService::new(
            store,
            Arc::clone(&clock),
            cfg.default_country_code.clone(),
        ));
        let assistant = Arc::new(AssistantService::new(
            completion,
            Arc::clone(&alerts),
            clock,
        ));
        let relay = Arc::new(Relay::new(Arc::clone(&chat), alerts));
        Self {
            auth,
            chat,
            admin,
            assistant,
            relay,
            sessions,
            request_id_seed: Arc::new(AtomicU64::new(1)),
            max_body_bytes: cfg.max_body_bytes,
        }
    }
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/auth/request-otp",
            post(http::auth_endpoints::request_otp_handler),
        )
        .route(
            "/auth/verify-otp",
            post(http::auth_endpoints::verify_otp_handler),
        )
        .route("/auth/register", post(http::auth_endpoints::register_handler))
        .route("/auth/login", post(http::auth_endpoints::login_handler))
        .route(
            "/chats/create",
            post(http::chat_endpoints::create_room_handler),
        )
        .route(
            "/chats/openai",
            post(http::chat_endpoints::completion_handler),
        )
        .route(
            "/chats/:room_id",
            get(http::chat_endpoints::history_handler),
        )
        .route(
            "/admin/users",
            get(http::admin_endpoints::list_users_handler),
        )
        .route(
            "/admin/users/:id",
            delete(http::admin_endpoints::delete_user_handler),
        )
        .route(
            "/admin/doctors",
            get(http::admin_endpoints::list_doctors_handler)
                .post(http::admin_endpoints::create_doctor_handler),
        )
        .route(
            "/admin/doctors/:id",
            put(http::admin_endpoints::update_doctor_status_handler),
        )
        .route(
            "/admin/admins",
            post(http::admin_endpoints::create_admin_handler),
        )
        .route(
            "/admin/profile",
            put(http::admin_endpoints::update_profile_handler),
        )
        .route(
            "/admin/chats",
            get(http::admin_endpoints::list_chats_handler),
        )
        .route(
            "/admin/chats/sensitive",
            get(http::admin_endpoints::list_sensitive_chats_handler),
        )
}

/// Every API route is served both at the root and under `/api`.
pub fn build_router(state: AppState) -> Router {
    let api = api_routes();
    Router::new()
        .route("/healthz", get(http::healthz_handler))
        .route("/openapi.json", get(http::openapi_handler))
        .route("/ws", get(http::ws::ws_handler))
        .merge(api.clone())
        .nest("/api", api)
        .fallback(http::not_found_handler)
        .layer(from_fn_with_state(
            state.clone(),
            middleware::request_tracing::request_tracing_middleware,
        ))
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .with_state(state)
}
