// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use std::sync::Arc;

use hope_server::{
    build_router, connect_with_retry, redact_phone, validate_startup_config_contract, AppState,
    Clock, CompletionProvider, Dependencies, DisabledCompletion, LogNotifier, Notifier,
    OpenAiCompletion, ServerConfig, SqliteStore, Store, SystemClock, TwilioSmsNotifier,
    TwilioVerifyGateway,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            _ => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn build_notifier(cfg: &ServerConfig) -> Arc<dyn Notifier> {
    match &cfg.gateway.sms_from_number {
        Some(from) => Arc::new(TwilioSmsNotifier::new(
            &cfg.gateway.messaging_base_url,
            cfg.gateway.account_sid.clone(),
            cfg.gateway.auth_token.clone(),
            from.clone(),
            cfg.gateway.timeout,
        )),
        None => {
            warn!("HOPE_SMS_FROM_NUMBER not set; welcome and alert SMS will only be logged");
            Arc::new(LogNotifier)
        }
    }
}

fn build_completion(cfg: &ServerConfig) -> Arc<dyn CompletionProvider> {
    match &cfg.completion.api_key {
        Some(key) => Arc::new(OpenAiCompletion::new(
            &cfg.completion.base_url,
            key.clone(),
            cfg.completion.model.clone(),
        )),
        None => {
            warn!("HOPE_COMPLETION_API_KEY not set; /chats/openai will return an error");
            Arc::new(DisabledCompletion)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let cfg = ServerConfig::from_env();
    init_tracing(cfg.log_json);
    if let Err(e) = validate_startup_config_contract(&cfg) {
        error!("invalid configuration: {e}");
        return Err(e);
    }

    let store_path = cfg.store_path.clone();
    let store = connect_with_retry(&cfg.store_retry, || {
        let path = store_path.clone();
        async move {
            tokio::task::spawn_blocking(move || SqliteStore::open(&path))
                .await
                .map_err(|e| format!("store open task failed: {e}"))?
                .map_err(|e| e.to_string())
        }
    })
    .await?;
    info!(path = %cfg.store_path.display(), "store ready");
    let store: Arc<dyn Store> = Arc::new(store);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let otp = Arc::new(TwilioVerifyGateway::new(
        &cfg.gateway.verify_base_url,
        cfg.gateway.verify_service_sid.clone(),
        cfg.gateway.account_sid.clone(),
        cfg.gateway.auth_token.clone(),
        cfg.gateway.timeout,
    ));
    if cfg.gateway.admin_alert_contact.is_none() {
        warn!("HOPE_ADMIN_ALERT_CONTACT not set; sensitive-message alerts will not be delivered");
    }

    let state = AppState::new(
        Dependencies {
            store,
            otp,
            notifier: build_notifier(&cfg),
            completion: build_completion(&cfg),
            clock,
        },
        &cfg,
    );

    if let Some(bootstrap) = &cfg.bootstrap_admin {
        match state
            .admin
            .seed_admin(
                &bootstrap.name,
                &bootstrap.phone_number,
                &bootstrap.email,
                &bootstrap.password,
            )
            .await
        {
            Ok(Some(account)) => info!(
                account_id = %account.account_id,
                phone = %redact_phone(&account.phone_number),
                "bootstrap admin created"
            ),
            Ok(None) => info!("admin already present; bootstrap skipped"),
            Err(e) => {
                error!("bootstrap admin failed: {e}");
                return Err(format!("bootstrap admin failed: {e}"));
            }
        }
    }

    let app = build_router(state);
    let listener = TcpListener::bind(&cfg.bind_addr)
        .await
        .map_err(|e| format!("bind {} failed: {e}", cfg.bind_addr))?;
    info!(addr = %cfg.bind_addr, "hope-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .map_err(|e| format!("server error: {e}"))?;
    info!("hope-server stopped");
    Ok(())
}
