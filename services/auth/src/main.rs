use std::sync::Arc;

use tracing::{info, warn};

use mailcode_auth::config::AuthConfig;
use mailcode_auth::infra::backend::CodeBackend;
use mailcode_auth::infra::cache::RedisCodeStore;
use mailcode_auth::infra::mailer::EmailSender;
use mailcode_auth::infra::memory::InMemoryCodeStore;
use mailcode_auth::infra::sweeper::spawn_sweeper;
use mailcode_auth::router::build_router;
use mailcode_auth::state::AppState;
use mailcode_core::config::Config;
use mailcode_core::health::Readiness;
use mailcode_core::tracing::init_tracing;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = AuthConfig::from_env();

    let codes = match config.redis_url() {
        Some(url) => {
            let redis = deadpool_redis::Config::from_url(url)
                .create_pool(Some(deadpool_redis::Runtime::Tokio1))
                .expect("failed to create Redis pool");
            CodeBackend::Redis(RedisCodeStore { pool: redis })
        }
        None => CodeBackend::Memory(InMemoryCodeStore::new(config.max_pending)),
    };

    let mailer = EmailSender::new(config.smtp_url(), &config.mail_from)
        .expect("invalid mail configuration");
    if mailer.is_console() {
        warn!("SMTP_URL not set: codes are written to the log instead of emailed");
    }

    let state = AppState {
        codes,
        mailer: Arc::new(mailer),
        policy: config.policy(),
        readiness: Readiness::new(),
    };

    let _sweeper = spawn_sweeper(state.code_store(), state.clock(), config.sweep_interval());

    let backend = state.codes.name();
    let readiness = state.readiness.clone();
    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.auth_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!(backend, "auth service listening on {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            readiness.drain();
            info!("shutdown signal received");
        })
        .await
        .expect("server error");
}
