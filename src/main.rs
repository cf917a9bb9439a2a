use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gen_orchestrator::adapters::auth::JwtSessionValidator;
use gen_orchestrator::adapters::http::middleware::AuthState;
use gen_orchestrator::adapters::http::{app_router, GenerationAppState};
use gen_orchestrator::adapters::ledger::{InMemoryCreditLedger, ProfileStoreCreditLedger};
use gen_orchestrator::adapters::provider::HttpGenerationProvider;
use gen_orchestrator::adapters::task_store::InMemoryTaskStore;
use gen_orchestrator::config::{AppConfig, ServerConfig};
use gen_orchestrator::ports::CreditLedger;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // --- Configuration ---
    let config = AppConfig::load()?;

    // --- Tracing ---
    init_tracing(&config.server);

    config.validate()?;
    let addr = config.server.socket_addr()?;
    tracing::info!(%addr, environment = ?config.server.environment, "Loaded configuration");

    let shutdown = CancellationToken::new();

    // --- Adapters ---
    let ledger: Arc<dyn CreditLedger> = match config.ledger.profile_store_config() {
        Some(profile_store) => {
            tracing::info!(url = %profile_store.base_url, "Using profile store credit ledger");
            Arc::new(ProfileStoreCreditLedger::new(profile_store)?)
        }
        None => {
            tracing::info!(
                default_credits = config.ledger.default_credits,
                "Using in-memory credit ledger"
            );
            Arc::new(InMemoryCreditLedger::new(config.ledger.default_credits))
        }
    };

    if !config.provider.is_complete() {
        tracing::warn!("Generation provider is not fully configured; dispatch will fail");
    }
    let provider = Arc::new(HttpGenerationProvider::new(config.provider.http_config())?);

    let task_store = InMemoryTaskStore::new(config.task_store.limits());
    let reaper = task_store.spawn_reaper(config.task_store.reap_interval(), shutdown.child_token());

    let auth: AuthState = Arc::new(JwtSessionValidator::new(config.auth.jwt_config()));

    let mut state = GenerationAppState::new(ledger, provider, Arc::new(task_store))
        .with_admission_guard(config.ledger.consistency.admission_guard())
        .with_shutdown(shutdown.clone());
    match config.webhook.verifier() {
        Some(verifier) => state = state.with_webhook_verifier(verifier),
        None => tracing::warn!(
            "No webhook secret configured; provider callbacks are accepted unsigned"
        ),
    }
    tracing::info!(consistency = ?config.ledger.consistency, "Admission consistency");

    // --- Router ---
    let request_id_header = HeaderName::from_static("x-request-id");

    let app = app_router(state, auth)
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(build_cors_layer(&config.server)?);

    // --- Start server ---
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Starting server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    tracing::info!("Server stopped accepting connections, cleaning up");
    shutdown.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), reaper).await;
    tracing::info!("Graceful shutdown complete");

    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| server.log_level.as_str().into());

    let registry = tracing_subscriber::registry().with(filter);
    if server.is_production() {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    }
}

fn build_cors_layer(server: &ServerConfig) -> Result<CorsLayer, Box<dyn std::error::Error>> {
    let origins = server
        .cors_origins_list()
        .iter()
        .map(|o| HeaderValue::from_str(o))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(3600)))
}

/// Resolves on Ctrl-C or SIGTERM, cancelling in-flight dispatches.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    shutdown.cancel();
}
