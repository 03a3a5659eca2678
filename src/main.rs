//! GameHub Backend Server
//!
//! Marketplace API server: catalog, orders and Stripe checkout, Telegram
//! login and notifications, chat, giveaways, blog and the admin panel.

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

use gamehub_server::build_router;
use gamehub_server::config::Config;
use gamehub_server::db;
use gamehub_server::notify::{DisabledNotifier, Notifier, TelegramNotifier};
use gamehub_server::payments::{PaymentProvider, StripeClient};
use gamehub_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (reads .env when present)
    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!(
        environment = ?config.environment,
        store = ?config.store_backend,
        stock_policy = ?config.stock_policy,
        "Starting GameHub API server"
    );

    let store = db::open_store(&config)
        .await
        .context("Failed to open document store")?;

    if config.stripe_api_key.is_none() {
        tracing::warn!("STRIPE_API_KEY not set, checkout is disabled");
    }
    if config.stripe_webhook_secret.is_none() {
        tracing::warn!("STRIPE_WEBHOOK_SECRET not set, payment webhooks will be rejected");
    }
    let provider: Arc<dyn PaymentProvider> = Arc::new(
        StripeClient::new(
            &config.stripe_api_url,
            config.stripe_api_key.clone(),
            config.stripe_webhook_secret.clone(),
            Duration::from_secs(config.payment_timeout_seconds),
        )
        .context("Failed to build payment client")?,
    );

    let notifier: Arc<dyn Notifier> = match &config.telegram_bot_token {
        Some(bot_token) => Arc::new(
            TelegramNotifier::new(
                &config.telegram_api_url,
                bot_token.clone(),
                Duration::from_secs(config.notification_timeout_seconds),
            )
            .context("Failed to build Telegram client")?,
        ),
        None => {
            tracing::warn!("TELEGRAM_BOT_TOKEN not set, Telegram login and notifications are disabled");
            Arc::new(DisabledNotifier)
        }
    };

    let app_state = AppState::new(&config, store, provider, notifier);
    let app = build_router(app_state, &config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
