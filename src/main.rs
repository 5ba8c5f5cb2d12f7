use std::sync::Arc;

use anyhow::Context;
use futures::StreamExt;
use tokio_util::task::TaskTracker;

use sentiment_responder::channels::{MessengerClient, retry};
use sentiment_responder::config::AppConfig;
use sentiment_responder::pipeline::ResponseOrchestrator;
use sentiment_responder::sentiment::LexiconClassifier;
use sentiment_responder::store::{LibSqlResponseStore, ResponseStore};
use sentiment_responder::transactions;
use sentiment_responder::webhook::{self, AppState, drain_in_flight};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().context("Invalid configuration")?;

    eprintln!("💬 Sentiment Responder v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Webhook: http://{}/webhook", config.listen_addr());
    eprintln!("   Graph API: {}", config.send.graph_url);
    eprintln!("   Database: {}", config.db_path.display());

    // ── Database ─────────────────────────────────────────────────────────
    let store: Arc<dyn ResponseStore> = Arc::new(
        LibSqlResponseStore::new_local(&config.db_path)
            .await
            .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?,
    );
    log_stored_responses(store.as_ref()).await;

    // ── Pipeline ─────────────────────────────────────────────────────────
    let sender = MessengerClient::new(&config.send).context("Failed to build Messenger client")?;
    let orchestrator = ResponseOrchestrator::new(
        Arc::new(LexiconClassifier::new()),
        transactions::from_mode(config.transactions),
        Arc::new(sender),
        Arc::clone(&store),
    )
    .with_retry_policy(retry::from_config(&config.send));

    eprintln!(
        "   Send attempts: {}, transactions: {:?}\n",
        config.send.max_attempts, config.transactions
    );

    // ── HTTP server ──────────────────────────────────────────────────────
    let tasks = TaskTracker::new();
    let state = AppState {
        verify_token: Arc::new(config.verify_token.clone()),
        orchestrator: Arc::new(orchestrator),
        store: Arc::clone(&store),
        tasks: tasks.clone(),
    };
    let app = webhook::router(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr()))?;
    tracing::info!(addr = %config.listen_addr(), "Webhook server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Accepted deliveries still owe a reply and a record.
    drain_in_flight(&tasks, config.shutdown_grace).await;

    tracing::info!("Webhook server stopped");
    Ok(())
}

/// Completes on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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
}

/// Log every stored response at debug level and the total at info level.
async fn log_stored_responses(store: &dyn ResponseStore) {
    let total = store
        .list_all()
        .await
        .inspect(|r| {
            tracing::debug!(
                id = r.id,
                sender = %r.sender_id,
                completed_transaction = r.completed_transaction,
                response = %r.response_text,
                "Stored response"
            )
        })
        .count()
        .await;
    tracing::info!(total, "Stored responses loaded");
}
