use std::sync::Arc;

use chrono::Duration;
use migration::{Migrator, MigratorTrait};
use scheduler::{ScheduleSettings, Scheduler, TracingSink};

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "tally={level},server={level},engine={level},scheduler={level}",
            level = settings.app.level
        ))
        .init();

    let db = connect_database(&settings.database).await?;
    let engine = Arc::new(engine::Engine::builder().database(db).build().await?);
    let sink = Arc::new(TracingSink);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server_task = match settings.server {
        Some(server) => {
            tracing::info!("Found server settings...");
            let auth = settings
                .auth
                .ok_or("the server needs an [auth] section with a token secret")?;
            let tokens = engine::TokenIssuer::new(
                &auth.secret,
                Duration::minutes(auth.token_ttl_minutes),
            )?;
            let state = server::ServerState {
                engine: engine.clone(),
                tokens: Arc::new(tokens),
                sink: sink.clone(),
            };

            let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
            let listener = tokio::net::TcpListener::bind(format!("{}:{}", bind, server.port)).await?;
            Some(tokio::spawn(async move {
                let shutdown = async {
                    let _ = shutdown_rx.await;
                };
                if let Err(err) = server::run_with_listener(state, listener, shutdown).await {
                    tracing::error!("server failed: {err}");
                }
            }))
        }
        None => {
            tracing::info!("No server settings, HTTP API disabled");
            None
        }
    };

    let schedule = ScheduleSettings::parse(
        &settings.scheduler.timezone,
        &settings.scheduler.recurring_at,
        &settings.scheduler.reminders_at,
    )?;
    let scheduler = Scheduler::with_default_jobs(engine, sink, &schedule)?.start();

    shutdown_signal().await;
    tracing::info!("Shutting down...");

    let _ = shutdown_tx.send(());
    scheduler.shutdown().await;
    if let Some(task) = server_task {
        if let Err(err) = task.await {
            tracing::error!("server task failed: {err}");
        }
    }

    Ok(())
}

/// Resolves on ctrl+c or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl+c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::debug!("received ctrl+c"),
        _ = terminate => tracing::debug!("received SIGTERM"),
    }
}

async fn connect_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let database = sea_orm::Database::connect(config.url()).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
