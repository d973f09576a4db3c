// Main entry point for the email finder server

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use cc_archive::{ArchiveFetcher, CommonCrawlFetcher, FetcherConfig};
use crawlmail_core::domains::emails::actions::RunSettings;
use crawlmail_core::domains::emails::{EmailVerifier, SmtpSettings};
use crawlmail_core::kernel::{HickoryMxResolver, NatsClientPublisher, NatsPublisher, ServerDeps};
use crawlmail_core::{server::build_app, Config};
use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,crawlmail_core=debug,cc_archive=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting email finder");

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    tracing::info!("Connecting to database...");
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    // The broker only mirrors progress; runs work without it.
    let broker: Option<Arc<dyn NatsPublisher>> =
        match NatsClientPublisher::connect(&config.nats_url, Duration::from_secs(5)).await {
            Ok(publisher) => Some(Arc::new(publisher)),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, progress will not be mirrored");
                None
            }
        };

    let fetcher_config = FetcherConfig::default()
        .with_index_url(config.cc_index_url.clone())
        .with_storage_url(config.cc_storage_url.clone())
        .with_max_in_flight(config.fetch_concurrency);
    let archive: Arc<dyn ArchiveFetcher> = Arc::new(
        CommonCrawlFetcher::new(fetcher_config).context("Failed to build archive client")?,
    );

    let smtp = SmtpSettings::default();
    let verifier = EmailVerifier::new(Arc::new(HickoryMxResolver::new(smtp.dns_timeout)), smtp);

    let deps = Arc::new(ServerDeps::new(pool, archive, verifier, broker));
    let run_settings = RunSettings {
        domains_csv: config.domains_csv.clone(),
        output_csv: config.output_csv.clone(),
        verify_concurrency: config.verify_concurrency,
    };

    let app = build_app(deps, run_settings);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Run: http://localhost:{}/find_emails", config.port);
    tracing::info!("Stream: http://localhost:{}/find_emails/stream", config.port);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
