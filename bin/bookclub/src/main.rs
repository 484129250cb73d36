//! # Book Club Binary
//!
//! The entry point that assembles the application based on compile-time features.

use std::sync::Arc;
use std::time::Duration;

use actix_files::Files;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use bc_api::{middleware, AppState};
use bc_configs::{LogFormat, Settings};
use bc_core::traits::SystemClock;
use bc_services::{AppServices, Ports, ServiceLimits};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// Feature-gated imports: each port is compiled to order.
#[cfg(feature = "db-sqlite")]
use bc_db_sqlite::{RetryPolicy, SqliteClubRepo};

#[cfg(feature = "storage-local")]
use bc_storage_local::LocalMediaStore;

#[cfg(feature = "auth-simple")]
use bc_auth_simple::SimpleCredentialProvider;

/// `RUST_LOG` wins over the default `info` filter.
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.init(),
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load settings")?;
    init_tracing(settings.log_format);
    let (host, port) = settings.bind_address();
    if settings.uses_default_pepper() {
        warn!("auth.pepper is the development default; set BOOKCLUB__AUTH__PEPPER");
    }

    // 1. Database
    #[cfg(feature = "db-sqlite")]
    let store = Arc::new(
        SqliteClubRepo::connect(
            &settings.database.url,
            settings.database.max_connections,
            RetryPolicy {
                attempts: settings.database.retry_attempts,
                backoff: Duration::from_millis(settings.database.retry_backoff_ms),
            },
        )
        .await
        .with_context(|| format!("failed to open {}", settings.database.url))?,
    );

    // 2. Media storage
    tokio::fs::create_dir_all(&settings.media.root)
        .await
        .with_context(|| format!("failed to create {}", settings.media.root.display()))?;
    #[cfg(feature = "storage-local")]
    let media = Arc::new(LocalMediaStore::new(
        settings.media.root.clone(),
        settings.media.url_prefix.clone(),
    ));

    // 3. Credentials
    #[cfg(feature = "auth-simple")]
    let credentials = Arc::new(SimpleCredentialProvider::new(settings.auth.pepper));

    let ports = Ports::from_store(store, media, credentials, Arc::new(SystemClock));
    let services = AppServices::new(
        ports,
        ServiceLimits {
            session_ttl_hours: settings.auth.session_ttl_hours,
            max_upload_bytes: settings.media.max_upload_bytes,
        },
    );
    let state = web::Data::new(AppState::new(services));

    let origins = settings.server.cors_origins;
    let media_prefix = settings.media.url_prefix;
    let media_root = settings.media.root;

    info!(%host, port, database = %settings.database.url, "book club starting");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::cors_policy(&origins))
            .wrap(middleware::standard_middleware())
            .configure(bc_api::configure_routes)
            .service(Files::new(&media_prefix, media_root.clone()))
    })
    .bind((host.as_str(), port))?
    .run()
    .await?;

    Ok(())
}
