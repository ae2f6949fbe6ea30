use std::sync::Arc;

use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use dotenvy::dotenv;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use lms::api::employee::ensure_admin;
use lms::config::{Config, StoreBackend};
use lms::db::init_db;
use lms::docs::ApiDoc;
use lms::model::holiday::{HolidayCalendar, StaticHolidays};
use lms::routes;
use lms::state::AppState;
use lms::store::{MemoryStore, MySqlStore, Store};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let store: Arc<dyn Store> = match config.store_backend {
        StoreBackend::MySql => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set when STORE_BACKEND is mysql")?;
            Arc::new(MySqlStore::new(init_db(url).await?))
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let holidays: Arc<dyn HolidayCalendar> = match &config.holidays_file {
        Some(path) => Arc::new(StaticHolidays::from_file(path)?),
        None => Arc::new(StaticHolidays::builtin()),
    };

    let state = Data::new(AppState::new(store, holidays, &config));
    ensure_admin(&state, &config).await?;

    let warm = state.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = warm.emails.warmup(warm.store.as_ref(), 500).await {
            warn!(error = %e, "Failed to warm up email filter");
        }
    });

    let server_addr = config.server_addr.clone();
    let config = Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            // Wildcard tail so the UI's JS/CSS assets resolve
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(state.clone())
            .app_data(config.clone())
            // Configure auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, &config))
    })
    .bind(&server_addr)?
    .run()
    .await?;

    Ok(())
}
