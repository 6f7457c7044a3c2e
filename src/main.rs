use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use dotenvy::dotenv;
use std::sync::Arc;

mod api;
mod attendance;
mod config;
mod db;
mod docs;
mod error;
mod geo;
mod model;
mod routes;
mod sync;
mod utils;

use attendance::memory_store::MemoryAttendanceStore;
use attendance::mysql_store::MySqlAttendanceStore;
use attendance::service::AttendanceService;
use attendance::store::AttendanceStore;
use config::Config;
use db::init_db;
use sync::StatusSync;

use crate::docs::ApiDoc;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Geomark attendance service"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let config = Config::from_env();

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");
    info!(
        policy = ?config.retry_policy(),
        thresholds = ?config.integrity_thresholds(),
        workday_end_hour = config.workday_end_hour,
        "attendance tunables"
    );

    let store: Arc<dyn AttendanceStore> = match &config.database_url {
        Some(url) => Arc::new(MySqlAttendanceStore::new(init_db(url).await)),
        None => {
            warn!("DATABASE_URL not set; using the in-memory attendance store");
            Arc::new(MemoryAttendanceStore::new())
        }
    };

    let status_sync = StatusSync::new(config.sync_buffer);
    let service = AttendanceService::new(
        store,
        status_sync,
        config.integrity_thresholds(),
        config.tz_offset_minutes,
        config.workday_end_hour,
    );

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(service.clone()))
            .app_data(Data::new(config.clone()))
            .service(index)
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await
}
