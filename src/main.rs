mod api;
mod config;
mod database;
mod jobs;
mod middleware;
mod models;
mod seeds;
mod services;
mod utils;

#[cfg(test)]
mod test_support;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::jobs::sheet_sync::{SyncQueue, SyncSettings};
use crate::services::auth_service::TokenService;
use crate::services::sheets_service::{self, SheetSink};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env();

    log::info!("🚀 Starting Plant Tracker Service...");
    log::info!("📊 Database: {}", config.database_url);

    // Initialize SQLite connection (schema criado no connect)
    let db = database::Database::connect(&config.database_url)
        .await
        .map_err(|e| std::io::Error::other(format!("Failed to open database: {}", e)))?;

    log::info!("✅ Database ready");

    // 🌱 Seed demo user
    if config.seed_demo_user {
        if let Err(e) = seeds::demo_user_seed::seed_demo_user(&db, config.bcrypt_cost).await {
            log::error!("❌ Failed to seed demo user: {}", e);
        }
    }

    tokio::fs::create_dir_all(&config.upload_dir).await?;
    log::info!("📁 Uploads: {}", config.upload_dir.display());

    // 📤 Google Sheets + sync worker
    let sink: std::sync::Arc<dyn SheetSink> =
        sheets_service::load_sink(&config.google_credentials_path, config.sheets_timeout()).await;
    let queue = SyncQueue::start_with(
        db.clone(),
        sink.clone(),
        SyncSettings {
            // token + cabeçalho + append
            job_timeout: config.sheets_timeout() * 3,
            max_tracked: config.sync_max_tracked,
        },
    );

    let tokens = TokenService::from_config(&config);

    let db_data = web::Data::new(db);
    let tokens_data = web::Data::new(tokens);
    let queue_data = web::Data::new(queue);
    let sink_data: web::Data<dyn SheetSink> = web::Data::from(sink);
    let config_data = web::Data::new(config.clone());

    let bind = (config.host.clone(), config.port);

    log::info!("🌐 Server starting on {}:{}", bind.0, bind.1);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", bind.0, bind.1);
    log::info!("📄 OpenAPI spec at: http://{}:{}/api-docs/openapi.json", bind.0, bind.1);

    // Start HTTP server
    HttpServer::new(move || {
        let cors = match &config.cors_allowed_origins {
            Some(origins) => origins
                .iter()
                .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin)),
            // App mobile em rede local: aceita qualquer origem
            None => Cors::default().allow_any_origin(),
        }
        .allowed_methods(vec!["GET", "POST", "PUT", "OPTIONS"])
        .allowed_headers(vec![
            actix_web::http::header::AUTHORIZATION,
            actix_web::http::header::CONTENT_TYPE,
            actix_web::http::header::ACCEPT,
        ])
        .expose_headers(vec![actix_web::http::header::CONTENT_TYPE])
        .max_age(3600);

        // Generate OpenAPI specification
        let openapi = api::swagger::ApiDoc::openapi();
        let upload_dir = config.upload_dir.clone();

        App::new()
            .app_data(db_data.clone())
            .app_data(tokens_data.clone())
            .app_data(queue_data.clone())
            .app_data(sink_data.clone())
            .app_data(config_data.clone())
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi),
            )
            .configure(|cfg| api::configure(cfg, &upload_dir))
    })
    .bind(bind)?
    .run()
    .await
}
