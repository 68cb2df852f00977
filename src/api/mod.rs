pub mod auth;
pub mod fields;
pub mod health;
pub mod metrics;
pub mod plants;
pub mod sheets;
pub mod swagger;


use actix_web::web;
use std::path::Path;

use crate::middleware::AuthMiddleware;
use crate::utils::error::AppError;

/// Registers every route of the service. Shared by `main` and the HTTP tests.
pub fn configure(cfg: &mut web::ServiceConfig, upload_dir: &Path) {
    // Erros de extração respondem no mesmo formato de erro da API
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        AppError::validation(format!("Invalid JSON body: {}", err)).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        AppError::validation(format!("Invalid query: {}", err)).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
        AppError::validation(format!("Invalid path: {}", err)).into()
    }));

    cfg
        // Banner, health & metrics
        .route("/", web::get().to(health::index))
        .route("/health", web::get().to(health::health_check))
        .route("/metrics", web::get().to(metrics::get_metrics))
        // Auth endpoints
        .service(
            web::scope("/api/auth")
                .route("/register", web::post().to(auth::register))
                .route("/login", web::post().to(auth::login))
                .service(
                    web::resource("/me")
                        .wrap(AuthMiddleware)
                        .route(web::get().to(auth::get_me)),
                )
                .service(
                    web::resource("/spreadsheet")
                        .wrap(AuthMiddleware)
                        .route(web::put().to(auth::update_spreadsheet)),
                ),
        )
        // Fields - Requires JWT
        .service(
            web::scope("/api/fields")
                .wrap(AuthMiddleware)
                .route("", web::post().to(fields::create_field))
                .route("", web::get().to(fields::list_fields)),
        )
        // Plants - Requires JWT
        .service(
            web::scope("/api/plants")
                .wrap(AuthMiddleware)
                .route("", web::post().to(plants::capture_plant))
                .route("", web::get().to(plants::list_plants))
                .route("/locations", web::get().to(plants::list_locations))
                .route("/location/{location_id}", web::get().to(plants::plants_at_location))
                .route("/{id}/sync", web::get().to(plants::sync_status)),
        )
        // Sheets - Requires JWT
        .service(
            web::scope("/api/sheets")
                .wrap(AuthMiddleware)
                .route("/records", web::get().to(sheets::get_records)),
        )
        // Fotos enviadas
        .service(actix_files::Files::new("/uploads", upload_dir));
}
