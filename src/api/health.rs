use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use crate::database::Database;

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: i64,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(db: web::Data<Database>) -> impl Responder {
    let healthy = db.health_check().await;

    let body = HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        service: "plant-tracker".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().timestamp(),
    };

    if healthy {
        HttpResponse::Ok().json(body)
    } else {
        log::error!("❌ Health check failed: database unreachable");
        HttpResponse::ServiceUnavailable().json(body)
    }
}

/// Banner com a lista de endpoints (o app mobile usa para checar conectividade)
pub async fn index() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "Plant Tracker API Server",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "auth": {
                "register": "POST /api/auth/register",
                "login": "POST /api/auth/login",
                "me": "GET /api/auth/me",
                "spreadsheet": "PUT /api/auth/spreadsheet"
            },
            "fields": {
                "create": "POST /api/fields",
                "list": "GET /api/fields"
            },
            "plants": {
                "capture": "POST /api/plants",
                "list": "GET /api/plants",
                "locations": "GET /api/plants/locations",
                "byLocation": "GET /api/plants/location/:locationId",
                "syncStatus": "GET /api/plants/:id/sync"
            },
            "sheets": {
                "records": "GET /api/sheets/records"
            },
            "docs": "GET /swagger-ui/"
        }
    }))
}
