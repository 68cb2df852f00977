use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::{
    database::Database,
    middleware::auth::Claims,
    services::{auth_service, sheets_service::SheetSink},
    utils::error::AppError,
};

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SheetRecordsResponse {
    pub total: usize,
    /// Raw rows in header order (Timestamp .. Notes)
    pub records: Vec<Vec<String>>,
}

#[utoipa::path(
    get,
    path = "/api/sheets/records",
    tag = "Sheets",
    responses(
        (status = 200, description = "Rows of the caller's spreadsheet", body = SheetRecordsResponse),
        (status = 500, description = "Spreadsheet could not be read")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_records(
    user: web::ReqData<Claims>,
    db: web::Data<Database>,
    sink: web::Data<dyn SheetSink>,
) -> Result<HttpResponse, AppError> {
    log::info!("📄 GET /sheets/records - user {}", user.id);

    let current = auth_service::get_user(&db, user.id).await?;
    if !current.has_spreadsheet() {
        return Ok(HttpResponse::Ok().json(SheetRecordsResponse {
            total: 0,
            records: Vec::new(),
        }));
    }

    let records = sink
        .read_rows(&current.spreadsheet_id)
        .await
        .map_err(|e| {
            log::error!("❌ Error reading from Google Sheets for user {}: {}", user.id, e);
            AppError::Internal("Failed to fetch Google Sheets records".to_string())
        })?;

    Ok(HttpResponse::Ok().json(SheetRecordsResponse {
        total: records.len(),
        records,
    }))
}
