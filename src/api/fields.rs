use actix_web::{web, HttpResponse};

use crate::{
    database::Database,
    middleware::auth::Claims,
    models::{CreateFieldRequest, CreateFieldResponse, Field},
    services::field_service,
    utils::error::AppError,
};

#[utoipa::path(
    post,
    path = "/api/fields",
    tag = "Fields",
    request_body = CreateFieldRequest,
    responses(
        (status = 200, description = "Field created", body = CreateFieldResponse),
        (status = 400, description = "Field name required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_field(
    user: web::ReqData<Claims>,
    db: web::Data<Database>,
    request: web::Json<CreateFieldRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("🌾 POST /fields - user {}", user.id);

    let id = field_service::create_field(&db, user.id, &request).await?;

    log::info!("✅ Field {} created for user {}", id, user.id);
    Ok(HttpResponse::Ok().json(CreateFieldResponse {
        id,
        message: "Field created successfully".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/fields",
    tag = "Fields",
    responses(
        (status = 200, description = "Fields owned by the caller, newest first", body = Vec<Field>)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_fields(
    user: web::ReqData<Claims>,
    db: web::Data<Database>,
) -> Result<HttpResponse, AppError> {
    log::debug!("📋 GET /fields - user {}", user.id);

    let fields = field_service::list_fields(&db, user.id).await?;
    Ok(HttpResponse::Ok().json(fields))
}
