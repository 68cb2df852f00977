use actix_web::{web, HttpResponse};

use crate::{
    config::Config,
    database::Database,
    middleware::auth::Claims,
    models::UserInfo,
    services::auth_service::{
        self, AuthResponse, LoginRequest, RegisterRequest, TokenService, UpdateSpreadsheetRequest,
    },
    utils::error::AppError,
};

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Registration successful", body = AuthResponse),
        (status = 400, description = "Missing fields, or username/email already exists")
    )
)]
pub async fn register(
    db: web::Data<Database>,
    tokens: web::Data<TokenService>,
    config: web::Data<Config>,
    request: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let username = request.username.as_deref().unwrap_or("N/A");
    log::info!("📝 POST /auth/register - username: {}", username);

    match auth_service::register(&db, &tokens, &request, config.bcrypt_cost).await {
        Ok(response) => {
            log::info!("✅ Registration successful: {}", response.user.username);
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => {
            log::warn!("❌ Registration failed: {} - {}", username, e);
            Err(e)
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Missing username or password"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    db: web::Data<Database>,
    tokens: web::Data<TokenService>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let username = request.username.as_deref().unwrap_or("N/A");
    log::info!("🔐 POST /auth/login - username: {}", username);

    match auth_service::login(&db, &tokens, &request).await {
        Ok(response) => {
            log::info!("✅ Login successful: {}", response.user.username);
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => {
            log::warn!("❌ Login failed: {} - {}", username, e);
            Err(e)
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = UserInfo),
        (status = 401, description = "Missing token"),
        (status = 403, description = "Invalid or expired token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_me(
    user: web::ReqData<Claims>,
    db: web::Data<Database>,
) -> Result<HttpResponse, AppError> {
    log::info!("👤 GET /auth/me - user {}", user.id);

    let current = auth_service::get_user(&db, user.id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "user": UserInfo::from(current)
    })))
}

#[utoipa::path(
    put,
    path = "/api/auth/spreadsheet",
    tag = "Auth",
    request_body = UpdateSpreadsheetRequest,
    responses(
        (status = 200, description = "Spreadsheet linked"),
        (status = 400, description = "Spreadsheet ID required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_spreadsheet(
    user: web::ReqData<Claims>,
    db: web::Data<Database>,
    request: web::Json<UpdateSpreadsheetRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("🔧 PUT /auth/spreadsheet - user {}", user.username);

    let spreadsheet_id = auth_service::update_spreadsheet(&db, user.id, &request).await?;

    log::info!("✅ Spreadsheet updated for user: {}", user.username);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Spreadsheet ID updated successfully",
        "spreadsheet_id": spreadsheet_id
    })))
}
