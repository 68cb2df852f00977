use crate::{
    database::Database,
    models::{CreateFieldRequest, Field},
    utils::error::AppError,
};
use chrono::Utc;

pub async fn create_field(
    db: &Database,
    user_id: i64,
    request: &CreateFieldRequest,
) -> Result<i64, AppError> {
    let name = request
        .name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::validation("Field name required"))?;

    let result = sqlx::query(
        "INSERT INTO fields (user_id, name, size_acres, crop_type, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(name)
    .bind(request.size_acres.unwrap_or(0.0))
    .bind(request.crop_type.as_deref().unwrap_or("").trim())
    .bind(Utc::now())
    .execute(db.pool())
    .await?;

    Ok(result.last_insert_rowid())
}

/// Fields owned by `user_id`, newest first.
pub async fn list_fields(db: &Database, user_id: i64) -> Result<Vec<Field>, AppError> {
    let fields = sqlx::query_as::<_, Field>(
        "SELECT id, user_id, name, size_acres, crop_type, created_at
         FROM fields WHERE user_id = ?
         ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(db.pool())
    .await?;

    Ok(fields)
}

/// Busca um field do próprio usuário; field de outro usuário conta como inexistente
pub async fn get_field(db: &Database, user_id: i64, field_id: i64) -> Result<Field, AppError> {
    sqlx::query_as::<_, Field>(
        "SELECT id, user_id, name, size_acres, crop_type, created_at
         FROM fields WHERE id = ? AND user_id = ?",
    )
    .bind(field_id)
    .bind(user_id)
    .fetch_optional(db.pool())
    .await?
    .ok_or_else(|| AppError::not_found("Field not found"))
}
