use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sub-area of a farm, owned by exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct Field {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub size_acres: f64,
    pub crop_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateFieldRequest {
    pub name: Option<String>,
    pub size_acres: Option<f64>,
    pub crop_type: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CreateFieldResponse {
    pub id: i64,
    pub message: String,
}
