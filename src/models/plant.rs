use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One captured sample at a location (tabela `plants`).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct PlantObservation {
    pub id: i64,
    pub user_id: i64,
    pub field_id: Option<i64>,
    pub location_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    pub photo_path: Option<String>,
    pub notes: String,
    pub plant_type: String,
    pub growth_stage: String,
    pub height_cm: Option<f64>,
    pub health_score: Option<i64>,
    pub synced_to_sheets: bool,
}

/// Validated capture input, ready to be stored.
#[derive(Debug, Clone, Default)]
pub struct NewObservation {
    pub latitude: f64,
    pub longitude: f64,
    pub field_id: Option<i64>,
    pub photo_path: Option<String>,
    pub notes: String,
    pub plant_type: String,
    pub growth_stage: String,
    pub height_cm: Option<f64>,
    pub health_score: Option<i64>,
}

/// Query string of `GET /api/plants`.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PlantQuery {
    /// Center latitude; the radius filter applies only with both coordinates
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Search radius in meters (default 10)
    pub radius: Option<f64>,
    pub field_id: Option<i64>,
}

/// One visited location bucket with its visit statistics.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct LocationSummary {
    pub location_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub photo_count: i64,
    pub last_visit: DateTime<Utc>,
}

/// Estado do espelhamento de uma observação na planilha do usuário
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// User has no spreadsheet linked; nothing was attempted
    NotConfigured,
    /// Queued on the sync worker
    Pending,
    Synced,
    Failed,
    /// No in-memory record (e.g. after a restart) and the stored flag is false
    Unsynced,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::NotConfigured => "not_configured",
            SyncStatus::Pending => "pending",
            SyncStatus::Synced => "synced",
            SyncStatus::Failed => "failed",
            SyncStatus::Unsynced => "unsynced",
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CaptureResponse {
    pub id: i64,
    pub location_id: String,
    #[serde(rename = "syncStatus")]
    pub sync_status: SyncStatus,
    pub message: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SyncStatusResponse {
    pub plant_id: i64,
    pub status: SyncStatus,
}
