// ==================== GOOGLE SHEETS SINK ====================
// Espelha cada captura como uma linha na planilha do usuário.
// Autenticação via service account (JWT RS256 -> access token OAuth).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::models::{PlantObservation, User};

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

pub const HEADER_RANGE: &str = "A1:M1";
pub const APPEND_RANGE: &str = "A:M";
pub const RECORDS_RANGE: &str = "A2:M";

pub const SHEET_HEADERS: [&str; 13] = [
    "Timestamp",
    "User ID",
    "Username",
    "Farm Name",
    "Field Name",
    "Location ID",
    "Latitude",
    "Longitude",
    "Plant Type",
    "Growth Stage",
    "Height (cm)",
    "Health Score",
    "Notes",
];

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Google Sheets credentials not loaded")]
    Disabled,

    #[error("Failed to load credentials: {0}")]
    Credentials(String),

    #[error("Google auth failed: {0}")]
    Auth(String),

    #[error("Google Sheets request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Google Sheets API error {status}: {body}")]
    Api { status: u16, body: String },
}

/// Row mirrored to the sheet for one observation, in `SHEET_HEADERS` order.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    pub timestamp: DateTime<Utc>,
    pub user_id: i64,
    pub username: String,
    pub farm_name: String,
    pub field_name: String,
    pub location_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub plant_type: String,
    pub growth_stage: String,
    pub height_cm: Option<f64>,
    pub health_score: Option<i64>,
    pub notes: String,
}

impl SheetRow {
    pub fn new(user: &User, field_name: Option<&str>, plant: &PlantObservation) -> Self {
        Self {
            timestamp: plant.timestamp,
            user_id: user.id,
            username: user.username.clone(),
            farm_name: user.farm_name.clone(),
            field_name: field_name.unwrap_or("").to_string(),
            location_id: plant.location_id.clone(),
            latitude: plant.latitude,
            longitude: plant.longitude,
            plant_type: plant.plant_type.clone(),
            growth_stage: plant.growth_stage.clone(),
            height_cm: plant.height_cm,
            health_score: plant.health_score,
            notes: plant.notes.clone(),
        }
    }

    pub fn values(&self) -> Vec<String> {
        vec![
            self.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            self.user_id.to_string(),
            self.username.clone(),
            self.farm_name.clone(),
            self.field_name.clone(),
            self.location_id.clone(),
            self.latitude.to_string(),
            self.longitude.to_string(),
            self.plant_type.clone(),
            self.growth_stage.clone(),
            self.height_cm.map(|h| h.to_string()).unwrap_or_default(),
            self.health_score.map(|s| s.to_string()).unwrap_or_default(),
            self.notes.clone(),
        ]
    }
}

/// Tabular destination addressed by a per-user spreadsheet id.
#[async_trait]
pub trait SheetSink: Send + Sync {
    async fn append_row(&self, spreadsheet_id: &str, row: &SheetRow) -> Result<(), SinkError>;

    /// Data rows (header excluded).
    async fn read_rows(&self, spreadsheet_id: &str) -> Result<Vec<Vec<String>>, SinkError>;
}

/// Sink used when no service-account credentials are available.
/// Appends fail; reads see an empty sheet.
pub struct DisabledSheets;

#[async_trait]
impl SheetSink for DisabledSheets {
    async fn append_row(&self, _spreadsheet_id: &str, _row: &SheetRow) -> Result<(), SinkError> {
        Err(SinkError::Disabled)
    }

    async fn read_rows(&self, _spreadsheet_id: &str) -> Result<Vec<Vec<String>>, SinkError> {
        // sem cliente não há o que ler
        Ok(Vec::new())
    }
}

/// Campos usados do JSON de service account do Google Cloud
#[derive(Debug, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

pub struct GoogleSheetsClient {
    http: reqwest::Client,
    client_email: String,
    signing_key: EncodingKey,
    token_uri: String,
    token: Mutex<Option<CachedToken>>,
}

/// HTTP client shared by token and Sheets calls; every request is bounded by `timeout`.
fn http_client(timeout: Duration) -> Result<reqwest::Client, SinkError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
        .map_err(|e| SinkError::Credentials(format!("http client: {}", e)))
}

impl GoogleSheetsClient {
    pub fn new(key: ServiceAccountKey, timeout: Duration) -> Result<Self, SinkError> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| SinkError::Credentials(format!("invalid private key: {}", e)))?;

        Ok(Self {
            http: http_client(timeout)?,
            client_email: key.client_email,
            signing_key,
            token_uri: key
                .token_uri
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            token: Mutex::new(None),
        })
    }

    pub async fn from_credentials_file(path: &Path, timeout: Duration) -> Result<Self, SinkError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SinkError::Credentials(format!("{}: {}", path.display(), e)))?;
        let key: ServiceAccountKey = serde_json::from_str(&raw)
            .map_err(|e| SinkError::Credentials(format!("{}: {}", path.display(), e)))?;
        Self::new(key, timeout)
    }

    /// Returns a cached access token, refreshing it a minute before expiry.
    async fn access_token(&self) -> Result<String, SinkError> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.expires_at > Utc::now() + chrono::Duration::seconds(60) {
                return Ok(token.access_token.clone());
            }
        }

        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + 3600,
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| SinkError::Auth(format!("failed to sign assertion: {}", e)))?;

        let response = self
            .http
            .post(&self.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Auth(format!("token endpoint returned {}: {}", status, body)));
        }

        let token: TokenResponse = response.json().await?;
        log::debug!("🔑 Google access token refreshed (expires in {}s)", token.expires_in);

        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at: Utc::now() + chrono::Duration::seconds(token.expires_in),
        });

        Ok(token.access_token)
    }

    async fn get_values(&self, spreadsheet_id: &str, range: &str) -> Result<ValueRange, SinkError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(values_url(spreadsheet_id, range, ""))
            .bearer_auth(token)
            .send()
            .await?;

        check_status(response).await?.json().await.map_err(SinkError::from)
    }

    /// Writes the header row when `A1:M1` is empty.
    async fn ensure_headers(&self, spreadsheet_id: &str) -> Result<(), SinkError> {
        let existing = self.get_values(spreadsheet_id, HEADER_RANGE).await?;
        if !existing.values.is_empty() {
            return Ok(());
        }

        let token = self.access_token().await?;
        let response = self
            .http
            .put(values_url(spreadsheet_id, HEADER_RANGE, "?valueInputOption=RAW"))
            .bearer_auth(token)
            .json(&serde_json::json!({ "values": [SHEET_HEADERS] }))
            .send()
            .await?;
        check_status(response).await?;

        log::info!("📋 Headers created in Google Sheet {}", spreadsheet_id);
        Ok(())
    }
}

#[async_trait]
impl SheetSink for GoogleSheetsClient {
    async fn append_row(&self, spreadsheet_id: &str, row: &SheetRow) -> Result<(), SinkError> {
        self.ensure_headers(spreadsheet_id).await?;

        let token = self.access_token().await?;
        let response = self
            .http
            .post(values_url(
                spreadsheet_id,
                APPEND_RANGE,
                ":append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
            ))
            .bearer_auth(token)
            .json(&serde_json::json!({ "values": [row.values()] }))
            .send()
            .await?;
        check_status(response).await?;

        Ok(())
    }

    async fn read_rows(&self, spreadsheet_id: &str) -> Result<Vec<Vec<String>>, SinkError> {
        let range = self.get_values(spreadsheet_id, RECORDS_RANGE).await?;
        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }
}

fn values_url(spreadsheet_id: &str, range: &str, suffix: &str) -> String {
    format!(
        "{}/{}/values/{}{}",
        SHEETS_API_BASE,
        urlencoding::encode(spreadsheet_id),
        urlencoding::encode(range),
        suffix
    )
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SinkError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(SinkError::Api { status, body })
}

fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Loads the service-account client, or falls back to `DisabledSheets`.
pub async fn load_sink(credentials_path: &Path, timeout: Duration) -> std::sync::Arc<dyn SheetSink> {
    match GoogleSheetsClient::from_credentials_file(credentials_path, timeout).await {
        Ok(client) => {
            log::info!("✅ Google Sheets service initialized ({})", client.client_email);
            std::sync::Arc::new(client)
        }
        Err(e) => {
            log::warn!("⚠️  Google Sheets initialization error: {}", e);
            log::warn!("   Running without Google Sheets integration");
            std::sync::Arc::new(DisabledSheets)
        }
    }
}
