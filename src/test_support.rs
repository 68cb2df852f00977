//! Shared fixtures for the unit and HTTP tests.

use crate::{
    config::Config,
    database::Database,
    jobs::sheet_sync::SyncQueue,
    models::{SyncStatus, User, SPREADSHEET_NOT_CONFIGURED},
    services::{
        auth_service,
        plant_service,
        sheets_service::{SheetRow, SheetSink, SinkError},
    },
};
use async_trait::async_trait;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Mutex;

/// Lowest cost bcrypt accepts; keeps the suite fast.
pub const TEST_BCRYPT_COST: u32 = 4;

/// Fresh database in its own temp dir. Keep the `TempDir` alive for the test.
pub async fn test_db() -> (TempDir, Database) {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = format!("sqlite://{}", dir.path().join("test.db").display());
    let db = Database::connect(&url).await.expect("test database");
    (dir, db)
}

pub fn test_config(dir: &TempDir) -> Config {
    Config {
        host: "127.0.0.1".into(),
        port: 0,
        database_url: format!("sqlite://{}", dir.path().join("test.db").display()),
        jwt_secret: "test-secret".into(),
        jwt_issuer: "plant-tracker".into(),
        jwt_expiry_days: 30,
        bcrypt_cost: TEST_BCRYPT_COST,
        upload_dir: dir.path().join("uploads"),
        max_upload_bytes: 1024 * 1024,
        google_credentials_path: dir.path().join("credentials.json"),
        sheets_timeout_secs: 5,
        sync_max_tracked: 100,
        cors_allowed_origins: None,
        seed_demo_user: false,
    }
}

pub async fn seed_user(db: &Database, username: &str) -> User {
    auth_service::create_user(
        db,
        username,
        &format!("{}@farm.test", username),
        "s3cret",
        "Test Farm",
        SPREADSHEET_NOT_CONFIGURED,
        TEST_BCRYPT_COST,
    )
    .await
    .expect("seed user")
}

/// Polls until the job leaves `Pending` (or gives up after ~2s).
pub async fn wait_for_status(queue: &SyncQueue, db: &Database, user_id: i64, plant_id: i64) -> SyncStatus {
    for _ in 0..200 {
        let plant = plant_service::get_plant(db, user_id, plant_id)
            .await
            .expect("plant");
        let status = queue.status(&plant).await;
        if status != SyncStatus::Pending {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    SyncStatus::Pending
}

#[derive(Default)]
pub struct RecordingSink {
    rows: Mutex<Vec<(String, SheetRow)>>,
}

impl RecordingSink {
    pub async fn rows(&self) -> Vec<(String, SheetRow)> {
        self.rows.lock().await.clone()
    }
}

#[async_trait]
impl SheetSink for RecordingSink {
    async fn append_row(&self, spreadsheet_id: &str, row: &SheetRow) -> Result<(), SinkError> {
        self.rows
            .lock()
            .await
            .push((spreadsheet_id.to_string(), row.clone()));
        Ok(())
    }

    async fn read_rows(&self, spreadsheet_id: &str) -> Result<Vec<Vec<String>>, SinkError> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .filter(|(id, _)| id == spreadsheet_id)
            .map(|(_, row)| row.values())
            .collect())
    }
}

pub struct FailingSink;

#[async_trait]
impl SheetSink for FailingSink {
    async fn append_row(&self, _spreadsheet_id: &str, _row: &SheetRow) -> Result<(), SinkError> {
        Err(SinkError::Api {
            status: 403,
            body: "The caller does not have permission".into(),
        })
    }

    async fn read_rows(&self, _spreadsheet_id: &str) -> Result<Vec<Vec<String>>, SinkError> {
        Err(SinkError::Api {
            status: 403,
            body: "The caller does not have permission".into(),
        })
    }
}

/// Never answers the first append; later appends are recorded.
#[derive(Default)]
pub struct StallFirstSink {
    calls: Mutex<usize>,
    pub inner: RecordingSink,
}

#[async_trait]
impl SheetSink for StallFirstSink {
    async fn append_row(&self, spreadsheet_id: &str, row: &SheetRow) -> Result<(), SinkError> {
        let first = {
            let mut calls = self.calls.lock().await;
            *calls += 1;
            *calls == 1
        };
        if first {
            std::future::pending::<()>().await;
        }
        self.inner.append_row(spreadsheet_id, row).await
    }

    async fn read_rows(&self, spreadsheet_id: &str) -> Result<Vec<Vec<String>>, SinkError> {
        self.inner.read_rows(spreadsheet_id).await
    }
}
