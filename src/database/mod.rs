use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        // SQLite serializa escritas; poucas conexões bastam
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.ensure_schema().await?;

        Ok(db)
    }

    /// Creates tables and indexes if they do not exist yet.
    async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        log::info!("🔧 Ensuring database schema...");

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                email TEXT UNIQUE NOT NULL,
                password TEXT NOT NULL,
                farm_name TEXT NOT NULL DEFAULT '',
                spreadsheet_id TEXT NOT NULL DEFAULT 'not_configured',
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS fields (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                size_acres REAL NOT NULL DEFAULT 0,
                crop_type TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS plants (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                field_id INTEGER,
                location_id TEXT NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                timestamp TEXT NOT NULL,
                photo_path TEXT,
                notes TEXT NOT NULL DEFAULT '',
                plant_type TEXT NOT NULL DEFAULT '',
                growth_stage TEXT NOT NULL DEFAULT '',
                height_cm REAL,
                health_score INTEGER,
                synced_to_sheets BOOLEAN NOT NULL DEFAULT 0,
                FOREIGN KEY (user_id) REFERENCES users(id),
                FOREIGN KEY (field_id) REFERENCES fields(id)
            )",
        )
        .execute(&self.pool)
        .await?;

        let indexes = [
            ("idx_location", "CREATE INDEX IF NOT EXISTS idx_location ON plants(location_id)"),
            ("idx_user_plants", "CREATE INDEX IF NOT EXISTS idx_user_plants ON plants(user_id)"),
            ("idx_coords", "CREATE INDEX IF NOT EXISTS idx_coords ON plants(latitude, longitude)"),
            ("idx_user_fields", "CREATE INDEX IF NOT EXISTS idx_user_fields ON fields(user_id)"),
        ];

        for (name, statement) in indexes {
            sqlx::query(statement).execute(&self.pool).await?;
            log::debug!("   ✅ Index ready: {}", name);
        }

        log::info!("✅ Database schema ready");

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
