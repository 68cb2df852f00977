use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

/// Runtime configuration, read once at startup from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_expiry_days: i64,
    pub bcrypt_cost: u32,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub google_credentials_path: PathBuf,
    /// Limite por chamada ao Google e por job de sync
    pub sheets_timeout_secs: u64,
    /// Estados de sync finalizados mantidos em memória
    pub sync_max_tracked: usize,
    /// `None` aceita qualquer origem (variante pública)
    pub cors_allowed_origins: Option<Vec<String>>,
    pub seed_demo_user: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            log::warn!("⚠️  JWT_SECRET not set, using development secret");
            "plant-tracker-dev-secret-change-me".to_string()
        });

        let max_upload_mb: usize = parse_or("MAX_UPLOAD_MB", 50);

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("PORT", 3000),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://plants.db".to_string()),
            jwt_secret,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "plant-tracker".to_string()),
            jwt_expiry_days: parse_or("JWT_EXPIRY_DAYS", 30),
            bcrypt_cost: parse_or("BCRYPT_COST", 10),
            upload_dir: env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| "uploads".to_string())
                .into(),
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            google_credentials_path: env::var("GOOGLE_CREDENTIALS_PATH")
                .unwrap_or_else(|_| "./credentials.json".to_string())
                .into(),
            sheets_timeout_secs: parse_or("SHEETS_TIMEOUT_SECS", 30),
            sync_max_tracked: parse_or("SYNC_MAX_TRACKED", 10_000),
            cors_allowed_origins: parse_origins(
                &env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string()),
            ),
            seed_demo_user: parse_or("SEED_DEMO_USER", true),
        }
    }

    pub fn sheets_timeout(&self) -> Duration {
        Duration::from_secs(self.sheets_timeout_secs.max(1))
    }
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|e| {
            log::warn!("⚠️  Invalid {} value '{}': {} (using {})", key, raw, e, default);
            default
        }),
        Err(_) => default,
    }
}

fn parse_origins(raw: &str) -> Option<Vec<String>> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "*" {
        return None;
    }
    Some(
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    )
}
