use crate::database::Database;
use crate::models::SPREADSHEET_NOT_CONFIGURED;
use crate::services::auth_service::hash_password;
use crate::utils::error::AppError;
use chrono::Utc;

pub const DEMO_USERNAME: &str = "demo";
pub const DEMO_EMAIL: &str = "demo@planttracker.com";
pub const DEMO_PASSWORD: &str = "demo123";
pub const DEMO_FARM: &str = "Demo Farm";

/// Seed do usuário demo (demo / demo123).
/// INSERT OR IGNORE: se já existe, não mexe em nada.
pub async fn seed_demo_user(db: &Database, bcrypt_cost: u32) -> Result<bool, AppError> {
    let hashed = hash_password(DEMO_PASSWORD.to_string(), bcrypt_cost).await?;

    let result = sqlx::query(
        "INSERT OR IGNORE INTO users (username, email, password, farm_name, spreadsheet_id, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(DEMO_USERNAME)
    .bind(DEMO_EMAIL)
    .bind(&hashed)
    .bind(DEMO_FARM)
    .bind(SPREADSHEET_NOT_CONFIGURED)
    .bind(Utc::now())
    .execute(db.pool())
    .await?;

    let inserted = result.rows_affected() > 0;
    if inserted {
        log::info!("🌱 Demo user created: {} / {}", DEMO_USERNAME, DEMO_PASSWORD);
    } else {
        log::info!("🌱 Demo user already in DB, skipping seed");
    }

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth_service::{self, LoginRequest, TokenService};
    use crate::test_support::{test_db, TEST_BCRYPT_COST};

    #[tokio::test]
    async fn test_seed_is_idempotent_and_demo_can_login() {
        let (_dir, db) = test_db().await;

        assert!(seed_demo_user(&db, TEST_BCRYPT_COST).await.unwrap());
        assert!(!seed_demo_user(&db, TEST_BCRYPT_COST).await.unwrap());

        let tokens = TokenService::new("secret", "plant-tracker", chrono::Duration::hours(1));
        let response = auth_service::login(
            &db,
            &tokens,
            &LoginRequest {
                username: Some(DEMO_USERNAME.into()),
                password: Some(DEMO_PASSWORD.into()),
            },
        )
        .await
        .unwrap();

        assert_eq!(response.user.farm_name, DEMO_FARM);
        assert_eq!(response.user.spreadsheet_id, SPREADSHEET_NOT_CONFIGURED);
    }
}
