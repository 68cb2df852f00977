use crate::{
    config::Config,
    database::Database,
    models::{User, UserInfo, SPREADSHEET_NOT_CONFIGURED},
    utils::error::AppError,
};
use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub iat: usize, // issued at
    pub exp: usize, // expiration
    pub iss: String,
}

// Request/Response structures
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub farm_name: Option<String>,
    pub spreadsheet_id: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    /// Username or email
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateSpreadsheetRequest {
    pub spreadsheet_id: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserInfo,
}

/// Issues and verifies the bearer tokens handed to the mobile client.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    lifetime: Duration,
}

impl TokenService {
    pub fn new(secret: &str, issuer: &str, lifetime: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.to_string(),
            lifetime,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.jwt_secret,
            &config.jwt_issuer,
            Duration::days(config.jwt_expiry_days),
        )
    }

    pub fn issue(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            iat: now.timestamp() as usize,
            exp: (now + self.lifetime).timestamp() as usize,
            iss: self.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, String> {
        let mut validation = Validation::new(Algorithm::HS256);

        let mut issuers = HashSet::new();
        issuers.insert(self.issuer.clone());
        validation.iss = Some(issuers);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| format!("Invalid token: {}", e))
    }
}

fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

// Senha vai como veio: espaços fazem parte dela
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

pub(crate) async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

async fn verify_password(password: String, stored_hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify(password, &stored_hash))
        .await
        .map_err(|e| AppError::Internal(format!("Verification task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("Password verification error: {}", e)))
}

/// Inserts a user with a fresh password hash. Only used by registration and the demo seed.
pub async fn create_user(
    db: &Database,
    username: &str,
    email: &str,
    password: &str,
    farm_name: &str,
    spreadsheet_id: &str,
    bcrypt_cost: u32,
) -> Result<User, AppError> {
    let hashed = hash_password(password.to_string(), bcrypt_cost).await?;

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (username, email, password, farm_name, spreadsheet_id, created_at)
         VALUES (?, ?, ?, ?, ?, ?)
         RETURNING id, username, email, password, farm_name, spreadsheet_id, created_at",
    )
    .bind(username)
    .bind(email)
    .bind(&hashed)
    .bind(farm_name)
    .bind(spreadsheet_id)
    .bind(Utc::now())
    .fetch_one(db.pool())
    .await?;

    Ok(user)
}

// User registration
pub async fn register(
    db: &Database,
    tokens: &TokenService,
    request: &RegisterRequest,
    bcrypt_cost: u32,
) -> Result<AuthResponse, AppError> {
    let (username, email, password) = match (
        required(&request.username),
        required(&request.email),
        present(&request.password),
    ) {
        (Some(u), Some(e), Some(p)) => (u, e, p),
        _ => return Err(AppError::validation("Username, email and password required")),
    };

    let farm_name = request.farm_name.as_deref().unwrap_or("").trim();
    let spreadsheet_id = required(&request.spreadsheet_id).unwrap_or(SPREADSHEET_NOT_CONFIGURED);

    let user = create_user(
        db,
        username,
        email,
        password,
        farm_name,
        spreadsheet_id,
        bcrypt_cost,
    )
    .await?;

    let token = tokens.issue(&user)?;

    log::info!("✅ User registered successfully: {} (id {})", user.username, user.id);

    Ok(AuthResponse {
        token,
        user: user.into(),
    })
}

// User login (username ou email)
pub async fn login(
    db: &Database,
    tokens: &TokenService,
    request: &LoginRequest,
) -> Result<AuthResponse, AppError> {
    let (login, password) = match (required(&request.username), present(&request.password)) {
        (Some(l), Some(p)) => (l, p),
        _ => return Err(AppError::validation("Username and password required")),
    };

    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, email, password, farm_name, spreadsheet_id, created_at
         FROM users WHERE username = ? OR email = ?
         ORDER BY username = ? DESC
         LIMIT 1",
    )
    .bind(login)
    .bind(login)
    .bind(login)
    .fetch_optional(db.pool())
    .await?
    .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    let valid = verify_password(password.to_string(), user.password.clone()).await?;
    if !valid {
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    let token = tokens.issue(&user)?;

    Ok(AuthResponse {
        token,
        user: user.into(),
    })
}

pub async fn get_user(db: &Database, user_id: i64) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(
        "SELECT id, username, email, password, farm_name, spreadsheet_id, created_at
         FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(db.pool())
    .await?
    .ok_or_else(|| AppError::not_found("User not found"))
}

/// Links (or re-links) the caller's Google Sheet.
pub async fn update_spreadsheet(
    db: &Database,
    user_id: i64,
    request: &UpdateSpreadsheetRequest,
) -> Result<String, AppError> {
    let spreadsheet_id = required(&request.spreadsheet_id)
        .ok_or_else(|| AppError::validation("Spreadsheet ID required"))?;

    let result = sqlx::query("UPDATE users SET spreadsheet_id = ? WHERE id = ?")
        .bind(spreadsheet_id)
        .bind(user_id)
        .execute(db.pool())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("User not found"));
    }

    Ok(spreadsheet_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_db, TEST_BCRYPT_COST};

    fn tokens() -> TokenService {
        TokenService::new("test-secret", "plant-tracker", Duration::days(30))
    }

    fn register_request(username: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            username: Some(username.to_string()),
            email: Some(email.to_string()),
            password: Some("s3cret".to_string()),
            farm_name: Some("Sunny Acres".to_string()),
            spreadsheet_id: None,
        }
    }

    #[tokio::test]
    async fn test_register_issues_valid_token() {
        let (_dir, db) = test_db().await;
        let tokens = tokens();

        let response = register(&db, &tokens, &register_request("ana", "ana@farm.test"), TEST_BCRYPT_COST)
            .await
            .unwrap();

        assert_eq!(response.user.username, "ana");
        assert_eq!(response.user.farm_name, "Sunny Acres");
        assert_eq!(response.user.spreadsheet_id, SPREADSHEET_NOT_CONFIGURED);

        let claims = tokens.verify(&response.token).unwrap();
        assert_eq!(claims.id, response.user.id);
        assert_eq!(claims.username, "ana");
        assert_eq!(claims.email, "ana@farm.test");
    }

    #[tokio::test]
    async fn test_register_duplicate_username_is_conflict() {
        let (_dir, db) = test_db().await;
        let tokens = tokens();

        let first = register(&db, &tokens, &register_request("ana", "ana@farm.test"), TEST_BCRYPT_COST)
            .await
            .unwrap();
        let second =
            register(&db, &tokens, &register_request("ana", "other@farm.test"), TEST_BCRYPT_COST).await;

        assert!(matches!(second, Err(AppError::Conflict(_))));
        // o token do primeiro cadastro continua válido
        assert!(tokens.verify(&first.token).is_ok());
    }

    #[tokio::test]
    async fn test_register_duplicate_email_is_conflict() {
        let (_dir, db) = test_db().await;
        let tokens = tokens();

        register(&db, &tokens, &register_request("ana", "shared@farm.test"), TEST_BCRYPT_COST)
            .await
            .unwrap();
        let second =
            register(&db, &tokens, &register_request("bruno", "shared@farm.test"), TEST_BCRYPT_COST).await;

        assert!(matches!(second, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_register_requires_fields() {
        let (_dir, db) = test_db().await;
        let mut request = register_request("ana", "ana@farm.test");
        request.password = Some(String::new());

        let result = register(&db, &tokens(), &request, TEST_BCRYPT_COST).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let mut request = register_request("ana", "ana@farm.test");
        request.username = Some("   ".to_string());
        let result = register(&db, &tokens(), &request, TEST_BCRYPT_COST).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_password_whitespace_is_significant() {
        let (_dir, db) = test_db().await;
        let tokens = tokens();
        let mut request = register_request("ana", "ana@farm.test");
        request.password = Some(" abc ".to_string());
        register(&db, &tokens, &request, TEST_BCRYPT_COST).await.unwrap();

        let login_with = |password: &str| LoginRequest {
            username: Some("ana".to_string()),
            password: Some(password.to_string()),
        };

        let trimmed = login(&db, &tokens, &login_with("abc")).await;
        assert!(matches!(trimmed, Err(AppError::Unauthorized(_))));

        let exact = login(&db, &tokens, &login_with(" abc ")).await.unwrap();
        assert_eq!(exact.user.username, "ana");
    }

    #[tokio::test]
    async fn test_login_by_username_or_email() {
        let (_dir, db) = test_db().await;
        let tokens = tokens();
        register(&db, &tokens, &register_request("ana", "ana@farm.test"), TEST_BCRYPT_COST)
            .await
            .unwrap();

        for login_name in ["ana", "ana@farm.test"] {
            let response = login(
                &db,
                &tokens,
                &LoginRequest {
                    username: Some(login_name.to_string()),
                    password: Some("s3cret".to_string()),
                },
            )
            .await
            .unwrap();
            assert_eq!(response.user.username, "ana");
        }
    }

    #[tokio::test]
    async fn test_login_wrong_password_is_unauthorized() {
        let (_dir, db) = test_db().await;
        let tokens = tokens();
        register(&db, &tokens, &register_request("ana", "ana@farm.test"), TEST_BCRYPT_COST)
            .await
            .unwrap();

        let result = login(
            &db,
            &tokens,
            &LoginRequest {
                username: Some("ana".to_string()),
                password: Some("wrong".to_string()),
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));

        let unknown = login(
            &db,
            &tokens,
            &LoginRequest {
                username: Some("nobody".to_string()),
                password: Some("s3cret".to_string()),
            },
        )
        .await;
        assert!(matches!(unknown, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_update_spreadsheet() {
        let (_dir, db) = test_db().await;
        let response = register(&db, &tokens(), &register_request("ana", "ana@farm.test"), TEST_BCRYPT_COST)
            .await
            .unwrap();

        let missing = update_spreadsheet(
            &db,
            response.user.id,
            &UpdateSpreadsheetRequest { spreadsheet_id: None },
        )
        .await;
        assert!(matches!(missing, Err(AppError::Validation(_))));

        update_spreadsheet(
            &db,
            response.user.id,
            &UpdateSpreadsheetRequest {
                spreadsheet_id: Some("sheet-123".to_string()),
            },
        )
        .await
        .unwrap();

        let user = get_user(&db, response.user.id).await.unwrap();
        assert_eq!(user.spreadsheet_id, "sheet-123");
        assert!(user.has_spreadsheet());
    }

    #[test]
    fn test_token_rejected_with_other_secret_or_issuer() {
        let user = User {
            id: 1,
            username: "ana".into(),
            email: "ana@farm.test".into(),
            password: String::new(),
            farm_name: String::new(),
            spreadsheet_id: SPREADSHEET_NOT_CONFIGURED.into(),
            created_at: Utc::now(),
        };
        let token = tokens().issue(&user).unwrap();

        let other_secret = TokenService::new("another-secret", "plant-tracker", Duration::days(30));
        assert!(other_secret.verify(&token).is_err());

        let other_issuer = TokenService::new("test-secret", "someone-else", Duration::days(30));
        assert!(other_issuer.verify(&token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let user = User {
            id: 1,
            username: "ana".into(),
            email: "ana@farm.test".into(),
            password: String::new(),
            farm_name: String::new(),
            spreadsheet_id: SPREADSHEET_NOT_CONFIGURED.into(),
            created_at: Utc::now(),
        };
        // expirado há 2 dias (além do leeway padrão de 60s)
        let expired = TokenService::new("test-secret", "plant-tracker", Duration::days(-2));
        let token = expired.issue(&user).unwrap();
        assert!(tokens().verify(&token).is_err());
    }
}
