use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel stored in `users.spreadsheet_id` until the user links a sheet.
pub const SPREADSHEET_NOT_CONFIGURED: &str = "not_configured";

/// Linha da tabela `users` (inclui o hash da senha, nunca serializar direto)
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub farm_name: String,
    pub spreadsheet_id: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// `true` when the user has a real spreadsheet id rather than the sentinel.
    pub fn has_spreadsheet(&self) -> bool {
        is_configured_spreadsheet(&self.spreadsheet_id)
    }
}

pub fn is_configured_spreadsheet(spreadsheet_id: &str) -> bool {
    let id = spreadsheet_id.trim();
    !id.is_empty() && id != SPREADSHEET_NOT_CONFIGURED
}

/// Public view of a user, as returned by the auth endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub farm_name: String,
    pub spreadsheet_id: String,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            farm_name: user.farm_name,
            spreadsheet_id: user.spreadsheet_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_is_not_configured() {
        assert!(!is_configured_spreadsheet(SPREADSHEET_NOT_CONFIGURED));
        assert!(!is_configured_spreadsheet(""));
        assert!(!is_configured_spreadsheet("   "));
        assert!(is_configured_spreadsheet("1BxiMVs0XRA5nFMdKvBdBZjgmUUqptlbs74OgvE2upms"));
    }
}
