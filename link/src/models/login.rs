use serde::{Deserialize, Serialize};

use super::user::UserSummary;

/// Email/password login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Account email
    pub email: String,
    /// Account password
    pub password: String,
}

/// Login response from the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Bearer token for subsequent API calls
    pub access_token: String,
    /// Authenticated user
    pub user: UserSummary,
    /// Token expiration time in RFC3339 format
    #[serde(default)]
    pub expires_at: Option<String>,
}
