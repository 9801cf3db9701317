use serde::{Deserialize, Serialize};

/// Health check response from the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResponse {
    /// Health status (e.g., "ok")
    pub status: String,

    /// Server version
    #[serde(default)]
    pub version: String,
}
