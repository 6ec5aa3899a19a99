use serde::{Deserialize, Serialize};

/// Storage model for a share token granting read access to one intake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    pub id: String,
    pub intake_id: String,
    /// Opaque value embedded in the share URL
    pub token: String,
    pub created_at: String,
    pub expires_at: String,
    pub is_invalidated: bool,
}

/// Storage model for an access-log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessLog {
    pub id: String,
    pub intake_id: String,
    pub token_id: String,
    pub accessed_at: String,
    pub action: String,
}
