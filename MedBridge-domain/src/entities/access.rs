use serde::{Deserialize, Serialize};

use super::intake::Intake;

pub use medbridge_data::models::access::AccessToken;

string_enum! {
    /// What a token holder did
    AccessAction("access action") {
        View => "view",
        Open => "open",
    }
}

/// One recorded use of a share token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AccessLog {
    pub id: String,
    pub intake_id: String,
    pub token_id: String,
    pub accessed_at: String,
    pub action: AccessAction,
}

/// A live share token together with what it unlocks
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "with-api", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    pub intake: Intake,
    pub token: AccessToken,
    /// URL encoded in the QR code
    pub share_url: String,
}
