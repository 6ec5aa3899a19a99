use serde::{Deserialize, Serialize};

/// Storage model for a patient, identified by the client's device id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: String,
    pub device_id: String,
    pub created_at: String,
}
