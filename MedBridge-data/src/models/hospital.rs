use serde::{Deserialize, Serialize};

/// Storage model for a hospital or pharmacy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Hospital {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    /// Institution kind (university hospital, clinic, pharmacy, ...)
    #[serde(rename = "type")]
    pub hospital_type: String,
}

/// Input for inserting a hospital
#[derive(Debug, Clone)]
pub struct NewHospital {
    pub name: String,
    pub address: Option<String>,
    pub hospital_type: String,
}
