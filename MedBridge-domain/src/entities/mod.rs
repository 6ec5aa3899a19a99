// Domain entities and value objects

/// Closed set of string values stored and exchanged in snake_case form.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident($label:literal) {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[cfg_attr(feature = "with-api", derive(utoipa::ToSchema))]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $text)] $variant),+
        }

        impl $name {
            /// Every accepted value
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire and storage representation
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!(
                        "'{}' is not a valid {}; expected one of: {}",
                        other,
                        $label,
                        [$($text),+].join(", ")
                    )),
                }
            }
        }
    };
}

pub mod access;
pub mod adherence;
pub mod conversions;
pub mod intake;
pub mod medication;
pub mod notification;
pub mod prescription;

// Re-export common types for easier imports
pub use access::{AccessAction, AccessLog, AccessToken, TokenGrant};
pub use adherence::{AdherenceLog, AdherenceStatus, AdherenceSummary, RecordAdherenceRequest};
pub use intake::{
    AdherenceAnswer, ChiefComplaint, CourseStatus, CreateIntakeRequest, Intake, IntakeCreated,
    IntakeSummary, UploadedDocument,
};
pub use medication::{
    DetectedConflict, ExtractedMedication, FlagType, Medication, MedicationSource, OcrResult,
    VerificationFlag,
};
pub use medbridge_data::models::hospital::Hospital;
pub use notification::{
    Notification, NotificationList, NotificationSettings, NotificationType, UpdateNotificationSettings,
};
pub use prescription::{
    MedicationStats, Prescription, PrescriptionMedication, PrescriptionWithMedications, SymptomHistory,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_enum_round_trip_and_error() {
        for complaint in ChiefComplaint::ALL {
            assert_eq!(complaint.as_str().parse::<ChiefComplaint>().unwrap(), *complaint);
        }
        assert_eq!(ChiefComplaint::ALL.len(), 11);

        let err = "sneezing".parse::<ChiefComplaint>().unwrap_err();
        assert!(err.contains("chief complaint"));
        assert!(err.contains("respiratory"));
    }

    #[test]
    fn test_string_enum_serde_uses_snake_case() {
        let json = serde_json::to_string(&FlagType::AllergyConflict).unwrap();
        assert_eq!(json, "\"allergy_conflict\"");
        let parsed: NotificationType = serde_json::from_str("\"intake_viewed\"").unwrap();
        assert_eq!(parsed, NotificationType::IntakeViewed);
    }
}
