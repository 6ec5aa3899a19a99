use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Configure Swagger UI endpoints
pub fn configure_swagger_routes() -> SwaggerUi {
    SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}

// API Documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::health::health_check,
        crate::api::handlers::hospitals::list_hospitals,
        crate::api::handlers::intakes::list_intakes,
        crate::api::handlers::intakes::create_intake,
        crate::api::handlers::intakes::get_intake,
        crate::api::handlers::intakes::delete_intake,
        crate::api::handlers::intakes::get_intake_summary,
        crate::api::handlers::tokens::get_token,
        crate::api::handlers::tokens::regenerate_token,
        crate::api::handlers::tokens::get_token_qr,
        crate::api::handlers::tokens::view_summary,
        crate::api::handlers::tokens::get_access_logs,
        crate::api::handlers::prescriptions::list_prescriptions_with_medications,
        crate::api::handlers::prescriptions::get_symptom_history,
        crate::api::handlers::notifications::list_notifications,
        crate::api::handlers::notifications::mark_notification_read,
        crate::api::handlers::notifications::mark_all_notifications_read,
        crate::api::handlers::notifications::get_notification_settings,
        crate::api::handlers::notifications::update_notification_settings,
        crate::api::handlers::adherence::record_adherence,
        crate::api::handlers::adherence::get_adherence_summary,
    ),
    components(
        schemas(
            crate::entities::ErrorResponse,
            crate::entities::SuccessResponse,
            crate::entities::IntakeForm,

            crate::api::handlers::health::HealthResponse,
            crate::api::handlers::health::ComponentStatus,
            crate::api::handlers::health::ComponentHealthStatus,

            medbridge_domain::entities::Hospital,
            medbridge_domain::entities::Intake,
            medbridge_domain::entities::ChiefComplaint,
            medbridge_domain::entities::CourseStatus,
            medbridge_domain::entities::AdherenceAnswer,
            medbridge_domain::entities::IntakeCreated,
            medbridge_domain::entities::IntakeSummary,
            medbridge_domain::entities::Medication,
            medbridge_domain::entities::MedicationSource,
            medbridge_domain::entities::VerificationFlag,
            medbridge_domain::entities::FlagType,
            medbridge_domain::entities::AccessToken,
            medbridge_domain::entities::AccessLog,
            medbridge_domain::entities::AccessAction,
            medbridge_domain::entities::TokenGrant,
            medbridge_domain::entities::Prescription,
            medbridge_domain::entities::PrescriptionMedication,
            medbridge_domain::entities::PrescriptionWithMedications,
            medbridge_domain::entities::MedicationStats,
            medbridge_domain::entities::SymptomHistory,
            medbridge_domain::entities::Notification,
            medbridge_domain::entities::NotificationType,
            medbridge_domain::entities::NotificationList,
            medbridge_domain::entities::NotificationSettings,
            medbridge_domain::entities::UpdateNotificationSettings,
            medbridge_domain::entities::AdherenceLog,
            medbridge_domain::entities::AdherenceStatus,
            medbridge_domain::entities::AdherenceSummary,
            medbridge_domain::entities::RecordAdherenceRequest,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "hospitals", description = "Hospital directory"),
        (name = "intakes", description = "Intake questionnaires and prescription uploads"),
        (name = "tokens", description = "Share tokens, QR codes and the clinician view"),
        (name = "prescriptions", description = "Prescription and symptom history"),
        (name = "notifications", description = "Patient notifications"),
        (name = "adherence", description = "Medication adherence tracking")
    ),
    info(
        title = "MedBridge API",
        version = "0.1.0",
        description = "Patient intake and medical record continuity API",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        ),
    ),
    servers(
        (url = "/", description = "Local development server")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_doc_generation() {
        let openapi = ApiDoc::openapi();

        assert_eq!(openapi.info.title, "MedBridge API");
        assert_eq!(openapi.info.version, "0.1.0");

        let tags = openapi.tags.as_ref().unwrap();
        assert!(tags.iter().any(|tag| tag.name == "intakes"));
        assert!(tags.iter().any(|tag| tag.name == "tokens"));

        let paths = &openapi.paths.paths;
        assert!(paths.contains_key("/health"));
        assert!(paths.contains_key("/api/intakes"));
        assert!(paths.contains_key("/api/intakes/{id}/token/qr.svg"));
        assert!(paths.contains_key("/api/view/{token}"));
        assert!(paths.contains_key("/api/symptom-history/{chief_complaint}"));
        assert!(paths.contains_key("/api/adherence/{device_id}/summary"));
    }

    #[test]
    fn test_schemas_are_registered() {
        let openapi = ApiDoc::openapi();
        let schemas = &openapi.components.as_ref().unwrap().schemas;
        for name in ["Intake", "IntakeCreated", "TokenGrant", "ErrorResponse", "SymptomHistory"] {
            assert!(schemas.contains_key(name), "missing schema {}", name);
        }
    }
}
