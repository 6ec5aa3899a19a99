//! Share tokens and the clinician view they unlock.
//!
//! A token is usable until its expiry instant unless it was invalidated.
//! Expiry is checked when a token is presented; nothing sweeps old tokens.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use medbridge_data::models::format_timestamp;
use medbridge_data::repository::{AccessRepositoryTrait, IntakeRepositoryTrait};

use super::{AdherenceService, NotificationService, ServiceError};
use crate::audit::{log_access_event, AccessEvent, AccessEventType};
use crate::entities::conversions::{
    convert_all, convert_to_domain_access_log, convert_to_domain_flag, convert_to_domain_intake,
    convert_to_domain_medication,
};
use crate::entities::{AccessAction, AccessLog, AccessToken, Intake, IntakeSummary, TokenGrant};

/// Lifetime rules for share tokens
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenPolicy {
    ttl: Duration,
}

impl TokenPolicy {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    pub fn from_minutes(minutes: i64) -> Self {
        Self::new(Duration::minutes(minutes))
    }

    /// Fresh token for an intake, valid from `now` for the policy's lifetime
    pub fn issue(&self, intake_id: &str, now: DateTime<Utc>) -> AccessToken {
        AccessToken {
            id: Uuid::new_v4().to_string(),
            intake_id: intake_id.to_string(),
            token: Uuid::new_v4().simple().to_string(),
            created_at: format_timestamp(now),
            expires_at: format_timestamp(now + self.ttl),
            is_invalidated: false,
        }
    }

    /// Whether a token may still be used at `now`. A token whose expiry
    /// cannot be read is never usable.
    pub fn is_usable(&self, token: &AccessToken, now: DateTime<Utc>) -> bool {
        if token.is_invalidated {
            return false;
        }
        DateTime::parse_from_rfc3339(&token.expires_at)
            .map(|expires_at| now < expires_at.with_timezone(&Utc))
            .unwrap_or(false)
    }
}

/// Issues share tokens and serves the summaries they unlock
#[derive(Clone)]
pub struct AccessService {
    intakes: Arc<dyn IntakeRepositoryTrait>,
    access: Arc<dyn AccessRepositoryTrait>,
    adherence: AdherenceService,
    notifications: NotificationService,
    policy: TokenPolicy,
    public_base_url: String,
}

impl AccessService {
    pub fn new(
        intakes: Arc<dyn IntakeRepositoryTrait>,
        access: Arc<dyn AccessRepositoryTrait>,
        adherence: AdherenceService,
        notifications: NotificationService,
        policy: TokenPolicy,
        public_base_url: String,
    ) -> Self {
        Self {
            intakes,
            access,
            adherence,
            notifications,
            policy,
            public_base_url,
        }
    }

    /// URL a clinician opens to see the summary; this is what the QR code encodes
    pub fn share_url(&self, token: &str) -> String {
        format!("{}/view/{}", self.public_base_url, token)
    }

    /// Return the intake's live token, issuing one when none is left
    #[instrument(skip(self))]
    pub async fn get_or_issue_token(&self, intake_id: &str) -> Result<TokenGrant, ServiceError> {
        let intake = self.load_intake(intake_id).await?;

        let now = Utc::now();
        let active = self
            .access
            .tokens_for_intake(intake_id)
            .await?
            .into_iter()
            .find(|token| self.policy.is_usable(token, now));

        let token = match active {
            Some(token) => {
                debug!("Reusing token {} for intake {}", token.id, intake_id);
                token
            }
            None => self.issue_token(intake_id).await?,
        };

        Ok(self.grant(intake, token))
    }

    /// Invalidate every token of the intake and issue a new one
    #[instrument(skip(self))]
    pub async fn regenerate_token(&self, intake_id: &str) -> Result<TokenGrant, ServiceError> {
        let intake = self.load_intake(intake_id).await?;

        let invalidated = self.access.invalidate_for_intake(intake_id).await?;
        let token = self.policy.issue(intake_id, Utc::now());
        let token = self.access.create_token(token).await?;

        log_access_event(
            AccessEvent::new(AccessEventType::TokenRegenerated, true)
                .with_intake(intake_id)
                .with_token(token.id.clone())
                .with_details(format!("{} previous tokens invalidated", invalidated)),
        );

        Ok(self.grant(intake, token))
    }

    /// Store a new token for an intake
    pub async fn issue_token(&self, intake_id: &str) -> Result<AccessToken, ServiceError> {
        let token = self.policy.issue(intake_id, Utc::now());
        let token = self.access.create_token(token).await?;

        log_access_event(
            AccessEvent::new(AccessEventType::TokenIssued, true)
                .with_intake(intake_id)
                .with_token(token.id.clone())
                .with_details(format!("expires at {}", token.expires_at)),
        );
        Ok(token)
    }

    /// Invalidate every token of an intake. Returns the number invalidated.
    pub async fn invalidate_all(&self, intake_id: &str) -> Result<usize, ServiceError> {
        Ok(self.access.invalidate_for_intake(intake_id).await?)
    }

    /// Serve the summary a token unlocks and record the view.
    ///
    /// Unknown, invalidated and expired tokens are all answered the same way
    /// so a caller cannot tell them apart.
    #[instrument(skip(self, token_value))]
    pub async fn view_summary(&self, token_value: &str) -> Result<IntakeSummary, ServiceError> {
        let token = match self.access.find_by_token(token_value).await? {
            Some(token) if self.policy.is_usable(&token, Utc::now()) => token,
            found => {
                let mut event = AccessEvent::new(AccessEventType::TokenRejected, false);
                if let Some(token) = found {
                    event = event.with_intake(token.intake_id).with_token(token.id);
                }
                log_access_event(event.with_details("unknown, invalidated or expired token"));
                return Err(ServiceError::Gone("Token expired or invalid".to_string()));
            }
        };

        let summary = self.summary_for(&token.intake_id).await?;

        self.access
            .create_log(&token.intake_id, &token.id, AccessAction::View.as_str())
            .await?;
        log_access_event(
            AccessEvent::new(AccessEventType::SummaryViewed, true)
                .with_intake(token.intake_id.clone())
                .with_token(token.id.clone()),
        );

        self.notifications.notify_intake_viewed(&summary.intake).await;
        Ok(summary)
    }

    /// Summary of an intake as a clinician sees it
    pub async fn summary_for(&self, intake_id: &str) -> Result<IntakeSummary, ServiceError> {
        let intake = self.load_intake(intake_id).await?;

        let medications = convert_all(self.intakes.medications_for_intake(intake_id).await?, convert_to_domain_medication)
            .map_err(ServiceError::DataIntegrity)?;
        let verification_flags = convert_all(self.intakes.flags_for_intake(intake_id).await?, convert_to_domain_flag)
            .map_err(ServiceError::DataIntegrity)?;
        let access_logs = self.access_logs(intake_id).await?;

        let adherence_summary = match &intake.patient_id {
            Some(patient_id) => Some(self.adherence.summary_for_patient(patient_id).await?),
            None => None,
        };

        Ok(IntakeSummary {
            intake,
            medications,
            verification_flags,
            access_logs,
            adherence_summary,
        })
    }

    /// Recorded uses of an intake's tokens, newest first
    pub async fn access_logs(&self, intake_id: &str) -> Result<Vec<AccessLog>, ServiceError> {
        let rows = self.access.logs_for_intake(intake_id).await?;
        convert_all(rows, convert_to_domain_access_log).map_err(ServiceError::DataIntegrity)
    }

    async fn load_intake(&self, intake_id: &str) -> Result<Intake, ServiceError> {
        let row = self
            .intakes
            .get_by_id(intake_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Intake {} not found", intake_id)))?;
        convert_to_domain_intake(row).map_err(ServiceError::DataIntegrity)
    }

    fn grant(&self, intake: Intake, token: AccessToken) -> TokenGrant {
        info!("Token {} grants access to intake {} until {}", token.id, intake.id, token.expires_at);
        TokenGrant {
            share_url: self.share_url(&token.token),
            intake,
            token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use medbridge_data::database::DatabasePool;
    use medbridge_data::models::intake::NewIntake;
    use medbridge_data::repository::{
        AccessRepository, AdherenceRepository, IntakeRepository, NotificationRepository, PatientRepository,
    };

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_token_dies_exactly_at_expiry() {
        let policy = TokenPolicy::from_minutes(10);
        let now = fixed_now();
        let token = policy.issue("intake-1", now);

        assert_eq!(token.expires_at, "2024-03-01T09:40:00.000Z");
        assert!(policy.is_usable(&token, now));
        assert!(policy.is_usable(&token, now + Duration::minutes(10) - Duration::milliseconds(1)));
        assert!(!policy.is_usable(&token, now + Duration::minutes(10)));
        assert!(!policy.is_usable(&token, now + Duration::minutes(11)));
    }

    #[test]
    fn test_invalidated_or_unreadable_tokens_are_unusable() {
        let policy = TokenPolicy::from_minutes(10);
        let now = fixed_now();

        let mut invalidated = policy.issue("intake-1", now);
        invalidated.is_invalidated = true;
        assert!(!policy.is_usable(&invalidated, now));

        let mut garbled = policy.issue("intake-1", now);
        garbled.expires_at = "tomorrow".to_string();
        assert!(!policy.is_usable(&garbled, now));
    }

    #[test]
    fn test_issued_tokens_are_distinct() {
        let policy = TokenPolicy::from_minutes(10);
        let a = policy.issue("intake-1", fixed_now());
        let b = policy.issue("intake-1", fixed_now());
        assert_ne!(a.token, b.token);
        assert_ne!(a.id, b.id);
    }

    struct Fixture {
        service: AccessService,
        intakes: Arc<IntakeRepository>,
        access: Arc<AccessRepository>,
    }

    fn fixture() -> Fixture {
        let pool = DatabasePool::in_memory().unwrap();
        let patients = Arc::new(PatientRepository::new(pool.clone()));
        let intakes = Arc::new(IntakeRepository::new(pool.clone()));
        let access = Arc::new(AccessRepository::new(pool.clone()));
        let service = AccessService::new(
            intakes.clone(),
            access.clone(),
            AdherenceService::new(patients.clone(), Arc::new(AdherenceRepository::new(pool.clone()))),
            NotificationService::new(patients, Arc::new(NotificationRepository::new(pool))),
            TokenPolicy::from_minutes(10),
            "https://medbridge.test".to_string(),
        );
        Fixture {
            service,
            intakes,
            access,
        }
    }

    async fn stored_intake(fixture: &Fixture) -> String {
        fixture
            .intakes
            .create(NewIntake {
                hospital_id: "hospital-1".to_string(),
                hospital_name: "Harbor Clinic".to_string(),
                chief_complaint: "fever".to_string(),
                onset_date: "2024-03-01".to_string(),
                course_status: "stable".to_string(),
                adherence: "yes".to_string(),
                ..Default::default()
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_active_token_is_reused() {
        let fixture = fixture();
        let intake_id = stored_intake(&fixture).await;

        let first = fixture.service.get_or_issue_token(&intake_id).await.unwrap();
        let second = fixture.service.get_or_issue_token(&intake_id).await.unwrap();
        assert_eq!(first.token.id, second.token.id);
        assert_eq!(first.share_url, format!("https://medbridge.test/view/{}", first.token.token));
    }

    #[tokio::test]
    async fn test_regenerate_invalidates_previous_token() {
        let fixture = fixture();
        let intake_id = stored_intake(&fixture).await;

        let old = fixture.service.get_or_issue_token(&intake_id).await.unwrap();
        let new = fixture.service.regenerate_token(&intake_id).await.unwrap();
        assert_ne!(old.token.token, new.token.token);

        let err = fixture.service.view_summary(&old.token.token).await.unwrap_err();
        assert!(matches!(err, ServiceError::Gone(_)));
        assert!(fixture.service.view_summary(&new.token.token).await.is_ok());

        let current = fixture.service.get_or_issue_token(&intake_id).await.unwrap();
        assert_eq!(current.token.id, new.token.id);
    }

    #[tokio::test]
    async fn test_view_records_access_log() {
        let fixture = fixture();
        let intake_id = stored_intake(&fixture).await;
        let grant = fixture.service.get_or_issue_token(&intake_id).await.unwrap();

        let first = fixture.service.view_summary(&grant.token.token).await.unwrap();
        assert!(first.access_logs.is_empty());
        assert!(first.adherence_summary.is_none());

        let second = fixture.service.view_summary(&grant.token.token).await.unwrap();
        assert_eq!(second.access_logs.len(), 1);
        assert_eq!(second.access_logs[0].action, AccessAction::View);
        assert_eq!(second.access_logs[0].token_id, grant.token.id);

        assert_eq!(fixture.service.access_logs(&intake_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_expired_and_unknown_tokens_are_gone() {
        let fixture = fixture();
        let intake_id = stored_intake(&fixture).await;

        let expired = TokenPolicy::from_minutes(10).issue(&intake_id, Utc::now() - Duration::minutes(11));
        let expired = fixture.access.create_token(expired).await.unwrap();

        assert!(matches!(
            fixture.service.view_summary(&expired.token).await,
            Err(ServiceError::Gone(_))
        ));
        assert!(matches!(
            fixture.service.view_summary("no-such-token").await,
            Err(ServiceError::Gone(_))
        ));

        let fresh = fixture.service.get_or_issue_token(&intake_id).await.unwrap();
        assert_ne!(fresh.token.id, expired.id);
    }

    #[tokio::test]
    async fn test_unknown_intake_is_not_found() {
        let fixture = fixture();
        assert!(matches!(
            fixture.service.get_or_issue_token("missing").await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            fixture.service.regenerate_token("missing").await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
