//! Domain layer health check functionality

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::database::DatabasePool;
use crate::extraction::MedicationExtractor;

/// System health status
#[derive(Debug, Clone, PartialEq)]
pub enum SystemStatus {
    /// All components are healthy
    Healthy,
    /// Some components are degraded but the system is functional
    Degraded,
    /// System is not functioning properly
    Unhealthy,
}

/// Component health status
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Represents a health component with status and optional details
#[derive(Debug, Clone)]
pub struct HealthComponent {
    pub status: ComponentStatus,
    pub details: Option<String>,
}

/// Represents the overall health of the system
#[derive(Debug, Clone)]
pub struct SystemHealth {
    pub status: SystemStatus,
    /// Map of component names to their health status
    pub components: HashMap<String, HealthComponent>,
}

impl SystemHealth {
    /// Overall status is the worst component status
    pub fn from_components(components: HashMap<String, HealthComponent>) -> Self {
        let status = if components.values().any(|c| c.status == ComponentStatus::Unhealthy) {
            SystemStatus::Unhealthy
        } else if components.values().any(|c| c.status == ComponentStatus::Degraded) {
            SystemStatus::Degraded
        } else {
            SystemStatus::Healthy
        };
        Self { status, components }
    }
}

/// Trait for health services
#[async_trait]
pub trait HealthServiceTrait: Send + Sync + fmt::Debug {
    /// Get the overall system health
    async fn get_system_health(&self) -> SystemHealth;

    /// Check the status of the database.
    /// Returns an error if the database cannot be reached at all.
    async fn check_database_status(&self) -> Result<bool, String>;
}

/// Health checks over the database pool and the extraction client
#[derive(Clone)]
pub struct HealthService {
    pool: DatabasePool,
    extractor: Arc<dyn MedicationExtractor>,
}

impl fmt::Debug for HealthService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthService")
            .field("pool", &self.pool.describe())
            .field("extractor_configured", &self.extractor.is_configured())
            .finish()
    }
}

impl HealthService {
    pub fn new(pool: DatabasePool, extractor: Arc<dyn MedicationExtractor>) -> Self {
        Self { pool, extractor }
    }

    fn extractor_component(&self) -> HealthComponent {
        if self.extractor.is_configured() {
            HealthComponent {
                status: ComponentStatus::Healthy,
                details: None,
            }
        } else {
            HealthComponent {
                status: ComponentStatus::Degraded,
                details: Some("No API key configured; documents are stored without extraction".to_string()),
            }
        }
    }
}

#[async_trait]
impl HealthServiceTrait for HealthService {
    async fn get_system_health(&self) -> SystemHealth {
        let database = match self.check_database_status().await {
            Ok(true) => HealthComponent {
                status: ComponentStatus::Healthy,
                details: Some(self.pool.describe()),
            },
            Ok(false) => HealthComponent {
                status: ComponentStatus::Degraded,
                details: Some("Database answered unexpectedly".to_string()),
            },
            Err(e) => {
                warn!("Database health check failed: {}", e);
                HealthComponent {
                    status: ComponentStatus::Unhealthy,
                    details: Some(e),
                }
            }
        };

        SystemHealth::from_components(
            vec![
                ("database".to_string(), database),
                ("extractor".to_string(), self.extractor_component()),
            ]
            .into_iter()
            .collect(),
        )
    }

    async fn check_database_status(&self) -> Result<bool, String> {
        let conn = self
            .pool
            .connection()
            .map_err(|e| format!("Database connection error: {}", e))?;
        let one: i64 = conn
            .query_row("SELECT 1", [], |row| row.get(0))
            .map_err(|e| format!("Database query error: {}", e))?;
        Ok(one == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedExtractor;

    #[tokio::test]
    async fn test_configured_system_is_healthy() {
        let pool = DatabasePool::in_memory().unwrap();
        let service = HealthService::new(pool, Arc::new(ScriptedExtractor::new()));

        let health = service.get_system_health().await;
        assert_eq!(health.status, SystemStatus::Healthy);
        assert!(health.components.contains_key("database"));
        assert!(health.components.contains_key("extractor"));
    }

    #[tokio::test]
    async fn test_missing_extractor_key_degrades() {
        let pool = DatabasePool::in_memory().unwrap();
        let service = HealthService::new(pool, Arc::new(ScriptedExtractor::new().unconfigured()));

        let health = service.get_system_health().await;
        assert_eq!(health.status, SystemStatus::Degraded);
        assert_eq!(health.components["extractor"].status, ComponentStatus::Degraded);
    }

    #[test]
    fn test_worst_component_wins() {
        let component = |status| HealthComponent { status, details: None };
        let health = SystemHealth::from_components(
            vec![
                ("a".to_string(), component(ComponentStatus::Degraded)),
                ("b".to_string(), component(ComponentStatus::Unhealthy)),
            ]
            .into_iter()
            .collect(),
        );
        assert_eq!(health.status, SystemStatus::Unhealthy);
    }
}
