use std::sync::Arc;

use tracing::{debug, instrument};

use medbridge_data::repository::HospitalRepositoryTrait;

use super::ServiceError;
use crate::entities::Hospital;

/// Hospital directory
#[derive(Clone)]
pub struct HospitalService {
    repository: Arc<dyn HospitalRepositoryTrait>,
}

impl HospitalService {
    pub fn new(repository: Arc<dyn HospitalRepositoryTrait>) -> Self {
        Self { repository }
    }

    /// List hospitals, optionally filtered by a case-insensitive match on
    /// name or address
    #[instrument(skip(self))]
    pub async fn list(&self, query: Option<&str>) -> Result<Vec<Hospital>, ServiceError> {
        let hospitals = self.repository.list().await?;

        let needle = match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => q.to_lowercase(),
            None => return Ok(hospitals),
        };

        let matches: Vec<Hospital> = hospitals
            .into_iter()
            .filter(|h| {
                h.name.to_lowercase().contains(&needle)
                    || h.address
                        .as_deref()
                        .map(|a| a.to_lowercase().contains(&needle))
                        .unwrap_or(false)
            })
            .collect();

        debug!("{} hospitals match '{}'", matches.len(), needle);
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medbridge_data::database::DatabasePool;
    use medbridge_data::repository::HospitalRepository;

    fn service() -> HospitalService {
        let pool = DatabasePool::in_memory().unwrap();
        HospitalService::new(Arc::new(HospitalRepository::new(pool)))
    }

    #[tokio::test]
    async fn test_list_without_query_returns_seeded_hospitals() {
        let hospitals = service().list(None).await.unwrap();
        assert_eq!(hospitals.len(), 10);

        let blank = service().list(Some("   ")).await.unwrap();
        assert_eq!(blank.len(), 10);
    }

    #[tokio::test]
    async fn test_query_matches_name_or_address() {
        let service = service();

        let by_name = service.list(Some("약국")).await.unwrap();
        assert_eq!(by_name.len(), 2);

        let by_address = service.list(Some("수원시")).await.unwrap();
        assert_eq!(by_address.len(), 1);
        assert_eq!(by_address[0].name, "경기도의료원 수원병원");

        assert!(service.list(Some("nowhere")).await.unwrap().is_empty());
    }

    #[test]
    fn test_query_matches_district() {
        let service = service();
        let gangnam = tokio_test::block_on(service.list(Some("서울특별시 강남구"))).unwrap();
        assert_eq!(gangnam.len(), 3);
    }
}
