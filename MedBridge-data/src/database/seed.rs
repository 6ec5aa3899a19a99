//! Reference data inserted on first start

use tracing::info;
use uuid::Uuid;

use super::connection::{DatabaseError, DatabasePool};

/// Sample institutions offered in the intake form
const SAMPLE_HOSPITALS: &[(&str, &str, &str)] = &[
    ("서울대학교병원", "서울특별시 종로구 대학로 101", "대학병원"),
    ("세브란스병원", "서울특별시 서대문구 연세로 50-1", "대학병원"),
    ("삼성서울병원", "서울특별시 강남구 일원로 81", "대학병원"),
    ("아산병원", "서울특별시 송파구 올림픽로43길 88", "대학병원"),
    ("강남세브란스병원", "서울특별시 강남구 언주로 211", "대학병원"),
    ("중앙내과의원", "서울특별시 중구 명동길 73", "의원"),
    ("행복가정의원", "서울특별시 마포구 월드컵북로 396", "의원"),
    ("건강약국", "서울특별시 강남구 테헤란로 152", "약국"),
    ("온누리약국", "서울특별시 서초구 강남대로 465", "약국"),
    ("경기도의료원 수원병원", "경기도 수원시 장안구 수성로 245", "도립병원"),
];

/// Insert the sample hospitals when the table is empty.
/// Returns the number of rows inserted.
pub fn seed_hospitals(pool: &DatabasePool) -> Result<usize, DatabaseError> {
    let conn = pool.connection()?;

    let existing: i64 = conn.query_row("SELECT COUNT(*) FROM hospitals", [], |row| row.get(0))?;
    if existing > 0 {
        return Ok(0);
    }

    for (name, address, hospital_type) in SAMPLE_HOSPITALS {
        conn.execute(
            "INSERT INTO hospitals (id, name, address, type) VALUES (?1, ?2, ?3, ?4)",
            (Uuid::new_v4().to_string(), name, address, hospital_type),
        )?;
    }

    info!("Seeded {} hospitals", SAMPLE_HOSPITALS.len());
    Ok(SAMPLE_HOSPITALS.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_runs_once() {
        let pool = DatabasePool::in_memory().unwrap();
        // in_memory() already seeded
        assert_eq!(seed_hospitals(&pool).unwrap(), 0);

        let conn = pool.connection().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM hospitals", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count as usize, SAMPLE_HOSPITALS.len());
    }
}
