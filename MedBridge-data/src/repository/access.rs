use async_trait::async_trait;
use rusqlite::{OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use super::errors::RepositoryError;
use crate::database::DatabasePool;
use crate::models::access::{AccessLog, AccessToken};
use crate::models::timestamp_now;

/// Repository trait for share tokens and their access log
#[async_trait]
pub trait AccessRepositoryTrait: Send + Sync {
    /// Persist a token
    async fn create_token(&self, token: AccessToken) -> Result<AccessToken, RepositoryError>;

    /// Every token issued for an intake, newest first
    async fn tokens_for_intake(&self, intake_id: &str) -> Result<Vec<AccessToken>, RepositoryError>;

    /// Look a token up by its value regardless of state
    async fn find_by_token(&self, token: &str) -> Result<Option<AccessToken>, RepositoryError>;

    /// Invalidate every live token of an intake. Returns how many were invalidated.
    async fn invalidate_for_intake(&self, intake_id: &str) -> Result<usize, RepositoryError>;

    /// Append an access-log entry
    async fn create_log(&self, intake_id: &str, token_id: &str, action: &str) -> Result<AccessLog, RepositoryError>;

    /// Access log of an intake, newest first
    async fn logs_for_intake(&self, intake_id: &str) -> Result<Vec<AccessLog>, RepositoryError>;
}

/// SQLite-backed access repository
#[derive(Debug, Clone)]
pub struct AccessRepository {
    pool: DatabasePool,
}

impl AccessRepository {
    /// Create a new repository
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

const TOKEN_COLUMNS: &str = "id, intake_id, token, created_at, expires_at, is_invalidated";

fn map_token(row: &Row<'_>) -> rusqlite::Result<AccessToken> {
    Ok(AccessToken {
        id: row.get(0)?,
        intake_id: row.get(1)?,
        token: row.get(2)?,
        created_at: row.get(3)?,
        expires_at: row.get(4)?,
        is_invalidated: row.get(5)?,
    })
}

fn map_log(row: &Row<'_>) -> rusqlite::Result<AccessLog> {
    Ok(AccessLog {
        id: row.get(0)?,
        intake_id: row.get(1)?,
        token_id: row.get(2)?,
        accessed_at: row.get(3)?,
        action: row.get(4)?,
    })
}

#[async_trait]
impl AccessRepositoryTrait for AccessRepository {
    async fn create_token(&self, token: AccessToken) -> Result<AccessToken, RepositoryError> {
        debug!("Storing access token {} for intake {}", token.id, token.intake_id);
        let conn = self.pool.connection()?;
        conn.execute(
            &format!("INSERT INTO access_tokens ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)", TOKEN_COLUMNS),
            (
                &token.id,
                &token.intake_id,
                &token.token,
                &token.created_at,
                &token.expires_at,
                token.is_invalidated,
            ),
        )?;
        Ok(token)
    }

    async fn tokens_for_intake(&self, intake_id: &str) -> Result<Vec<AccessToken>, RepositoryError> {
        let conn = self.pool.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM access_tokens WHERE intake_id = ?1 ORDER BY created_at DESC, rowid DESC",
            TOKEN_COLUMNS
        ))?;
        let rows = stmt.query_map([intake_id], map_token)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<AccessToken>, RepositoryError> {
        let conn = self.pool.connection()?;
        let found = conn
            .query_row(
                &format!("SELECT {} FROM access_tokens WHERE token = ?1", TOKEN_COLUMNS),
                [token],
                map_token,
            )
            .optional()?;
        Ok(found)
    }

    async fn invalidate_for_intake(&self, intake_id: &str) -> Result<usize, RepositoryError> {
        let conn = self.pool.connection()?;
        let updated = conn.execute(
            "UPDATE access_tokens SET is_invalidated = 1 WHERE intake_id = ?1 AND is_invalidated = 0",
            [intake_id],
        )?;
        Ok(updated)
    }

    async fn create_log(&self, intake_id: &str, token_id: &str, action: &str) -> Result<AccessLog, RepositoryError> {
        let log = AccessLog {
            id: Uuid::new_v4().to_string(),
            intake_id: intake_id.to_string(),
            token_id: token_id.to_string(),
            accessed_at: timestamp_now(),
            action: action.to_string(),
        };

        let conn = self.pool.connection()?;
        conn.execute(
            "INSERT INTO access_logs (id, intake_id, token_id, accessed_at, action) VALUES (?1, ?2, ?3, ?4, ?5)",
            (&log.id, &log.intake_id, &log.token_id, &log.accessed_at, &log.action),
        )?;
        Ok(log)
    }

    async fn logs_for_intake(&self, intake_id: &str) -> Result<Vec<AccessLog>, RepositoryError> {
        let conn = self.pool.connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, intake_id, token_id, accessed_at, action FROM access_logs \
             WHERE intake_id = ?1 ORDER BY accessed_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map([intake_id], map_log)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
