//! Database connection module for MedBridge
//!
//! The application keeps a single process-wide SQLite pool. When the database
//! file cannot be opened the pool falls back to an in-memory database so the
//! server still starts.

use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use r2d2_sqlite::SqliteConnectionManager;
use thiserror::Error;
use tracing::{error, info, warn};

use super::migrations::run_sqlite_migrations;
use super::seed::seed_hospitals;

/// Global database pool used throughout the application
static DB_POOL: OnceCell<DatabasePool> = OnceCell::new();

/// Pooled SQLite connection handed out to repositories
pub type SqliteConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Supported database types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    /// SQLite database (file-based)
    Sqlite,
}

impl FromStr for DatabaseType {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(DatabaseType::Sqlite),
            _ => Err(DatabaseError::UnsupportedDatabaseType(s.to_string())),
        }
    }
}

/// Database connection pool
#[derive(Debug, Clone)]
pub enum DatabasePool {
    /// SQLite connection pool
    SQLite(Arc<r2d2::Pool<SqliteConnectionManager>>),
}

/// Database error
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    /// SQLite connection pool error
    #[error("SQLite connection pool error: {0}")]
    SqlitePoolError(#[from] r2d2::Error),

    /// Database pool already initialized
    #[error("Database pool is already initialized")]
    PoolAlreadyInitialized,

    /// Database pool not initialized
    #[error("Database pool is not initialized")]
    PoolNotInitialized,

    /// Unsupported database type
    #[error("Unsupported database type: {0}")]
    UnsupportedDatabaseType(String),

    /// Migration error
    #[error("Database migration error: {0}")]
    MigrationError(String),
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database type
    pub db_type: DatabaseType,
    /// Path to SQLite database file
    pub sqlite_path: Option<String>,
    /// Maximum number of pooled connections
    pub max_connections: u32,
    /// Connection checkout timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: DatabaseType::Sqlite,
            sqlite_path: Some("./data/medbridge.db".to_string()),
            max_connections: 10,
            timeout_seconds: 30,
        }
    }
}

impl DatabaseConfig {
    /// Create a new database configuration from environment variables
    pub fn from_env() -> Result<Self, DatabaseError> {
        let defaults = Self::default();

        let db_type = env::var("DB_TYPE")
            .unwrap_or_else(|_| "sqlite".to_string())
            .parse::<DatabaseType>()?;

        let sqlite_path = env::var("DB_SQLITE_PATH").ok().or(defaults.sqlite_path);

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.max_connections);

        let timeout_seconds = env::var("DB_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(defaults.timeout_seconds);

        info!(
            "Database configuration: max_connections={}, timeout={}s",
            max_connections, timeout_seconds
        );

        Ok(DatabaseConfig {
            db_type,
            sqlite_path,
            max_connections,
            timeout_seconds,
        })
    }
}

impl DatabasePool {
    /// Create a single-connection in-memory pool with the schema applied and
    /// hospitals seeded.
    ///
    /// Every SQLite in-memory connection is its own database, so the pool is
    /// capped at one connection.
    pub fn in_memory() -> Result<Self, DatabaseError> {
        let pool = build_in_memory_pool(&DatabaseConfig::default())?;
        prepare_pool(&pool)?;
        Ok(pool)
    }

    /// Check a connection out of the pool
    pub fn connection(&self) -> Result<SqliteConnection, r2d2::Error> {
        match self {
            DatabasePool::SQLite(pool) => pool.get(),
        }
    }

    /// Human-readable description of the backing database and pool state
    pub fn describe(&self) -> String {
        match self {
            DatabasePool::SQLite(pool) => {
                let location = match pool.get() {
                    Ok(conn) => conn
                        .query_row("PRAGMA database_list", [], |row| row.get::<_, String>(2))
                        .map(|path| {
                            if path.is_empty() || path == ":memory:" {
                                "SQLite in-memory database".to_string()
                            } else {
                                format!("SQLite database at {}", path)
                            }
                        })
                        .unwrap_or_else(|_| "SQLite database (path unknown)".to_string()),
                    Err(e) => return format!("SQLite connection error: {}", e),
                };

                let state = pool.state();
                format!(
                    "{} (connections: active={}, idle={})",
                    location, state.connections, state.idle_connections
                )
            }
        }
    }
}

/// Initialize the process-wide database pool from the environment.
///
/// Runs the schema migrations and seeds reference data before publishing the
/// pool. Returns a handle to the initialized pool.
pub fn initialize_database_pool() -> Result<DatabasePool, DatabaseError> {
    if DB_POOL.get().is_some() {
        return Err(DatabaseError::PoolAlreadyInitialized);
    }

    let config = DatabaseConfig::from_env()?;
    info!("Initializing database pool with type: {:?}", config.db_type);

    let pool = match config.db_type {
        DatabaseType::Sqlite => initialize_sqlite_pool(&config)?,
    };
    prepare_pool(&pool)?;

    DB_POOL
        .set(pool.clone())
        .map_err(|_| DatabaseError::PoolAlreadyInitialized)?;

    Ok(pool)
}

/// Get the database connection pool
pub fn get_db_pool() -> Result<DatabasePool, DatabaseError> {
    DB_POOL.get().cloned().ok_or(DatabaseError::PoolNotInitialized)
}

/// Get information about the current database connection
pub fn get_connection_info() -> Option<String> {
    DB_POOL.get().map(DatabasePool::describe)
}

fn prepare_pool(pool: &DatabasePool) -> Result<(), DatabaseError> {
    info!("Running database migrations");
    {
        let conn = pool.connection()?;
        run_sqlite_migrations(&conn).map_err(DatabaseError::MigrationError)?;
    }
    seed_hospitals(pool)?;
    info!("Database migrations completed successfully");
    Ok(())
}

/// Initialize SQLite connection pool
fn initialize_sqlite_pool(config: &DatabaseConfig) -> Result<DatabasePool, DatabaseError> {
    use rusqlite::OpenFlags;
    use std::fs;
    use std::path::Path;

    let sqlite_path = config
        .sqlite_path
        .clone()
        .unwrap_or_else(|| "data/medbridge.db".to_string());

    info!("Initializing SQLite database at: {}", sqlite_path);

    if let Some(parent) = Path::new(&sqlite_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            info!("Creating parent directory: {:?}", parent);
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("Failed to create directory: {}, falling back to in-memory database", e);
                return build_in_memory_pool(config);
            }
        }
    }

    let manager = SqliteConnectionManager::file(&sqlite_path)
        .with_flags(OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE);

    match r2d2::Pool::builder()
        .max_size(config.max_connections)
        .connection_timeout(Duration::from_secs(config.timeout_seconds))
        .build(manager)
    {
        Ok(pool) => {
            info!("SQLite connection pool created successfully");
            Ok(DatabasePool::SQLite(Arc::new(pool)))
        }
        Err(e) => {
            error!("Failed to create SQLite connection pool: {}", e);
            warn!("Falling back to in-memory SQLite database");
            build_in_memory_pool(config)
        }
    }
}

fn build_in_memory_pool(config: &DatabaseConfig) -> Result<DatabasePool, DatabaseError> {
    info!("Initializing in-memory SQLite database");

    let pool = r2d2::Pool::builder()
        .max_size(1)
        .connection_timeout(Duration::from_secs(config.timeout_seconds))
        .build(SqliteConnectionManager::memory())?;

    Ok(DatabasePool::SQLite(Arc::new(pool)))
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn test_database_config_default() {
        let config = DatabaseConfig::default();
        assert_eq!(config.db_type, DatabaseType::Sqlite);
        assert!(config.sqlite_path.is_some());
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.timeout_seconds, 30);
    }

    #[test]
    fn test_database_type_from_str() {
        assert_eq!("sqlite".parse::<DatabaseType>().unwrap(), DatabaseType::Sqlite);
        assert_eq!("SQLite".parse::<DatabaseType>().unwrap(), DatabaseType::Sqlite);
        assert!("postgres".parse::<DatabaseType>().is_err());
    }

    #[test]
    fn test_in_memory_pool_is_migrated() {
        let pool = DatabasePool::in_memory().unwrap();
        let conn = pool.connection().unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('intakes', 'access_tokens', 'medications')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);
    }

    #[test]
    fn test_describe_in_memory_pool() {
        let pool = DatabasePool::in_memory().unwrap();
        assert!(pool.describe().starts_with("SQLite in-memory database"));
    }
}
