// Schema creation. Tables are created idempotently at start-up.
mod sqlite;
pub use sqlite::run_migrations as run_sqlite_migrations;
