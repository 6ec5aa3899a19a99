use rusqlite::Connection;
use tracing::info;

const TABLES: &[(&str, &str)] = &[
    (
        "hospitals",
        "CREATE TABLE IF NOT EXISTS hospitals (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            address TEXT,
            type TEXT NOT NULL
        )",
    ),
    (
        "patients",
        "CREATE TABLE IF NOT EXISTS patients (
            id TEXT PRIMARY KEY,
            device_id TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        )",
    ),
    (
        "intakes",
        "CREATE TABLE IF NOT EXISTS intakes (
            id TEXT PRIMARY KEY,
            patient_id TEXT,
            hospital_id TEXT NOT NULL,
            hospital_name TEXT NOT NULL,
            created_at TEXT NOT NULL,
            chief_complaint TEXT NOT NULL,
            chief_complaint_detail TEXT,
            onset_date TEXT NOT NULL,
            course_status TEXT NOT NULL,
            course_detail TEXT,
            adherence TEXT NOT NULL,
            adherence_reason TEXT,
            has_adverse_events INTEGER NOT NULL DEFAULT 0,
            adverse_events_detail TEXT,
            has_allergies INTEGER NOT NULL DEFAULT 0,
            allergies_detail TEXT,
            doctor_note TEXT,
            is_deleted INTEGER NOT NULL DEFAULT 0
        )",
    ),
    (
        "medications",
        "CREATE TABLE IF NOT EXISTS medications (
            id TEXT PRIMARY KEY,
            intake_id TEXT NOT NULL,
            medication_name TEXT NOT NULL,
            dose TEXT,
            frequency TEXT,
            duration TEXT,
            prescription_date TEXT,
            dispensing_date TEXT,
            confidence INTEGER NOT NULL DEFAULT 80,
            needs_verification INTEGER NOT NULL DEFAULT 0,
            raw_ocr_text TEXT,
            source_type TEXT NOT NULL
        )",
    ),
    (
        "verification_flags",
        "CREATE TABLE IF NOT EXISTS verification_flags (
            id TEXT PRIMARY KEY,
            intake_id TEXT NOT NULL,
            flag_type TEXT NOT NULL,
            description TEXT NOT NULL,
            related_medication_ids TEXT
        )",
    ),
    (
        "access_tokens",
        "CREATE TABLE IF NOT EXISTS access_tokens (
            id TEXT PRIMARY KEY,
            intake_id TEXT NOT NULL,
            token TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            is_invalidated INTEGER NOT NULL DEFAULT 0
        )",
    ),
    (
        "access_logs",
        "CREATE TABLE IF NOT EXISTS access_logs (
            id TEXT PRIMARY KEY,
            intake_id TEXT NOT NULL,
            token_id TEXT NOT NULL,
            accessed_at TEXT NOT NULL,
            action TEXT NOT NULL
        )",
    ),
    (
        "prescriptions",
        "CREATE TABLE IF NOT EXISTS prescriptions (
            id TEXT PRIMARY KEY,
            patient_id TEXT NOT NULL,
            intake_id TEXT,
            hospital_name TEXT,
            chief_complaint TEXT,
            prescription_date TEXT,
            patient_condition TEXT,
            created_at TEXT NOT NULL
        )",
    ),
    (
        "prescription_medications",
        "CREATE TABLE IF NOT EXISTS prescription_medications (
            id TEXT PRIMARY KEY,
            prescription_id TEXT NOT NULL,
            medication_name TEXT NOT NULL,
            dose TEXT,
            frequency TEXT,
            duration TEXT,
            ingredients TEXT,
            indication TEXT,
            doses_per_day INTEGER,
            total_doses INTEGER,
            confidence INTEGER NOT NULL DEFAULT 80
        )",
    ),
    (
        "notifications",
        "CREATE TABLE IF NOT EXISTS notifications (
            id TEXT PRIMARY KEY,
            patient_id TEXT NOT NULL,
            type TEXT NOT NULL,
            title TEXT NOT NULL,
            message TEXT NOT NULL,
            related_intake_id TEXT,
            is_read INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )",
    ),
    (
        "notification_settings",
        "CREATE TABLE IF NOT EXISTS notification_settings (
            patient_id TEXT PRIMARY KEY,
            intake_viewed_enabled INTEGER NOT NULL DEFAULT 1,
            medication_reminder_enabled INTEGER NOT NULL DEFAULT 1,
            follow_up_enabled INTEGER NOT NULL DEFAULT 1,
            updated_at TEXT NOT NULL
        )",
    ),
    (
        "adherence_logs",
        "CREATE TABLE IF NOT EXISTS adherence_logs (
            id TEXT PRIMARY KEY,
            patient_id TEXT NOT NULL,
            medication_id TEXT NOT NULL,
            scheduled_time TEXT NOT NULL,
            taken_at TEXT,
            status TEXT NOT NULL,
            notes TEXT,
            created_at TEXT NOT NULL
        )",
    ),
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_intakes_created_at ON intakes (created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_intakes_patient ON intakes (patient_id)",
    "CREATE INDEX IF NOT EXISTS idx_medications_intake ON medications (intake_id)",
    "CREATE INDEX IF NOT EXISTS idx_verification_flags_intake ON verification_flags (intake_id)",
    "CREATE INDEX IF NOT EXISTS idx_access_tokens_intake ON access_tokens (intake_id)",
    "CREATE INDEX IF NOT EXISTS idx_access_logs_intake ON access_logs (intake_id, accessed_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_prescriptions_patient ON prescriptions (patient_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_prescription_medications_prescription ON prescription_medications (prescription_id)",
    "CREATE INDEX IF NOT EXISTS idx_notifications_patient ON notifications (patient_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_adherence_logs_patient ON adherence_logs (patient_id, scheduled_time DESC)",
];

/// Run SQLite migrations
pub fn run_migrations(conn: &Connection) -> Result<(), String> {
    info!("Running SQLite migrations");

    for (name, ddl) in TABLES {
        info!("Creating {} table if not exists", name);
        conn.execute(ddl, [])
            .map_err(|e| format!("Failed to create table {}: {}", name, e))?;
    }

    for ddl in INDEXES {
        conn.execute(ddl, [])
            .map_err(|e| format!("Failed to create index: {}", e))?;
    }

    info!("SQLite migrations completed successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count as usize, TABLES.len());
    }
}
