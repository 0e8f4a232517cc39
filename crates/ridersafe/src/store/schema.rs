//! `SQLite` schema definitions for ridersafe.

/// Account profiles, one per user.
pub const CREATE_PROFILES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS profiles (
    id TEXT PRIMARY KEY,
    full_name TEXT NOT NULL,
    email TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'user',
    serial_number TEXT,
    is_crashed INTEGER NOT NULL DEFAULT 0,
    lat REAL,
    lon REAL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// Medical records, keyed by the owning user.
pub const CREATE_MEDICAL_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS medical_profiles (
    user_id TEXT PRIMARY KEY REFERENCES profiles(id),
    blood_type TEXT NOT NULL,
    organ_donor INTEGER NOT NULL DEFAULT 0,
    allergies TEXT NOT NULL,
    chronic_conditions TEXT NOT NULL,
    current_medications TEXT NOT NULL,
    contact_1_name TEXT NOT NULL DEFAULT '',
    contact_1_phone TEXT NOT NULL DEFAULT '',
    contact_2_name TEXT NOT NULL DEFAULT '',
    contact_2_phone TEXT NOT NULL DEFAULT '',
    contact_3_name TEXT NOT NULL DEFAULT '',
    contact_3_phone TEXT NOT NULL DEFAULT '',
    updated_at TEXT NOT NULL
)
";

/// Black-box records written when an alert is sent.
pub const CREATE_INCIDENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS incident_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    rider_name TEXT NOT NULL,
    final_velocity TEXT NOT NULL,
    final_elevation TEXT NOT NULL,
    timestamp TEXT NOT NULL
)
";

/// Status page lookups go by serial.
pub const CREATE_SERIAL_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_profiles_serial ON profiles(serial_number)
";

/// Latest-incident lookups per rider.
pub const CREATE_INCIDENT_USER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_incidents_user ON incident_logs(user_id, timestamp DESC)
";

/// Key-value table holding the schema version.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_PROFILES_TABLE,
    CREATE_MEDICAL_TABLE,
    CREATE_INCIDENTS_TABLE,
    CREATE_SERIAL_INDEX,
    CREATE_INCIDENT_USER_INDEX,
    CREATE_METADATA_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert_eq!(SCHEMA_STATEMENTS.len(), 6);
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.trim().is_empty());
        }
    }

    #[test]
    fn test_medical_table_has_three_contacts() {
        for i in 1..=3 {
            assert!(CREATE_MEDICAL_TABLE.contains(&format!("contact_{i}_name")));
            assert!(CREATE_MEDICAL_TABLE.contains(&format!("contact_{i}_phone")));
        }
    }
}
