//! Database schema for the on-device key/value store.

/// SQL schema for the key/value table.
pub const SCHEMA: &str = r#"
-- Key/value entries (progress snapshot, discovery journal)
CREATE TABLE IF NOT EXISTS kv_entries (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// Schema version table.
pub const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;

/// Current schema version.
pub const CURRENT_VERSION: i32 = 1;

/// Database file name inside the data directory.
pub const DATABASE_FILE: &str = "fogwalker.db";
