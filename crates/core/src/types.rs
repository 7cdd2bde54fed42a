/// All entity primary keys are sequential 64-bit ids allocated by the stores.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
