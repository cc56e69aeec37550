use chrono::NaiveDate;
use thiserror::Error;

/// Data-quality failures raised while parsing or aggregating snapshot data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataError {
    #[error("invalid date {0:?}: expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("unknown scholar status {0:?}")]
    UnknownStatus(String),

    #[error("unknown risk level {0:?}")]
    UnknownRiskLevel(String),

    #[error("scholar {scholar_id} appears more than once in program {program}")]
    DuplicateScholar { program: String, scholar_id: String },

    #[error("records span multiple snapshot dates ({expected} and {found})")]
    MixedSnapshotDates { expected: NaiveDate, found: NaiveDate },

    #[error("stale window of {stale_days} days before {snapshot_date} is out of range")]
    StaleWindowOutOfRange {
        snapshot_date: NaiveDate,
        stale_days: u32,
    },
}
