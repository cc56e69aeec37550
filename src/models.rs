use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::error::DataError;

pub const NEEDS_FOLLOW_UP: &str = "Needs Follow-Up";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScholarStatus {
    Active,
    LeaveOfAbsence,
    Alumni,
    Withdrawn,
    Deferred,
}

impl ScholarStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScholarStatus::Active => "Active",
            ScholarStatus::LeaveOfAbsence => "Leave of Absence",
            ScholarStatus::Alumni => "Alumni",
            ScholarStatus::Withdrawn => "Withdrawn",
            ScholarStatus::Deferred => "Deferred",
        }
    }
}

impl fmt::Display for ScholarStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScholarStatus {
    type Err = DataError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "Active" => Ok(ScholarStatus::Active),
            "Leave of Absence" => Ok(ScholarStatus::LeaveOfAbsence),
            "Alumni" => Ok(ScholarStatus::Alumni),
            "Withdrawn" => Ok(ScholarStatus::Withdrawn),
            "Deferred" => Ok(ScholarStatus::Deferred),
            other => Err(DataError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = DataError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "Low" => Ok(RiskLevel::Low),
            "Medium" => Ok(RiskLevel::Medium),
            "High" => Ok(RiskLevel::High),
            other => Err(DataError::UnknownRiskLevel(other.to_string())),
        }
    }
}

/// One scholar's state as captured in a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ScholarRecord {
    pub scholar_id: String,
    pub full_name: String,
    pub program: String,
    pub status: ScholarStatus,
    pub touchpoint_status: String,
    pub last_touchpoint: Option<NaiveDate>,
    pub risk_level: RiskLevel,
    pub engagement_score: i32,
}

impl ScholarRecord {
    pub fn needs_follow_up(&self) -> bool {
        self.touchpoint_status == NEEDS_FOLLOW_UP
    }

    /// Never contacted, or last contacted on or before `stale_date`.
    pub fn is_stale(&self, stale_date: NaiveDate) -> bool {
        match self.last_touchpoint {
            Some(date) => date <= stale_date,
            None => true,
        }
    }
}

/// A scholar about to be captured into an existing snapshot. The program
/// comes from the snapshot itself.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMember {
    pub scholar_id: String,
    pub full_name: String,
    pub status: ScholarStatus,
    pub touchpoint_status: String,
    pub last_touchpoint: Option<NaiveDate>,
    pub risk_level: RiskLevel,
    pub engagement_score: i32,
}

impl From<&ScholarRecord> for NewMember {
    fn from(record: &ScholarRecord) -> Self {
        Self {
            scholar_id: record.scholar_id.clone(),
            full_name: record.full_name.clone(),
            status: record.status,
            touchpoint_status: record.touchpoint_status.clone(),
            last_touchpoint: record.last_touchpoint,
            risk_level: record.risk_level,
            engagement_score: record.engagement_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotMeta {
    pub id: Uuid,
    pub snapshot_date: NaiveDate,
    pub program: String,
    pub source: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewSnapshot {
    pub snapshot_date: NaiveDate,
    pub program: String,
    pub source: String,
    pub notes: Option<String>,
}

/// A member row joined with the snapshot that owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRow {
    pub meta: SnapshotMeta,
    pub record: ScholarRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgramSummary {
    pub snapshot_date: NaiveDate,
    pub program: String,
    pub total_members: usize,
    pub active_members: usize,
    pub needs_followup_members: usize,
    pub high_risk: usize,
    pub medium_risk: usize,
    pub low_risk: usize,
    pub avg_engagement_score: Option<f64>,
    pub stale_touchpoints: usize,
    pub pct_needs_followup: String,
    pub pct_high_risk: String,
}
