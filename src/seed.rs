use anyhow::Context;
use chrono::NaiveDate;

use crate::models::{NewSnapshot, RiskLevel, ScholarRecord, ScholarStatus};

pub const SEED_PROGRAM: &str = "Foundations";

pub fn seed_snapshot() -> anyhow::Result<NewSnapshot> {
    Ok(NewSnapshot {
        snapshot_date: seed_date()?,
        program: SEED_PROGRAM.to_string(),
        source: "seed".to_string(),
        notes: Some("February cohort health check-in".to_string()),
    })
}

pub fn seed_date() -> anyhow::Result<NaiveDate> {
    date(2026, 2, 8)
}

/// Ten scholars in the Foundations program as of 2026-02-08.
pub fn foundations_roster() -> anyhow::Result<Vec<ScholarRecord>> {
    use RiskLevel::{High, Low, Medium};
    use ScholarStatus::{Active, Alumni, LeaveOfAbsence};

    let rows = [
        ("GS-1001", "Amara Okafor", Active, "On Track", Some(date(2026, 2, 5)?), Low, 88),
        ("GS-1002", "Ben Castillo", Active, "Needs Follow-Up", Some(date(2026, 1, 20)?), High, 42),
        ("GS-1003", "Chloe Nguyen", Active, "On Track", Some(date(2026, 2, 1)?), Low, 91),
        ("GS-1004", "Diego Ramirez", Active, "Needs Follow-Up", None, Medium, 55),
        ("GS-1005", "Esther Mensah", LeaveOfAbsence, "Paused", Some(date(2026, 1, 10)?), Medium, 60),
        ("GS-1006", "Farah Haddad", Active, "Escalated", Some(date(2026, 2, 3)?), High, 35),
        ("GS-1007", "Gabriel Silva", Active, "On Track", Some(date(2026, 1, 25)?), Low, 79),
        ("GS-1008", "Hana Suzuki", Alumni, "Completed", Some(date(2026, 1, 30)?), Low, 95),
        ("GS-1009", "Isaac Brooks", Active, "Needs Follow-Up", Some(date(2026, 2, 6)?), Medium, 63),
        ("GS-1010", "Jamal Wright", Active, "On Track", Some(date(2026, 2, 7)?), Low, 84),
    ];

    Ok(rows
        .into_iter()
        .map(
            |(scholar_id, full_name, status, touchpoint, last_touchpoint, risk_level, score)| {
                ScholarRecord {
                    scholar_id: scholar_id.to_string(),
                    full_name: full_name.to_string(),
                    program: SEED_PROGRAM.to_string(),
                    status,
                    touchpoint_status: touchpoint.to_string(),
                    last_touchpoint,
                    risk_level,
                    engagement_score: score,
                }
            },
        )
        .collect())
}

fn date(year: i32, month: u32, day: u32) -> anyhow::Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
        .with_context(|| format!("invalid seed date {year}-{month}-{day}"))
}
