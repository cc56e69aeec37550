use std::collections::{BTreeMap, HashSet};

use chrono::{Days, NaiveDate};

use crate::dates::format_percent;
use crate::error::DataError;
use crate::models::{ProgramSummary, RiskLevel, ScholarRecord, ScholarStatus, SnapshotRow};

/// Summarizes joined snapshot rows, which must all share one snapshot date.
pub fn summarize(
    rows: &[SnapshotRow],
    stale_days: u32,
) -> Result<Vec<ProgramSummary>, DataError> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    let snapshot_date = first.meta.snapshot_date;

    if let Some(other) = rows.iter().find(|row| row.meta.snapshot_date != snapshot_date) {
        return Err(DataError::MixedSnapshotDates {
            expected: snapshot_date,
            found: other.meta.snapshot_date,
        });
    }

    let records: Vec<ScholarRecord> = rows.iter().map(|row| row.record.clone()).collect();
    summarize_records(snapshot_date, &records, stale_days)
}

/// One summary per program present in `records`, ordered by program name.
pub fn summarize_records(
    snapshot_date: NaiveDate,
    records: &[ScholarRecord],
    stale_days: u32,
) -> Result<Vec<ProgramSummary>, DataError> {
    let stale_date = stale_cutoff(snapshot_date, stale_days)?;
    let mut programs: BTreeMap<&str, Vec<&ScholarRecord>> = BTreeMap::new();

    for record in records {
        programs.entry(record.program.as_str()).or_default().push(record);
    }

    programs
        .into_iter()
        .map(|(program, members)| summarize_program(snapshot_date, stale_date, program, &members))
        .collect()
}

pub fn stale_cutoff(snapshot_date: NaiveDate, stale_days: u32) -> Result<NaiveDate, DataError> {
    snapshot_date
        .checked_sub_days(Days::new(u64::from(stale_days)))
        .ok_or(DataError::StaleWindowOutOfRange {
            snapshot_date,
            stale_days,
        })
}

fn summarize_program(
    snapshot_date: NaiveDate,
    stale_date: NaiveDate,
    program: &str,
    members: &[&ScholarRecord],
) -> Result<ProgramSummary, DataError> {
    let mut seen = HashSet::new();
    let mut summary = ProgramSummary {
        snapshot_date,
        program: program.to_string(),
        total_members: members.len(),
        active_members: 0,
        needs_followup_members: 0,
        high_risk: 0,
        medium_risk: 0,
        low_risk: 0,
        avg_engagement_score: None,
        stale_touchpoints: 0,
        pct_needs_followup: String::new(),
        pct_high_risk: String::new(),
    };
    let mut total_score = 0i64;

    for member in members {
        if !seen.insert(member.scholar_id.as_str()) {
            return Err(DataError::DuplicateScholar {
                program: program.to_string(),
                scholar_id: member.scholar_id.clone(),
            });
        }

        if member.status == ScholarStatus::Active {
            summary.active_members += 1;
        }
        if member.needs_follow_up() {
            summary.needs_followup_members += 1;
        }
        match member.risk_level {
            RiskLevel::High => summary.high_risk += 1,
            RiskLevel::Medium => summary.medium_risk += 1,
            RiskLevel::Low => summary.low_risk += 1,
        }
        if member.is_stale(stale_date) {
            summary.stale_touchpoints += 1;
        }
        total_score += i64::from(member.engagement_score);
    }

    let total = summary.total_members as u64;
    if total > 0 {
        summary.avg_engagement_score = Some(total_score as f64 / total as f64);
    }
    summary.pct_needs_followup = format_percent(summary.needs_followup_members as u64, total);
    summary.pct_high_risk = format_percent(summary.high_risk as u64, total);

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::models::SnapshotMeta;
    use crate::seed::{foundations_roster, seed_date};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn record(scholar_id: &str, program: &str, risk_level: RiskLevel) -> ScholarRecord {
        ScholarRecord {
            scholar_id: scholar_id.to_string(),
            full_name: format!("Scholar {scholar_id}"),
            program: program.to_string(),
            status: ScholarStatus::Active,
            touchpoint_status: "On Track".to_string(),
            last_touchpoint: Some(date(2026, 2, 1)),
            risk_level,
            engagement_score: 70,
        }
    }

    fn row(snapshot_date: NaiveDate, record: ScholarRecord) -> SnapshotRow {
        SnapshotRow {
            meta: SnapshotMeta {
                id: Uuid::nil(),
                snapshot_date,
                program: record.program.clone(),
                source: "test".to_string(),
                notes: None,
            },
            record,
        }
    }

    #[test]
    fn foundations_seed_produces_expected_rollup() {
        let roster = foundations_roster().unwrap();
        let summaries = summarize_records(seed_date().unwrap(), &roster, 14).unwrap();
        assert_eq!(summaries.len(), 1);

        let summary = &summaries[0];
        assert_eq!(summary.program, "Foundations");
        assert_eq!(summary.total_members, 10);
        assert_eq!(summary.active_members, 8);
        assert_eq!(summary.needs_followup_members, 3);
        assert_eq!(summary.high_risk, 2);
        assert_eq!(summary.medium_risk, 3);
        assert_eq!(summary.low_risk, 5);
        assert_eq!(summary.stale_touchpoints, 4);
        assert_eq!(summary.pct_high_risk, "20.0");
        assert_eq!(summary.pct_needs_followup, "30.0");
        let avg = summary.avg_engagement_score.unwrap();
        assert!((avg - 69.2).abs() < 1e-9);
    }

    #[test]
    fn programs_come_out_in_lexical_order() {
        let records = vec![
            record("a", "Pathways", RiskLevel::Low),
            record("b", "Bridge", RiskLevel::High),
            record("c", "Pathways", RiskLevel::Medium),
            record("d", "Foundations", RiskLevel::Low),
        ];
        let summaries = summarize_records(date(2026, 2, 8), &records, 14).unwrap();
        let programs: Vec<&str> = summaries.iter().map(|s| s.program.as_str()).collect();
        assert_eq!(programs, ["Bridge", "Foundations", "Pathways"]);
        assert_eq!(summaries[2].total_members, 2);
    }

    #[test]
    fn risk_buckets_cover_every_member() {
        let mut records = foundations_roster().unwrap();
        records.push(record("x", "Bridge", RiskLevel::High));
        records.push(record("y", "Bridge", RiskLevel::Medium));
        let summaries = summarize_records(seed_date().unwrap(), &records, 30).unwrap();
        for summary in summaries {
            assert_eq!(
                summary.low_risk + summary.medium_risk + summary.high_risk,
                summary.total_members
            );
        }
    }

    #[test]
    fn stale_boundary_is_inclusive() {
        let snapshot_date = date(2026, 2, 8);
        let mut on_boundary = record("a", "Foundations", RiskLevel::Low);
        on_boundary.last_touchpoint = Some(date(2026, 1, 25));
        let mut day_after = record("b", "Foundations", RiskLevel::Low);
        day_after.last_touchpoint = Some(date(2026, 1, 26));
        let mut never = record("c", "Foundations", RiskLevel::Low);
        never.last_touchpoint = None;

        let summaries =
            summarize_records(snapshot_date, &[on_boundary, day_after, never], 14).unwrap();
        assert_eq!(summaries[0].stale_touchpoints, 2);
    }

    #[test]
    fn zero_day_window_counts_same_day_touchpoints() {
        let mut same_day = record("a", "Foundations", RiskLevel::Low);
        same_day.last_touchpoint = Some(date(2026, 2, 8));
        let summaries = summarize_records(date(2026, 2, 8), &[same_day], 0).unwrap();
        assert_eq!(summaries[0].stale_touchpoints, 1);
    }

    #[test]
    fn aggregation_is_repeatable() {
        let snapshot_date = seed_date().unwrap();
        let rows: Vec<SnapshotRow> = foundations_roster()
            .unwrap()
            .into_iter()
            .map(|r| row(snapshot_date, r))
            .collect();
        let first = summarize(&rows, 14).unwrap();
        let second = summarize(&rows, 14).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_input_yields_no_summaries() {
        assert!(summarize(&[], 14).unwrap().is_empty());
        assert!(summarize_records(date(2026, 2, 8), &[], 14).unwrap().is_empty());
    }

    #[test]
    fn rejects_rows_from_different_dates() {
        let rows = vec![
            row(date(2026, 2, 8), record("a", "Foundations", RiskLevel::Low)),
            row(date(2026, 2, 9), record("b", "Foundations", RiskLevel::Low)),
        ];
        assert_eq!(
            summarize(&rows, 14),
            Err(DataError::MixedSnapshotDates {
                expected: date(2026, 2, 8),
                found: date(2026, 2, 9),
            })
        );
    }

    #[test]
    fn rejects_duplicate_scholar_within_program() {
        let records = vec![
            record("GS-1", "Foundations", RiskLevel::Low),
            record("GS-1", "Foundations", RiskLevel::High),
        ];
        let err = summarize_records(date(2026, 2, 8), &records, 14).unwrap_err();
        assert!(matches!(err, DataError::DuplicateScholar { .. }));
    }

    #[test]
    fn same_scholar_in_two_programs_is_allowed() {
        let records = vec![
            record("GS-1", "Foundations", RiskLevel::Low),
            record("GS-1", "Bridge", RiskLevel::Low),
        ];
        assert_eq!(summarize_records(date(2026, 2, 8), &records, 14).unwrap().len(), 2);
    }

    #[test]
    fn stale_cutoff_uses_calendar_days() {
        assert_eq!(stale_cutoff(date(2026, 3, 1), 1).unwrap(), date(2026, 2, 28));
        assert_eq!(stale_cutoff(date(2026, 2, 8), 14).unwrap(), date(2026, 1, 25));
        assert!(matches!(
            stale_cutoff(NaiveDate::MIN, 1),
            Err(DataError::StaleWindowOutOfRange { .. })
        ));
    }
}
