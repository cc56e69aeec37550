use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;

use crate::dates::format_date;
use crate::error::DataError;
use crate::models::{ProgramSummary, RiskLevel, SnapshotRow};
use crate::summary::stale_cutoff;

pub const ROW_HEADERS: [&str; 11] = [
    "snapshot_date",
    "program",
    "source",
    "notes",
    "scholar_id",
    "full_name",
    "status",
    "touchpoint_status",
    "last_touchpoint",
    "risk_level",
    "engagement_score",
];

pub const SUMMARY_HEADERS: [&str; 12] = [
    "snapshot_date",
    "program",
    "total_members",
    "active_members",
    "needs_followup_members",
    "high_risk_members",
    "medium_risk_members",
    "low_risk_members",
    "avg_engagement_score",
    "stale_touchpoints",
    "pct_needs_followup",
    "pct_high_risk",
];

/// Output path that means "write to stdout".
pub const STDOUT_SENTINEL: &str = "-";

pub fn render_rows_csv(rows: &[SnapshotRow]) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(ROW_HEADERS)?;

    for row in rows {
        let record = &row.record;
        writer.write_record([
            format_date(row.meta.snapshot_date),
            row.meta.program.clone(),
            row.meta.source.clone(),
            row.meta.notes.clone().unwrap_or_default(),
            record.scholar_id.clone(),
            record.full_name.clone(),
            record.status.to_string(),
            record.touchpoint_status.clone(),
            record.last_touchpoint.map(format_date).unwrap_or_default(),
            record.risk_level.to_string(),
            record.engagement_score.to_string(),
        ])?;
    }

    finish(writer)
}

pub fn render_summary_csv(summaries: &[ProgramSummary]) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(SUMMARY_HEADERS)?;

    for summary in summaries {
        writer.write_record([
            format_date(summary.snapshot_date),
            summary.program.clone(),
            summary.total_members.to_string(),
            summary.active_members.to_string(),
            summary.needs_followup_members.to_string(),
            summary.high_risk.to_string(),
            summary.medium_risk.to_string(),
            summary.low_risk.to_string(),
            format_average(summary.avg_engagement_score),
            summary.stale_touchpoints.to_string(),
            summary.pct_needs_followup.clone(),
            summary.pct_high_risk.clone(),
        ])?;
    }

    finish(writer)
}

pub fn render_summary_json(summaries: &[ProgramSummary]) -> anyhow::Result<String> {
    let mut output = serde_json::to_string_pretty(summaries)?;
    output.push('\n');
    Ok(output)
}

fn finish(writer: csv::Writer<Vec<u8>>) -> anyhow::Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("failed to flush csv output: {}", err.error()))?;
    Ok(String::from_utf8(bytes)?)
}

fn format_average(value: Option<f64>) -> String {
    value.map(|avg| format!("{avg:.2}")).unwrap_or_default()
}

/// Markdown leadership update for one snapshot date.
pub fn build_brief(
    snapshot_date: NaiveDate,
    stale_days: u32,
    summaries: &[ProgramSummary],
    rows: &[SnapshotRow],
) -> Result<String, DataError> {
    let stale_date = stale_cutoff(snapshot_date, stale_days)?;
    let mut output = String::new();

    let _ = writeln!(output, "# Cohort Health Brief");
    let _ = writeln!(
        output,
        "Snapshot {} (touchpoints {} or more days old are stale)",
        format_date(snapshot_date),
        stale_days
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Program Rollup");

    if summaries.is_empty() {
        let _ = writeln!(output, "No members captured for this snapshot.");
    } else {
        for summary in summaries {
            let avg = summary
                .avg_engagement_score
                .map(|avg| format!("{avg:.1}"))
                .unwrap_or_else(|| "n/a".to_string());
            let _ = writeln!(
                output,
                "- {}: {} members ({} active), {}% need follow-up, {}% high risk, avg engagement {}, {} stale touchpoints",
                summary.program,
                summary.total_members,
                summary.active_members,
                summary.pct_needs_followup,
                summary.pct_high_risk,
                avg,
                summary.stale_touchpoints
            );
        }
    }

    let follow_ups: Vec<&SnapshotRow> = rows
        .iter()
        .filter(|r| r.record.needs_follow_up())
        .collect();
    let _ = writeln!(output);
    let _ = writeln!(output, "## Needs Follow-Up");
    write_scholars(&mut output, &follow_ups, "No scholars flagged for follow-up.");

    let high_risk: Vec<&SnapshotRow> = rows
        .iter()
        .filter(|r| r.record.risk_level == RiskLevel::High)
        .collect();
    let _ = writeln!(output);
    let _ = writeln!(output, "## High Risk");
    write_scholars(&mut output, &high_risk, "No high-risk scholars.");

    let stale: Vec<&SnapshotRow> = rows
        .iter()
        .filter(|r| r.record.is_stale(stale_date))
        .collect();
    let _ = writeln!(output);
    let _ = writeln!(output, "## Stale Touchpoints");
    write_scholars(&mut output, &stale, "Every scholar has a recent touchpoint.");

    Ok(output)
}

fn write_scholars(output: &mut String, rows: &[&SnapshotRow], empty_message: &str) {
    if rows.is_empty() {
        let _ = writeln!(output, "{empty_message}");
        return;
    }

    let mut rows = rows.to_vec();
    rows.sort_by(|a, b| {
        (&a.record.program, &a.record.full_name).cmp(&(&b.record.program, &b.record.full_name))
    });

    for row in rows {
        let record = &row.record;
        let last = record
            .last_touchpoint
            .map(format_date)
            .unwrap_or_else(|| "never".to_string());
        let _ = writeln!(
            output,
            "- {} ({}, {}): {}, {} risk, engagement {}, last touchpoint {}",
            record.full_name,
            record.scholar_id,
            record.program,
            record.touchpoint_status,
            record.risk_level,
            record.engagement_score,
            last
        );
    }
}

/// Writes `contents` to `out`, or to stdout when `out` is `-`.
pub fn write_output(out: &Path, contents: &str) -> anyhow::Result<()> {
    if out.as_os_str() == STDOUT_SENTINEL {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(contents.as_bytes())?;
        stdout.flush()?;
        return Ok(());
    }

    std::fs::write(out, contents).with_context(|| format!("failed to write {}", out.display()))
}
