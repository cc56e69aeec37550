use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::dates::parse_date;
use crate::error::DataError;
use crate::models::{
    NewMember, NewSnapshot, ProgramSummary, RiskLevel, ScholarRecord, ScholarStatus, SnapshotMeta,
    SnapshotRow,
};
use crate::seed;

pub async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    info!(max_connections = config.max_connections, "connecting to Postgres");
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("migrations applied");
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<Uuid> {
    let mut tx = pool.begin().await?;
    let snapshot_id = upsert_snapshot(&mut tx, &seed::seed_snapshot()?).await?;

    let mut inserted = 0usize;
    for record in seed::foundations_roster()? {
        let member = NewMember::from(&record);
        inserted += insert_member(&mut tx, snapshot_id, &member, true).await?;
    }

    tx.commit().await?;
    info!(%snapshot_id, inserted, "seed snapshot ready");
    Ok(snapshot_id)
}

pub async fn create_snapshot(pool: &PgPool, snapshot: &NewSnapshot) -> anyhow::Result<Uuid> {
    let mut tx = pool.begin().await?;
    let id = upsert_snapshot(&mut tx, snapshot).await?;
    tx.commit().await?;
    Ok(id)
}

pub async fn add_member(
    pool: &PgPool,
    snapshot_id: Uuid,
    member: &NewMember,
) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;
    insert_member(&mut tx, snapshot_id, member, false)
        .await
        .with_context(|| format!("failed to add scholar {}", member.scholar_id))?;
    tx.commit().await?;
    Ok(())
}

#[derive(serde::Deserialize)]
struct CsvRow {
    scholar_id: String,
    full_name: String,
    status: String,
    touchpoint_status: String,
    last_touchpoint: Option<String>,
    risk_level: String,
    engagement_score: i32,
}

pub async fn import_members_csv(
    pool: &PgPool,
    snapshot_id: Uuid,
    csv_path: &Path,
) -> anyhow::Result<usize> {
    let program = fetch_snapshot_program(pool, snapshot_id).await?;
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;

    // Validate the whole file before touching the database.
    let members = parse_member_rows(file, &program)
        .with_context(|| format!("invalid member csv {}", csv_path.display()))?;

    let mut tx = pool.begin().await?;
    let mut inserted = 0usize;
    for member in &members {
        inserted += insert_member(&mut tx, snapshot_id, member, true).await?;
    }
    tx.commit().await?;

    debug!(read = members.len(), inserted, "csv import finished");
    Ok(inserted)
}

/// Parses and validates member rows for one program's snapshot. A scholar
/// listed twice in the same file is rejected.
pub fn parse_member_rows<R: Read>(input: R, program: &str) -> anyhow::Result<Vec<NewMember>> {
    let mut reader = csv::Reader::from_reader(input);
    let headers = reader.headers()?.clone();
    let mut seen = HashSet::new();
    let mut members = Vec::new();

    for result in reader.records() {
        let record = result.context("malformed csv row")?;
        let line = record.position().map_or(0, |position| position.line());
        let row: CsvRow = record
            .deserialize(Some(&headers))
            .with_context(|| format!("malformed csv row on line {line}"))?;

        if !seen.insert(row.scholar_id.clone()) {
            return Err(DataError::DuplicateScholar {
                program: program.to_string(),
                scholar_id: row.scholar_id,
            })
            .with_context(|| format!("line {line}"));
        }

        let last_touchpoint = match row.last_touchpoint.as_deref().map(str::trim) {
            Some(value) if !value.is_empty() => {
                Some(parse_date(value).with_context(|| format!("line {line}"))?)
            }
            _ => None,
        };

        members.push(NewMember {
            scholar_id: row.scholar_id,
            full_name: row.full_name,
            status: row
                .status
                .parse::<ScholarStatus>()
                .with_context(|| format!("line {line}"))?,
            touchpoint_status: row.touchpoint_status,
            last_touchpoint,
            risk_level: row
                .risk_level
                .parse::<RiskLevel>()
                .with_context(|| format!("line {line}"))?,
            engagement_score: row.engagement_score,
        });
    }

    Ok(members)
}

async fn fetch_snapshot_program(pool: &PgPool, snapshot_id: Uuid) -> anyhow::Result<String> {
    let row = sqlx::query("SELECT program FROM cohort_health.snapshots WHERE id = $1")
        .bind(snapshot_id)
        .fetch_optional(pool)
        .await?
        .with_context(|| format!("snapshot {snapshot_id} does not exist"))?;

    Ok(row.try_get("program")?)
}

pub async fn fetch_snapshot_rows(
    pool: &PgPool,
    snapshot_date: NaiveDate,
) -> anyhow::Result<Vec<SnapshotRow>> {
    let rows = sqlx::query(
        r#"
        SELECT s.id AS snapshot_id, s.snapshot_date, s.program, s.source, s.notes,
               m.scholar_id, m.full_name, m.status, m.touchpoint_status,
               m.last_touchpoint, m.risk_level, m.engagement_score
        FROM cohort_health.members m
        JOIN cohort_health.snapshots s ON s.id = m.snapshot_id
        WHERE s.snapshot_date = $1
        ORDER BY s.program, m.full_name
        "#,
    )
    .bind(snapshot_date)
    .fetch_all(pool)
    .await?;

    let rows = rows
        .iter()
        .map(snapshot_row)
        .collect::<anyhow::Result<Vec<_>>>()?;
    info!(%snapshot_date, rows = rows.len(), "fetched snapshot rows");
    Ok(rows)
}

fn snapshot_row(row: &PgRow) -> anyhow::Result<SnapshotRow> {
    let program: String = row.try_get("program")?;
    let scholar_id: String = row.try_get("scholar_id")?;
    let status: String = row.try_get("status")?;
    let risk_level: String = row.try_get("risk_level")?;

    let record = ScholarRecord {
        full_name: row.try_get("full_name")?,
        program: program.clone(),
        status: status
            .parse::<ScholarStatus>()
            .with_context(|| format!("scholar {scholar_id}"))?,
        touchpoint_status: row.try_get("touchpoint_status")?,
        last_touchpoint: row.try_get("last_touchpoint")?,
        risk_level: risk_level
            .parse::<RiskLevel>()
            .with_context(|| format!("scholar {scholar_id}"))?,
        engagement_score: row.try_get("engagement_score")?,
        scholar_id,
    };

    Ok(SnapshotRow {
        meta: SnapshotMeta {
            id: row.try_get("snapshot_id")?,
            snapshot_date: row.try_get("snapshot_date")?,
            program,
            source: row.try_get("source")?,
            notes: row.try_get("notes")?,
        },
        record,
    })
}

pub async fn save_summaries(pool: &PgPool, summaries: &[ProgramSummary]) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;

    for summary in summaries {
        sqlx::query(
            r#"
            INSERT INTO cohort_health.program_summaries
            (snapshot_date, program, total_members, active_members, needs_followup_members,
             high_risk_members, medium_risk_members, low_risk_members, avg_engagement_score,
             stale_touchpoints, pct_needs_followup, pct_high_risk)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (snapshot_date, program) DO UPDATE
            SET total_members = EXCLUDED.total_members,
                active_members = EXCLUDED.active_members,
                needs_followup_members = EXCLUDED.needs_followup_members,
                high_risk_members = EXCLUDED.high_risk_members,
                medium_risk_members = EXCLUDED.medium_risk_members,
                low_risk_members = EXCLUDED.low_risk_members,
                avg_engagement_score = EXCLUDED.avg_engagement_score,
                stale_touchpoints = EXCLUDED.stale_touchpoints,
                pct_needs_followup = EXCLUDED.pct_needs_followup,
                pct_high_risk = EXCLUDED.pct_high_risk,
                computed_at = now()
            "#,
        )
        .bind(summary.snapshot_date)
        .bind(&summary.program)
        .bind(count(summary.total_members)?)
        .bind(count(summary.active_members)?)
        .bind(count(summary.needs_followup_members)?)
        .bind(count(summary.high_risk)?)
        .bind(count(summary.medium_risk)?)
        .bind(count(summary.low_risk)?)
        .bind(summary.avg_engagement_score)
        .bind(count(summary.stale_touchpoints)?)
        .bind(&summary.pct_needs_followup)
        .bind(&summary.pct_high_risk)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    info!(saved = summaries.len(), "program summaries persisted");
    Ok(())
}

fn count(value: usize) -> anyhow::Result<i32> {
    i32::try_from(value).context("count does not fit in an INTEGER column")
}

async fn upsert_snapshot(
    tx: &mut Transaction<'_, Postgres>,
    snapshot: &NewSnapshot,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO cohort_health.snapshots (id, snapshot_date, program, source, notes)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (snapshot_date, program) DO UPDATE
        SET source = EXCLUDED.source, notes = EXCLUDED.notes
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(snapshot.snapshot_date)
    .bind(&snapshot.program)
    .bind(&snapshot.source)
    .bind(&snapshot.notes)
    .fetch_one(&mut **tx)
    .await?
    .get("id");

    debug!(%id, program = %snapshot.program, "snapshot upserted");
    Ok(id)
}

/// Returns the number of rows written. With `skip_existing`, a scholar
/// already captured in the snapshot is left untouched instead of failing.
async fn insert_member(
    tx: &mut Transaction<'_, Postgres>,
    snapshot_id: Uuid,
    member: &NewMember,
    skip_existing: bool,
) -> anyhow::Result<usize> {
    let conflict = if skip_existing {
        "ON CONFLICT (snapshot_id, scholar_id) DO NOTHING"
    } else {
        ""
    };
    let query = format!(
        "INSERT INTO cohort_health.members \
         (id, snapshot_id, scholar_id, full_name, status, touchpoint_status, \
          last_touchpoint, risk_level, engagement_score) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) {conflict}"
    );

    let result = sqlx::query(&query)
        .bind(Uuid::new_v4())
        .bind(snapshot_id)
        .bind(&member.scholar_id)
        .bind(&member.full_name)
        .bind(member.status.as_str())
        .bind(&member.touchpoint_status)
        .bind(member.last_touchpoint)
        .bind(member.risk_level.as_str())
        .bind(member.engagement_score)
        .execute(&mut **tx)
        .await?;

    Ok(result.rows_affected() as usize)
}
