use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod config;
mod dates;
mod db;
mod error;
mod models;
mod report;
mod seed;
mod summary;

use config::{Config, ConnectionArgs, DEFAULT_STALE_DAYS};
use dates::parse_date;
use models::{NewMember, NewSnapshot, RiskLevel, ScholarStatus};

#[derive(Parser)]
#[command(name = "cohort-health")]
#[command(about = "Cohort health snapshots and reports for Group Scholar", long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum SummaryFormat {
    Csv,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load the Foundations seed snapshot
    Seed,
    /// Create (or update) the snapshot for a program and date
    AddSnapshot {
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,
        #[arg(long)]
        program: String,
        #[arg(long, default_value = "manual")]
        source: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Add one scholar to an existing snapshot
    AddMember {
        #[arg(long)]
        snapshot_id: Uuid,
        #[arg(long)]
        scholar_id: String,
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        status: ScholarStatus,
        #[arg(long)]
        touchpoint_status: String,
        #[arg(long, value_parser = parse_date)]
        last_touchpoint: Option<NaiveDate>,
        #[arg(long)]
        risk_level: RiskLevel,
        #[arg(long)]
        engagement_score: i32,
    },
    /// Import snapshot members from a CSV file
    Import {
        #[arg(long)]
        snapshot_id: Uuid,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Export every member row for a snapshot date as CSV
    Export {
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,
        #[arg(long, default_value = report::STDOUT_SENTINEL)]
        out: PathBuf,
    },
    /// Compute, store and write per-program summaries
    Summary {
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,
        #[arg(long, default_value_t = DEFAULT_STALE_DAYS)]
        stale_days: u32,
        #[arg(long, value_enum, default_value_t = SummaryFormat::Csv)]
        format: SummaryFormat,
        #[arg(long, default_value = report::STDOUT_SENTINEL)]
        out: PathBuf,
    },
    /// Generate a markdown leadership brief
    Brief {
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,
        #[arg(long, default_value_t = DEFAULT_STALE_DAYS)]
        stale_days: u32,
        #[arg(long, default_value = "brief.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::from_args(&cli.connection)?;
    let pool = db::connect(&config).await?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let snapshot_id = db::seed(&pool).await?;
            println!("Seed snapshot {snapshot_id} ready.");
        }
        Commands::AddSnapshot {
            date,
            program,
            source,
            notes,
        } => {
            let snapshot = NewSnapshot {
                snapshot_date: date,
                program,
                source,
                notes,
            };
            let id = db::create_snapshot(&pool, &snapshot).await?;
            println!("{id}");
        }
        Commands::AddMember {
            snapshot_id,
            scholar_id,
            full_name,
            status,
            touchpoint_status,
            last_touchpoint,
            risk_level,
            engagement_score,
        } => {
            let member = NewMember {
                scholar_id,
                full_name,
                status,
                touchpoint_status,
                last_touchpoint,
                risk_level,
                engagement_score,
            };
            db::add_member(&pool, snapshot_id, &member).await?;
            println!("Added {} to snapshot {snapshot_id}.", member.scholar_id);
        }
        Commands::Import { snapshot_id, csv } => {
            let inserted = db::import_members_csv(&pool, snapshot_id, &csv).await?;
            println!("Inserted {inserted} members from {}.", csv.display());
        }
        Commands::Export { date, out } => {
            let rows = db::fetch_snapshot_rows(&pool, date).await?;
            let csv = report::render_rows_csv(&rows)?;
            report::write_output(&out, &csv)?;
            info!(rows = rows.len(), out = %out.display(), "export written");
        }
        Commands::Summary {
            date,
            stale_days,
            format,
            out,
        } => {
            let rows = db::fetch_snapshot_rows(&pool, date).await?;
            let summaries = summary::summarize(&rows, stale_days)?;
            info!(programs = summaries.len(), stale_days, "summaries computed");

            let rendered = match format {
                SummaryFormat::Csv => report::render_summary_csv(&summaries)?,
                SummaryFormat::Json => report::render_summary_json(&summaries)?,
            };
            db::save_summaries(&pool, &summaries).await?;
            report::write_output(&out, &rendered)?;
        }
        Commands::Brief {
            date,
            stale_days,
            out,
        } => {
            let rows = db::fetch_snapshot_rows(&pool, date).await?;
            let summaries = summary::summarize(&rows, stale_days)?;
            let brief = report::build_brief(date, stale_days, &summaries, &rows)?;
            report::write_output(&out, &brief)?;
            info!(programs = summaries.len(), out = %out.display(), "brief written");
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}
