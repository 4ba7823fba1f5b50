//! One-shot reconciliation of a round's spreadsheet against the score ledger.

use anyhow::{Context, bail};
use clap::{ArgGroup, Parser};
use time::{Date, macros::format_description};
use tracing::info;

use wordle_golf_back::{
    app::{self, StorageBackend},
    config::AppConfig,
    scoring::calendar::Calendar,
    services::reconcile_service,
    state::AppState,
};

#[derive(Debug, Parser)]
#[command(about = "Reconcile the Wordle golf sheet of one day")]
#[command(group(ArgGroup::new("day").args(["date", "puzzle_day", "days_ago"])))]
struct Args {
    /// Day to reconcile (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    date: Option<Date>,
    /// Puzzle number to reconcile.
    #[arg(long)]
    puzzle_day: Option<i64>,
    /// Reconcile N days before today.
    #[arg(long)]
    days_ago: Option<i64>,
    /// Search social posts for players missing today's score.
    #[arg(long)]
    check_social: bool,
}

fn parse_date(value: &str) -> Result<Date, String> {
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .map_err(|err| format!("expected YYYY-MM-DD: {err}"))
}

fn resolve_date(args: &Args, config: &AppConfig) -> anyhow::Result<Date> {
    let calendar = Calendar::new(config.puzzle_epoch(), Vec::new());
    if let Some(date) = args.date {
        return Ok(date);
    }
    if let Some(number) = args.puzzle_day {
        return calendar
            .date_for(number)
            .with_context(|| format!("resolving puzzle {number}"));
    }
    let today = calendar.today(config.utc_offset());
    match args.days_ago {
        Some(days) if days < 0 => bail!("--days-ago must not be negative"),
        Some(days) => Ok(calendar
            .shift(&today, days)
            .context("--days-ago reaches outside the calendar")?
            .date),
        None => Ok(today.date),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::init_tracing();
    let args = Args::parse();

    let config = AppConfig::load();
    let date = resolve_date(&args, &config)?;
    let store = app::connect_storage(StorageBackend::from_env()?, &config).await?;

    let state = AppState::new(config);
    state.set_score_store(store).await;

    info!(%date, check_social = args.check_social, "reconciling");
    let report = reconcile_service::sync_day(&state, date, args.check_social)
        .await
        .with_context(|| format!("reconciling {date}"))?;

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("serializing sync report")?
    );
    Ok(())
}
