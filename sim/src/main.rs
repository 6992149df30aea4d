//! Offline administration and odds simulation for the EPE gacha
//!
//! Runs the same engine as the browser app against a JSON data file. There
//! is no cloud transport here; draws and imports only touch the file.

mod odds;
mod store;

use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use epe_gacha_core::clock::SystemClock;
use epe_gacha_core::engine::GachaEngine;
use epe_gacha_core::ledger::LEADERBOARD_SIZE;
use epe_gacha_core::prizes::PrizeTable;
use epe_gacha_core::records::DrawRecords;
use epe_gacha_core::rng::XorShiftRng;
use epe_gacha_core::store::JsonStore;
use epe_gacha_core::sync::NoRemote;
use epe_gacha_core::types::{DrawLogEntry, ImportRow, PrizeDefinition};
use epe_gacha_core::view::FragmentProgress;

use crate::store::FileStore;

type FileEngine = GachaEngine<JsonStore<FileStore>, NoRemote, XorShiftRng, SystemClock>;

#[derive(Parser, Debug)]
#[command(name = "epe-gacha-sim", about = "EPE gacha odds simulator and offline admin")]
struct Args {
    /// Data file holding ledger, log and session
    #[arg(long, default_value = "epe-data.json")]
    data: PathBuf,

    /// Prize table to use instead of the built-in one (JSON array)
    #[arg(long)]
    prizes: Option<PathBuf>,

    /// Print engine log lines to stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the prize table and simulate draws
    Odds {
        #[arg(short = 'n', long, default_value_t = 1_000_000)]
        draws: u64,
        #[arg(short, long, default_value_t = 42)]
        seed: u64,
        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Overwrite balances from a JSON array of {name, points}
    Import { file: PathBuf },
    /// Log a user in
    Login { name: String },
    /// Log the current user out
    Logout,
    /// Draw for the logged-in user
    Draw {
        #[arg(short = 'n', long, default_value_t = 1)]
        times: u32,
        /// Seed for the draw generator; random when omitted
        #[arg(short, long)]
        seed: Option<u64>,
    },
    /// Mark a log entry as handed over
    Redeem { log_id: String },
    /// Print the draw log, newest first
    Logs {
        /// Only entries still waiting for redemption
        #[arg(long)]
        pending: bool,
        #[arg(long)]
        user: Option<String>,
    },
    /// Top balances
    Leaderboard {
        #[arg(short, long, default_value_t = LEADERBOARD_SIZE)]
        limit: usize,
    },
    /// Write a SCALE snapshot of ledger and log
    Export { file: PathBuf },
    /// Replace ledger and log from a SCALE snapshot
    Restore { file: PathBuf },
    /// Delete every stored value
    Reset {
        #[arg(long)]
        yes: bool,
    },
}

/// Minimal stderr sink for the `log` facade
struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        eprintln!("[{}] {}", record.level(), record.args());
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn load_table(path: Option<&PathBuf>) -> Result<PrizeTable, Box<dyn Error>> {
    match path {
        Some(path) => {
            let prizes: Vec<PrizeDefinition> = serde_json::from_str(&fs::read_to_string(path)?)?;
            Ok(PrizeTable::new(prizes)?)
        }
        None => Ok(PrizeTable::builtin()),
    }
}

fn open_engine(args: &Args, table: PrizeTable, seed: Option<u64>) -> Result<FileEngine, Box<dyn Error>> {
    let store = FileStore::open(&args.data)?;
    let seed = seed.unwrap_or_else(|| {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    });
    Ok(GachaEngine::new(
        JsonStore::new(store),
        NoRemote,
        XorShiftRng::seed_from_u64(seed),
        SystemClock,
    )
    .with_table(table))
}

/// Log lines for `logs`, newest first
fn select_logs<'a>(records: &'a DrawRecords, pending: bool, user: Option<&'a str>) -> Vec<&'a DrawLogEntry> {
    match user {
        Some(user) => records
            .for_user(user)
            .filter(|e| !pending || e.is_pending())
            .collect(),
        None if pending => records.pending().collect(),
        None => records.entries().iter().collect(),
    }
}

fn print_progress(progress: &[FragmentProgress]) {
    for group in progress.iter().filter(|g| g.count > 0) {
        println!(
            "  {} {}/{}{}",
            group.reward_name,
            group.count,
            group.needed,
            if group.complete { " (complete)" } else { "" }
        );
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    if args.verbose {
        log::set_logger(&LOGGER).map(|()| log::set_max_level(log::LevelFilter::Debug))?;
    }

    let table = load_table(args.prizes.as_ref())?;

    match &args.command {
        Command::Odds { draws, seed, json } => {
            let warnings = table.warnings();
            let report = odds::simulate(&table, *draws, *seed);
            if *json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }
            for warning in &warnings {
                println!("warning: {:?}", warning);
            }
            println!("{:<14} {:<24} {:>9} {:>9} {:>10}", "id", "name", "weight", "observed", "hits");
            for row in &report.rows {
                println!(
                    "{:<14} {:<24} {:>8.2}% {:>8.3}% {:>10}",
                    row.id, row.name, row.weight, row.observed, row.hits
                );
            }
            println!(
                "{} draws, seed {}, fallback mass {:.2}%",
                report.draws, report.seed, report.fallback_mass
            );
        }
        Command::Import { file } => {
            let rows: Vec<ImportRow> = serde_json::from_str(&fs::read_to_string(file)?)?;
            let mut engine = open_engine(&args, table, None)?;
            let outcome = engine.import_points(&rows).await?;
            println!("imported {} rows", outcome.report.imported);
            for skipped in &outcome.report.skipped {
                println!("  skipped row {}: {:?}", skipped.row, skipped.issue);
            }
        }
        Command::Login { name } => {
            let mut engine = open_engine(&args, table, None)?;
            let session = engine.login(name)?;
            println!("{} logged in with {} points", session.name, session.points);
        }
        Command::Logout => {
            open_engine(&args, table, None)?.logout()?;
            println!("logged out");
        }
        Command::Draw { times, seed } => {
            let mut engine = open_engine(&args, table, *seed)?;
            for _ in 0..*times {
                let outcome = engine.draw_current().await?;
                println!(
                    "{} -> {} ({:?}), balance {}",
                    outcome.session.name, outcome.prize.name, outcome.prize.kind, outcome.session.points
                );
            }
            if let Some(session) = engine.current_session() {
                print_progress(&engine.fragment_progress(&session));
            }
        }
        Command::Redeem { log_id } => {
            let mut engine = open_engine(&args, table, None)?;
            match engine.mark_redeemed(log_id).await?.redeemed_at {
                Some(at) => println!("{} redeemed at {}", log_id, at),
                None => println!("no log entry {}", log_id),
            }
        }
        Command::Logs { pending, user } => {
            let records = DrawRecords::from(open_engine(&args, table, None)?.logs());
            for entry in select_logs(&records, *pending, user.as_deref()) {
                println!(
                    "{} {:<12} {:<24} {:?}{}",
                    entry.id,
                    entry.user_name,
                    entry.prize_name,
                    entry.prize_type,
                    match entry.redeemed_at {
                        Some(at) => format!(" redeemed {}", at),
                        None => String::new(),
                    }
                );
            }
        }
        Command::Leaderboard { limit } => {
            let engine = open_engine(&args, table, None)?;
            for entry in engine.leaderboard(*limit) {
                println!("{:>3}. {:<16} {:>8}", entry.rank, entry.name, entry.points);
            }
        }
        Command::Export { file } => {
            let engine = open_engine(&args, table, None)?;
            fs::write(file, engine.export_snapshot())?;
            println!("wrote {}", file.display());
        }
        Command::Restore { file } => {
            let mut engine = open_engine(&args, table, None)?;
            engine.restore_snapshot(&fs::read(file)?)?;
            println!("restored from {}", file.display());
        }
        Command::Reset { yes } => {
            if !*yes {
                return Err("refusing to reset without --yes".into());
            }
            let mut engine = open_engine(&args, table, None)?;
            engine.reset()?;
            println!("all data in {} cleared", engine.store().backend().path().display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use epe_gacha_core::types::PrizeKind;

    #[test]
    fn test_cli_parses_draw() {
        let args = Args::parse_from(["epe-gacha-sim", "--data", "x.json", "draw", "-n", "3", "--seed", "9"]);
        assert_eq!(args.data, PathBuf::from("x.json"));
        match args.command {
            Command::Draw { times, seed } => {
                assert_eq!(times, 3);
                assert_eq!(seed, Some(9));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_leaderboard_default_limit() {
        let args = Args::parse_from(["epe-gacha-sim", "leaderboard"]);
        assert!(matches!(args.command, Command::Leaderboard { limit } if limit == LEADERBOARD_SIZE));
    }

    #[test]
    fn test_select_logs_combines_filters() {
        let entry = |id: &str, user: &str, kind: PrizeKind, redeemed_at: Option<u64>| DrawLogEntry {
            id: id.to_string(),
            user_name: user.to_string(),
            prize_name: "prize".to_string(),
            prize_type: kind,
            timestamp: 1,
            redeemed_at,
        };
        let records = DrawRecords::from(vec![
            entry("4", "Tom", PrizeKind::Cash, None),
            entry("3", "Ann", PrizeKind::Coupon, None),
            entry("2", "Tom", PrizeKind::Empty, None),
            entry("1", "Tom", PrizeKind::Physical, Some(5)),
        ]);
        let ids = |selected: Vec<&DrawLogEntry>| selected.iter().map(|e| e.id.clone()).collect::<Vec<_>>();

        assert_eq!(ids(select_logs(&records, false, None)), ["4", "3", "2", "1"]);
        assert_eq!(ids(select_logs(&records, true, None)), ["4", "3"]);
        assert_eq!(ids(select_logs(&records, false, Some("Tom"))), ["4", "2", "1"]);
        assert_eq!(ids(select_logs(&records, true, Some("Tom"))), ["4"]);
    }

    #[test]
    fn test_custom_table_is_validated() {
        let path = std::env::temp_dir().join(format!("epe-gacha-prizes-{}.json", std::process::id()));
        fs::write(&path, "[]").unwrap();

        assert!(load_table(Some(&path)).is_err());

        let _ = fs::remove_file(&path);
    }
}
