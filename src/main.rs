//! festsync CLI - publish and follow live competition results.
//!
//! Thin command wrapper over the sync store: print the scoreboard,
//! move datasets in and out as JSON, seed a fresh instance, follow the
//! live result feed, or publish a single result from the shell.

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use festsync::models::{Grade, NewResult, Place};
use festsync::scores::Scoreboard;
use festsync::transfer::default_export_filename;
use festsync::{Collection, Config, SyncStore};

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn print_usage() {
    eprintln!("Usage: festsync <command> [args]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  scores                 Print the team scoreboard and current leader");
    eprintln!("  export [path]          Write the full dataset as JSON (default: {})", default_export_filename());
    eprintln!("  import <path>          Load a dataset from a JSON export");
    eprintln!("  seed <path>            Alias for import, for first-run provisioning");
    eprintln!("  watch                  Follow the live result feed (remote mode only)");
    eprintln!("  add-result             Publish a result (requires --secret)");
    eprintln!("    --program <id> --participant <id> --team <id> --points <n>");
    eprintln!("    [--grade A+|A|B+|B|C|D|E] [--place 1st|2nd|3rd|Participation]");
    eprintln!("    --secret <admin secret>");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let command = match args.get(1) {
        Some(c) => c.as_str(),
        None => {
            print_usage();
            std::process::exit(2);
        }
    };

    let config = Config::load()?;
    let mut store = SyncStore::open(&config).await?;
    info!(
        mode = if store.is_remote() { "remote" } else { "local" },
        "festsync starting"
    );

    match command {
        "scores" => cmd_scores(&store),
        "export" => cmd_export(&store, args.get(2).map(PathBuf::from)),
        "import" | "seed" => {
            let path = args.get(2).map(PathBuf::from).ok_or_else(|| {
                anyhow::anyhow!("{} requires a path to a JSON export", command)
            })?;
            cmd_import(&mut store, &path).await
        }
        "watch" => cmd_watch(&mut store).await,
        "add-result" => cmd_add_result(&mut store, &args[2..]).await,
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            std::process::exit(2);
        }
    }
}

/// Print per-team totals, each team's share, and the leader.
fn cmd_scores(store: &SyncStore) -> Result<()> {
    let board = Scoreboard::build(store.results(), store.teams());
    if board.rows.is_empty() {
        eprintln!("No teams yet.");
        return Ok(());
    }

    println!("{:<24} {:>8} {:>7}", "Team", "Points", "Share");
    for row in &board.rows {
        println!(
            "{:<24} {:>8} {:>6.1}%",
            row.name,
            row.points,
            row.share * 100.0
        );
    }
    match board.leader {
        Some(ref leader_id) => {
            let name = store
                .teams()
                .iter()
                .find(|t| &t.id == leader_id)
                .map(|t| t.name.as_str())
                .unwrap_or(leader_id);
            println!("\nLeader: {}", name);
        }
        None => println!("\nNo leader (tie or no points yet)."),
    }
    Ok(())
}

fn cmd_export(store: &SyncStore, path: Option<PathBuf>) -> Result<()> {
    let path = path.unwrap_or_else(|| PathBuf::from(default_export_filename()));
    store.export_to_file(&path)?;
    eprintln!(
        "Exported {} results, {} programs, {} teams, {} participants to {}",
        store.results().len(),
        store.programs().len(),
        store.teams().len(),
        store.participants().len(),
        path.display()
    );
    Ok(())
}

async fn cmd_import(store: &mut SyncStore, path: &PathBuf) -> Result<()> {
    store.import_from_file(path).await?;
    eprintln!("Imported dataset from {}", path.display());
    Ok(())
}

/// Follow the live result feed until Ctrl+C.
async fn cmd_watch(store: &mut SyncStore) -> Result<()> {
    if !store.is_remote() {
        anyhow::bail!("watch requires a configured backend; running in local-only mode");
    }

    let handle = store.subscribe(Collection::Results).await?;
    eprintln!("Watching results (Ctrl+C to stop)...");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                handle.cancel();
                eprintln!("Stopped.");
                return Ok(());
            }
            refreshed = store.process_next() => match refreshed {
                Some(_) => {
                    println!("-- {} results --", store.results().len());
                    for entry in store.results().iter().take(10) {
                        println!(
                            "{}  {:>4} pts  {}  {}  (team {})",
                            entry.timestamp.format("%H:%M:%S"),
                            entry.points,
                            entry.grade,
                            entry.place,
                            entry.team_id
                        );
                    }
                }
                None => {
                    eprintln!("Feed ended.");
                    return Ok(());
                }
            }
        }
    }
}

/// Publish a single result from flag-style arguments.
async fn cmd_add_result(store: &mut SyncStore, args: &[String]) -> Result<()> {
    let mut program_id = None;
    let mut participant_id = None;
    let mut team_id = None;
    let mut points = None;
    let mut grade = Grade::A;
    let mut place = Place::Participation;
    let mut secret = None;

    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        let value = iter
            .next()
            .ok_or_else(|| anyhow::anyhow!("{} requires a value", flag))?;
        match flag.as_str() {
            "--program" => program_id = Some(value.clone()),
            "--participant" => participant_id = Some(value.clone()),
            "--team" => team_id = Some(value.clone()),
            "--points" => points = Some(value.parse::<u32>()?),
            "--grade" => {
                grade = Grade::parse(value)
                    .ok_or_else(|| anyhow::anyhow!("unknown grade: {}", value))?
            }
            "--place" => {
                place = Place::parse(value)
                    .ok_or_else(|| anyhow::anyhow!("unknown place: {}", value))?
            }
            "--secret" => secret = Some(value.clone()),
            other => anyhow::bail!("unknown flag: {}", other),
        }
    }

    let secret = secret.ok_or_else(|| anyhow::anyhow!("add-result requires --secret"))?;
    if !store.login(&secret) {
        anyhow::bail!("admin secret rejected");
    }

    let draft = NewResult {
        program_id: program_id.ok_or_else(|| anyhow::anyhow!("--program is required"))?,
        participant_id: participant_id
            .ok_or_else(|| anyhow::anyhow!("--participant is required"))?,
        team_id: team_id.ok_or_else(|| anyhow::anyhow!("--team is required"))?,
        points: points.ok_or_else(|| anyhow::anyhow!("--points is required"))?,
        grade,
        place,
    };

    let id = store.add_result(draft).await?;
    eprintln!("Published result {}", id);
    Ok(())
}
