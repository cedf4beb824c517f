//! nasdupe - Incremental Duplicate Finder
//!
//! A CLI for keeping a persistent inventory of a file tree in SQLite and
//! finding duplicate files by size collision followed by BLAKE3 hashing.

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod engine;
pub mod error;
pub mod inventory;
pub mod job;
pub mod logging;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::thread;

use anyhow::Context;
use bytesize::ByteSize;

use crate::actions::DeleteMode;
use crate::cli::{Cli, Commands, DeleteArgs, GroupsArgs};
use crate::config::Config;
use crate::duplicates::DuplicateGroup;
use crate::engine::Engine;
use crate::error::ExitCode;
use crate::inventory::InventoryStore;
use crate::progress::{ProgressDisplay, POLL_INTERVAL};

/// Run the application with parsed CLI arguments.
///
/// Returns the exit code for successful dispatch; an `Err` means an
/// unexpected failure that `main` turns into a structured error report.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let config = Config::load();
    let root = resolve_root(&cli, &config)?;
    let database = match &cli.database {
        Some(path) => path.clone(),
        None => config.database_path()?,
    };

    log::debug!(
        "Using root {} with database {}",
        root.display(),
        database.display()
    );

    let store = InventoryStore::open(&database)
        .with_context(|| format!("Failed to open inventory database at {}", database.display()))?;

    let delete_mode = match &cli.command {
        Commands::Delete(args) if args.trash || config.use_trash => DeleteMode::Trash,
        _ if config.use_trash => DeleteMode::Trash,
        _ => DeleteMode::Permanent,
    };
    let engine = Engine::new(root, store).with_delete_mode(delete_mode);

    match cli.command {
        Commands::Scan => cmd_scan(&engine, cli.json, cli.quiet),
        Commands::Analyze => cmd_analyze(&engine, cli.json, cli.quiet),
        Commands::Groups(args) => cmd_groups(&engine, &args, cli.json),
        Commands::Stats => cmd_stats(&engine, cli.json),
        Commands::Delete(args) => cmd_delete(&engine, &args, cli.json),
    }
}

fn resolve_root(cli: &Cli, config: &Config) -> anyhow::Result<PathBuf> {
    cli.root
        .clone()
        .or_else(|| config.root.clone())
        .context("No root directory configured; pass --root or set it in the config file")
}

/// Run a job on a worker thread while the main thread polls progress
/// snapshots and drives the terminal display.
fn run_with_progress<T, F>(engine: &Engine, quiet: bool, job: F) -> T
where
    T: Send,
    F: FnOnce(&Engine) -> T + Send,
{
    thread::scope(|scope| {
        let handle = scope.spawn(|| job(engine));
        let mut display = ProgressDisplay::new(quiet);
        while !handle.is_finished() {
            display.update(&engine.scan_progress());
            thread::sleep(POLL_INTERVAL);
        }
        display.finish(&engine.scan_progress());
        match handle.join() {
            Ok(outcome) => outcome,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    })
}

fn cmd_scan(engine: &Engine, json: bool, quiet: bool) -> anyhow::Result<ExitCode> {
    if let Err(e) = signal::install(engine.coordinator().cancel_flag()) {
        log::warn!("Continuing without Ctrl+C handling: {}", e);
    }

    // JSON mode keeps stdout machine-readable; no progress drawing.
    let outcome = run_with_progress(engine, quiet || json, Engine::trigger_scan);

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }
    job_exit_code(engine, outcome.success, outcome.error.as_deref())
}

fn cmd_analyze(engine: &Engine, json: bool, quiet: bool) -> anyhow::Result<ExitCode> {
    if let Err(e) = signal::install(engine.coordinator().cancel_flag()) {
        log::warn!("Continuing without Ctrl+C handling: {}", e);
    }

    let outcome = run_with_progress(engine, quiet || json, Engine::analyze_duplicates);

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }
    job_exit_code(engine, outcome.success, outcome.error.as_deref())
}

/// Map a finished job to an exit code: a cancelled job exits 130, any other
/// failure exits 1.
fn job_exit_code(
    engine: &Engine,
    success: bool,
    error: Option<&str>,
) -> anyhow::Result<ExitCode> {
    if success {
        return Ok(ExitCode::Success);
    }
    if engine.coordinator().cancel_flag().load(Ordering::SeqCst) {
        return Ok(ExitCode::Interrupted);
    }
    anyhow::bail!("{}", error.unwrap_or("scan failed"))
}

fn cmd_groups(engine: &Engine, args: &GroupsArgs, json: bool) -> anyhow::Result<ExitCode> {
    let mut groups = engine.duplicate_groups()?;
    if let Some(limit) = args.limit {
        groups.truncate(limit);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
        return Ok(if groups.is_empty() {
            ExitCode::NoDuplicates
        } else {
            ExitCode::Success
        });
    }

    if groups.is_empty() {
        println!("No duplicate groups found. Run `nasdupe scan` first if the tree changed.");
        return Ok(ExitCode::NoDuplicates);
    }

    for (index, group) in groups.iter().enumerate() {
        print_group(index + 1, group);
    }
    let total_wasted: u64 = groups.iter().map(|g| g.wasted_space).sum();
    println!(
        "{} group(s), {} reclaimable",
        groups.len(),
        ByteSize(total_wasted)
    );
    Ok(ExitCode::Success)
}

fn print_group(number: usize, group: &DuplicateGroup) {
    let digest_short: String = group.digest.chars().take(12).collect();
    println!(
        "Group {}: {} files x {} ({} wasted) [{}]",
        number,
        group.len(),
        ByteSize(group.size),
        ByteSize(group.wasted_space),
        digest_short
    );
    for member in &group.members {
        println!(
            "  {}  {}",
            member.mtime.format("%Y-%m-%d %H:%M"),
            member.path
        );
    }
}

fn cmd_stats(engine: &Engine, json: bool) -> anyhow::Result<ExitCode> {
    let stats = engine.scan_stats()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(ExitCode::Success);
    }

    println!("Files indexed:  {}", stats.total_files);
    println!("Files hashed:   {}", stats.hashed_files);
    println!("Total size:     {}", ByteSize(stats.total_size));
    println!("Wasted space:   {}", ByteSize(stats.wasted_space));
    Ok(ExitCode::Success)
}

fn cmd_delete(engine: &Engine, args: &DeleteArgs, json: bool) -> anyhow::Result<ExitCode> {
    if !args.yes {
        // Dry run: show the plan and change nothing.
        println!("Would delete {} file(s):", args.paths.len());
        for path in &args.paths {
            println!("  {}", path);
        }
        println!("Re-run with --yes to delete.");
        return Ok(ExitCode::Success);
    }

    let outcome = engine.delete_files(&args.paths);

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("Deleted {} of {} file(s)", outcome.deleted_count, args.paths.len());
        for error in &outcome.errors {
            eprintln!("failed: {}", error);
        }
    }

    if outcome.success {
        Ok(ExitCode::Success)
    } else if outcome.deleted_count > 0 {
        Ok(ExitCode::PartialFailure)
    } else {
        anyhow::bail!("no files were deleted: {}", outcome.errors.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn root_flag_beats_config() {
        let cli = Cli::parse_from(["nasdupe", "--root", "/from/flag", "scan"]);
        let config = Config {
            root: Some(PathBuf::from("/from/config")),
            ..Config::default()
        };
        assert_eq!(
            resolve_root(&cli, &config).unwrap(),
            PathBuf::from("/from/flag")
        );
    }

    #[test]
    fn config_root_used_when_flag_absent() {
        let cli = Cli::parse_from(["nasdupe", "scan"]);
        let config = Config {
            root: Some(PathBuf::from("/from/config")),
            ..Config::default()
        };
        assert_eq!(
            resolve_root(&cli, &config).unwrap(),
            PathBuf::from("/from/config")
        );
    }

    #[test]
    fn missing_root_is_an_error() {
        let cli = Cli::parse_from(["nasdupe", "stats"]);
        assert!(resolve_root(&cli, &Config::default()).is_err());
    }
}
