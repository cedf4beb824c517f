//! Command-line interface definitions.
//!
//! All arguments and subcommands are declared with the clap derive API.
//! Global options (verbosity, JSON output, root/database overrides) apply
//! to every subcommand.
//!
//! # Example
//!
//! ```bash
//! # Index the tree and hash duplicate candidates
//! nasdupe --root /srv/nas scan
//!
//! # Hash pending candidates without a fresh walk
//! nasdupe --root /srv/nas analyze
//!
//! # Show duplicate groups, largest waste first
//! nasdupe --root /srv/nas groups --limit 20
//!
//! # Delete two copies, keeping the rest of the group
//! nasdupe --root /srv/nas delete photos/a.jpg backup/a.jpg --yes
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Incremental duplicate finder for large file trees.
///
/// nasdupe keeps a persistent inventory of a directory tree in SQLite,
/// hashes only files whose size collides with another file's, and reports
/// duplicate groups with the space a cleanup would reclaim.
#[derive(Debug, Parser)]
#[command(name = "nasdupe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Emit results as JSON for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Root directory of the scanned tree
    #[arg(long, global = true, value_name = "PATH", env = "NASDUPE_ROOT")]
    pub root: Option<PathBuf>,

    /// Inventory database path (defaults to the platform data directory)
    #[arg(long, global = true, value_name = "PATH", env = "NASDUPE_DATABASE")]
    pub database: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Walk the tree, refresh the inventory, and hash duplicate candidates
    Scan,
    /// Hash pending candidates against the current inventory, without a walk
    Analyze,
    /// List duplicate groups, ordered by total wasted space
    Groups(GroupsArgs),
    /// Show aggregate inventory statistics
    Stats,
    /// Delete files by their inventory path (bytes first, then the record)
    Delete(DeleteArgs),
}

/// Arguments for the groups subcommand.
#[derive(Debug, Args)]
pub struct GroupsArgs {
    /// Show at most this many groups
    #[arg(short, long, value_name = "N")]
    pub limit: Option<usize>,
}

/// Arguments for the delete subcommand.
#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Inventory paths to delete, relative to the root
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<String>,

    /// Move files to the system trash instead of unlinking them
    #[arg(long)]
    pub trash: bool,

    /// Delete without showing the plan and asking for confirmation
    #[arg(short, long)]
    pub yes: bool,
}
