//! Command-line interface for kursadmin.
//!
//! This module provides the CLI structure for the `kursadmin` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AdminCommand, AnnounceCommand, AnnouncementTypeArg, CandidatesCommand, ConfigCommand,
    FeesCommand, SchoolCommand, WatchCommand,
};

/// kursadmin - Driving school administration panel
///
/// Post announcements, provision schools, rotate school passwords, edit
/// license fees and reset candidate counters.
#[derive(Debug, Parser)]
#[command(name = "kursadmin")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Post an announcement
    Announce(AnnounceCommand),

    /// Manage schools
    #[command(subcommand)]
    School(SchoolCommand),

    /// View or edit license fees
    #[command(subcommand)]
    Fees(FeesCommand),

    /// Manage candidate counters
    #[command(subcommand)]
    Candidates(CandidatesCommand),

    /// Print live snapshots of schools and fees until interrupted
    Watch(WatchCommand),

    /// Manage administrator accounts
    #[command(subcommand)]
    Admin(AdminCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.quiet, self.verbose)
    }
}
