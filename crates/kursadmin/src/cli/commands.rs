//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::model::{AnnouncementType, ClassCode};

/// Announce command arguments.
#[derive(Debug, Args)]
pub struct AnnounceCommand {
    /// Announcement text
    pub content: String,

    /// Announcement category
    #[arg(short = 't', long = "type", value_enum, default_value = "meeting")]
    pub kind: AnnouncementTypeArg,
}

/// School management commands.
#[derive(Debug, Subcommand)]
pub enum SchoolCommand {
    /// Provision a new school and its sign-in identity
    Add {
        /// School name
        name: String,

        /// Sign-in email for the school
        email: String,

        /// Initial password
        #[arg(short, long)]
        password: String,
    },

    /// List provisioned schools
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Change a school's password
    Password {
        /// Id of the school (see `school list`)
        #[arg(short, long = "school", allow_hyphen_values = true)]
        school_id: String,

        /// The new password
        #[arg(short, long)]
        new_password: String,

        /// The administrator's current password (defaults to `admin.password`)
        #[arg(short, long)]
        admin_password: Option<String>,
    },
}

/// License fee commands.
#[derive(Debug, Subcommand)]
pub enum FeesCommand {
    /// Show the license fee table
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Set the fee for one license class
    Set {
        /// License class code (e.g. B, A1, FARK_A1)
        code: ClassCode,

        /// Fee amount in TL
        #[arg(allow_negative_numbers = true)]
        amount: f64,
    },
}

/// Candidate counter commands.
#[derive(Debug, Subcommand)]
pub enum CandidatesCommand {
    /// Reset the candidate counters of every school to zero
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Watch command arguments.
#[derive(Debug, Args)]
pub struct WatchCommand {
    /// Output each snapshot as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Administrator account commands.
#[derive(Debug, Subcommand)]
pub enum AdminCommand {
    /// Create an administrator identity
    Create {
        /// Administrator email
        email: String,

        /// Administrator password
        #[arg(short, long)]
        password: String,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Announcement category argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum AnnouncementTypeArg {
    /// Meeting notice
    #[default]
    Meeting,
    /// Fee collection notice
    FeeCollection,
    /// Price update notice
    PriceUpdate,
}

impl From<AnnouncementTypeArg> for AnnouncementType {
    fn from(arg: AnnouncementTypeArg) -> Self {
        match arg {
            AnnouncementTypeArg::Meeting => Self::Meeting,
            AnnouncementTypeArg::FeeCollection => Self::FeeCollection,
            AnnouncementTypeArg::PriceUpdate => Self::PriceUpdate,
        }
    }
}
