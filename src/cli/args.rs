use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use timeledger_domain::MonthKey;
use uuid::Uuid;

/// Timeledger - money and time, month by month
#[derive(Debug, Parser)]
#[command(name = "timeledger_cli", version, about, long_about = None)]
pub struct Cli {
    /// Base directory for settings and backups (defaults to the platform data dir)
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Only print warnings and errors on stderr
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Disable coloured status lines
    #[arg(long, global = true)]
    pub plain: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args, Clone, Default)]
pub struct WindowArgs {
    /// First month of the window (YYYY-MM)
    #[arg(long)]
    pub from: Option<MonthKey>,
    /// Last month of the window (YYYY-MM)
    #[arg(long)]
    pub to: Option<MonthKey>,
    /// Recurring rows stop expanding after this day (YYYY-MM-DD); defaults to today
    #[arg(long)]
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compare a stored scenario against the baseline
    Evaluate {
        /// Dataset file (falls back to the configured default dataset)
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        scenario: Uuid,
        #[command(flatten)]
        window: WindowArgs,
    },

    /// Compare an ad-hoc scenario file against the baseline
    Preview {
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(long)]
        user: Uuid,
        /// JSON scenario body
        #[arg(long)]
        scenario_file: PathBuf,
        #[command(flatten)]
        window: WindowArgs,
    },

    /// Run the baseline pipeline only
    Aggregate {
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(long)]
        user: Uuid,
        #[command(flatten)]
        window: WindowArgs,
    },

    /// Evaluate every active alert rule for one month
    Alerts {
        #[arg(long)]
        data: Option<PathBuf>,
        /// Month to evaluate (YYYY-MM)
        #[arg(long)]
        month: MonthKey,
    },

    /// Inspect or manage engine settings
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Show build metadata
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the active settings as JSON
    Show,
    /// Write default settings if none exist yet
    Init {
        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },
    /// Snapshot the current settings
    Backup {
        #[arg(long)]
        note: Option<String>,
    },
    /// List settings backups, newest first
    Backups,
    /// Restore settings from a backup file name
    Restore { name: String },
}
