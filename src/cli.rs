use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::error::{AppError, AppResult};

#[derive(Parser, Debug, Clone)]
#[command(name = "boardsync", version)]
#[command(about = "Mirror school and work tasks onto a board", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List every board and its lists, live
    Boards,
    /// Re-fetch boards and lists into the local cache
    Refresh,
    /// Print the cached boards and lists
    Cache,
    /// Print the cards of one list
    Cards {
        #[arg(long)]
        board: String,
        #[arg(long)]
        list: String,
    },
    /// Move every daily card's due date to the end of tomorrow
    DailyReset,
    /// Create next week's card for every subject
    CreateWeekly,
    /// Check the Canvas credentials
    TestCanvas,
    /// Sync upcoming Canvas assignments
    SyncCanvas(SyncArgs),
    /// Check the Moodle credentials
    TestMoodle,
    /// Sync upcoming Moodle assignments and quizzes
    SyncMoodle(MoodleArgs),
    /// Sync local JIRA task folders with the JIRA board
    SyncJira {
        /// Directory holding one folder per task id
        dir: PathBuf,
    },
    /// Replace the sundown card with today's
    Sundown,
    /// Print today's sunset time
    Sunset,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SyncArgs {
    /// Show what would change without touching the board
    #[arg(long)]
    pub dry_run: bool,

    /// Also write the fetched assignments to this file
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct MoodleArgs {
    #[command(flatten)]
    pub sync: SyncArgs,

    /// Last day to include, YYYY-MM-DD (default: 14 days from today)
    #[arg(long, value_name = "DATE")]
    pub to: Option<String>,

    /// Sync from an exported file instead of the live site
    #[arg(long, value_name = "FILE")]
    pub test_data: Option<PathBuf>,
}

impl MoodleArgs {
    pub fn to_date(&self) -> AppResult<Option<NaiveDate>> {
        self.to
            .as_deref()
            .map(|raw| {
                NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                    .map_err(|_| AppError::Config(format!("invalid --to date '{}', expected YYYY-MM-DD", raw)))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_moodle_flags() {
        let cli = Cli::try_parse_from([
            "boardsync", "sync-moodle", "--to", "2025-10-01", "--dry-run", "--export", "out.json",
        ])
        .unwrap();
        let Command::SyncMoodle(args) = cli.command else {
            panic!("expected sync-moodle");
        };
        assert!(args.sync.dry_run);
        assert_eq!(args.sync.export, Some(PathBuf::from("out.json")));
        assert_eq!(args.to_date().unwrap(), NaiveDate::from_ymd_opt(2025, 10, 1));
    }

    #[test]
    fn bad_to_date_is_a_config_error() {
        let args = MoodleArgs {
            to: Some("next friday".into()),
            ..Default::default()
        };
        assert!(matches!(args.to_date(), Err(AppError::Config(_))));
    }

    #[test]
    fn cards_requires_both_names() {
        assert!(Cli::try_parse_from(["boardsync", "cards", "--board", "Mac"]).is_err());
        assert!(Cli::try_parse_from(["boardsync", "cards", "--board", "Mac", "--list", "Doing"]).is_ok());
    }
}
