pub mod board_tasks;
pub mod jira_sync;
pub mod marker;
pub mod matcher;
pub mod reconciler;
pub mod sorter;
pub mod sources;
pub mod sunset_service;
pub mod sync_service;

pub use board_tasks::{BoardListing, BoardTasks, SundownReport};
pub use jira_sync::{JiraSyncReport, JiraSyncService};
pub use sources::{AssignmentSource, CanvasSource, MoodleSource, OfflineSource};
pub use sunset_service::SunsetService;
pub use sync_service::{ItemOutcome, SyncOptions, SyncReport, SyncService};
