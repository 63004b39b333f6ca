use std::env;
use std::path::PathBuf;

use crate::error::{AppError, AppResult};
use crate::models::GeoLocation;

const DEFAULT_TRELLO_BASE_URL: &str = "https://api.trello.com/1";
const DEFAULT_LAT: f64 = 40.2969;
const DEFAULT_LNG: f64 = -111.6946;

fn required(key: &str) -> AppResult<String> {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Config(format!("{} is not set", key)))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn or_default(key: &str, default: &str) -> String {
    optional(key).unwrap_or_else(|| default.to_string())
}

fn parse_f64(key: &str, default: f64) -> AppResult<f64> {
    match optional(key) {
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|_| AppError::Config(format!("{} is not a number: {}", key, raw))),
        None => Ok(default),
    }
}

fn parse_bool(key: &str) -> bool {
    optional(key)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

#[derive(Clone, Debug)]
pub struct TrelloConfig {
    pub api_key: String,
    pub api_token: String,
    pub base_url: String,
}

impl TrelloConfig {
    pub fn new_from_env() -> AppResult<Self> {
        Ok(Self {
            api_key: required("TRELLO_API_KEY")?,
            api_token: required("TRELLO_API_TOKEN")?,
            base_url: or_default("TRELLO_BASE_URL", DEFAULT_TRELLO_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

#[derive(Clone, Debug)]
pub struct CanvasConfig {
    pub api_token: String,
    pub base_url: String,
}

impl CanvasConfig {
    pub fn new_from_env() -> AppResult<Self> {
        Ok(Self {
            api_token: required("CANVAS_API_TOKEN")?,
            base_url: required("CANVAS_BASE_URL")?.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Clone, Debug)]
pub struct MoodleConfig {
    pub base_url: String,
    pub token: String,
    /// Grade lookups stay off unless explicitly enabled.
    pub fetch_grades: bool,
}

impl MoodleConfig {
    pub fn new_from_env() -> AppResult<Self> {
        Ok(Self {
            base_url: required("MOODLE_BASE_URL")?.trim_end_matches('/').to_string(),
            token: required("MOODLE_TOKEN")?,
            fetch_grades: parse_bool("MOODLE_FETCH_GRADES"),
        })
    }
}

/// Board/list names and local file locations shared by every operation.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    pub school_board: String,
    pub weekly_list: String,
    pub daily_list: String,
    pub jira_board: String,
    pub sundown_board: String,
    pub sundown_list: String,
    pub sundown_mention: Option<String>,
    pub jira_browse_url: Option<String>,
    pub board_cache_file: PathBuf,
    pub sunset_cache_file: PathBuf,
    pub subjects_file: PathBuf,
    pub location: GeoLocation,
}

impl SyncConfig {
    pub fn new_from_env() -> AppResult<Self> {
        let school_board = or_default("SCHOOL_BOARD", "Makai School");
        Ok(Self {
            weekly_list: or_default("WEEKLY_LIST", "Weekly"),
            daily_list: or_default("DAILY_LIST", "Daily"),
            jira_board: or_default("JIRA_BOARD", "Mac"),
            sundown_board: optional("SUNDOWN_BOARD").unwrap_or_else(|| school_board.clone()),
            sundown_list: or_default("SUNDOWN_LIST", "Sundown Notification (DO NOT ALTER)"),
            sundown_mention: optional("SUNDOWN_MENTION"),
            jira_browse_url: optional("JIRA_BROWSE_URL")
                .map(|u| u.trim_end_matches('/').to_string()),
            board_cache_file: PathBuf::from(or_default("BOARD_CACHE_FILE", "trello_cache.json")),
            sunset_cache_file: PathBuf::from(or_default("SUNSET_CACHE_FILE", "sunset_cache.json")),
            subjects_file: PathBuf::from(or_default("SUBJECTS_FILE", "subjects.json")),
            location: GeoLocation {
                latitude: parse_f64("SUNSET_LAT", DEFAULT_LAT)?,
                longitude: parse_f64("SUNSET_LNG", DEFAULT_LNG)?,
            },
            school_board,
        })
    }
}
