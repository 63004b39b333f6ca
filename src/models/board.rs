use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::services::matcher;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct List {
    pub id: String,
    pub name: String,
    #[serde(rename = "idBoard")]
    pub board_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    #[serde(rename = "name")]
    pub title: String,
    #[serde(rename = "desc", default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "closed", default)]
    pub is_closed: bool,
    #[serde(rename = "idList", default)]
    pub list_id: String,
    #[serde(rename = "due", default)]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(rename = "dueComplete", default)]
    pub due_complete: bool,
}

/// Boards and lists persisted between runs so names can be resolved
/// without a round trip. Written and read as a whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub boards: Vec<Board>,
    pub lists: Vec<List>,
}

impl CacheSnapshot {
    pub fn lists_for<'a>(&'a self, board_id: &'a str) -> impl Iterator<Item = &'a List> + 'a {
        self.lists.iter().filter(move |l| l.board_id == board_id)
    }

    pub fn find_board(&self, board_name: &str) -> AppResult<&Board> {
        matcher::find_board(&self.boards, board_name)
    }

    /// Resolves `(board, list)` names to the list id.
    pub fn find_list_id(&self, board_name: &str, list_name: &str) -> AppResult<String> {
        let board = self.find_board(board_name)?;
        let list = matcher::find_list(&self.lists, &board.id, list_name).map_err(|_| {
            AppError::not_found(format!("list '{}' in board '{}'", list_name, board.name))
        })?;
        Ok(list.id.clone())
    }
}
