//! Resolves human-typed board and list names.
//!
//! Both sides are trimmed and lowercased. An exact match anywhere in the
//! input wins over a substring match; within each pass the first candidate
//! in input order wins.

use crate::error::{AppError, AppResult};
use crate::models::{Board, List};

pub fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

fn find_by_name<'a, T>(
    candidates: impl Iterator<Item = &'a T> + Clone,
    name_of: impl Fn(&T) -> &str,
    query: &str,
) -> Option<&'a T>
where
    T: 'a,
{
    let query = normalize(query);
    candidates
        .clone()
        .find(|c| normalize(name_of(*c)) == query)
        .or_else(|| candidates.into_iter().find(|c| normalize(name_of(*c)).contains(&query)))
}

pub fn find_board<'a>(boards: &'a [Board], query: &str) -> AppResult<&'a Board> {
    find_by_name(boards.iter(), |b| b.name.as_str(), query)
        .ok_or_else(|| AppError::not_found(format!("board '{}'", query)))
}

pub fn find_list<'a>(lists: &'a [List], board_id: &str, query: &str) -> AppResult<&'a List> {
    let on_board = lists.iter().filter(|l| l.board_id == board_id);
    find_by_name(on_board, |l| l.name.as_str(), query)
        .ok_or_else(|| AppError::not_found(format!("list '{}'", query)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(id: &str, name: &str) -> Board {
        Board { id: id.into(), name: name.into(), url: String::new() }
    }

    fn list(id: &str, name: &str, board_id: &str) -> List {
        List { id: id.into(), name: name.into(), board_id: board_id.into() }
    }

    fn boards() -> Vec<Board> {
        vec![
            board("1", "Mac's Board"),
            board("2", "Family Tasks"),
            board("3", "Work Stuff"),
            board("4", "After Work"),
        ]
    }

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize("  Family Tasks  "), "family tasks");
        assert_eq!(normalize("FAMILY TASKS"), "family tasks");
        assert_eq!(normalize("Special-Characters_123"), "special-characters_123");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        for s in ["  Mixed Case ", "\tTabbed\n", "already normal", "ÄÖÜ Umlaut"] {
            assert_eq!(normalize(&normalize(s)), normalize(s));
        }
    }

    #[test]
    fn finds_boards_case_and_whitespace_insensitively() {
        let b = boards();
        assert_eq!(find_board(&b, "MAC'S BOARD").unwrap().id, "1");
        assert_eq!(find_board(&b, "  family tasks ").unwrap().id, "2");
    }

    #[test]
    fn substring_match_is_a_fallback() {
        let b = boards();
        assert_eq!(find_board(&b, "Family").unwrap().id, "2");
        // "Work" is contained in both; first in input order wins.
        assert_eq!(find_board(&b, "work").unwrap().id, "3");
    }

    #[test]
    fn exact_match_beats_earlier_substring_match() {
        let forward = vec![board("a", "Mac's Board"), board("b", "Mac")];
        let backward = vec![board("b", "Mac"), board("a", "Mac's Board")];
        assert_eq!(find_board(&forward, "Mac").unwrap().id, "b");
        assert_eq!(find_board(&backward, "Mac").unwrap().id, "b");
    }

    #[test]
    fn missing_board_is_not_found() {
        let err = find_board(&boards(), "Nonexistent").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn lists_are_scoped_to_their_board() {
        let lists = vec![
            list("l1", "Weekly", "other"),
            list("l2", "Weekly Review", "school"),
            list("l3", "weekly", "school"),
        ];
        assert_eq!(find_list(&lists, "school", "Weekly").unwrap().id, "l3");
        assert_eq!(find_list(&lists, "school", "review").unwrap().id, "l2");
        assert!(find_list(&lists, "nowhere", "Weekly").is_err());
    }
}
