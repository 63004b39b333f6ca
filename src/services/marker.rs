//! Identifier markers embedded in card descriptions.
//!
//! A synced card carries `"<System> <Kind> ID: <id>"` inside a metadata
//! block appended after [`METADATA_SEPARATOR`]. The marker is the only join
//! key between a board card and its source record.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{AssignmentKind, Card, Grade, RemoteAssignment, SourceSystem};

pub const METADATA_SEPARATOR: &str = "\n\n---\n";

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(Canvas|Moodle) (Assignment|Quiz) ID: (\d+)").expect("marker regex is valid")
});

pub fn marker(system: SourceSystem, kind: AssignmentKind, id: u64) -> String {
    format!("{} {} ID: {}", system, kind, id)
}

/// Reads the first marker found in `text`.
pub fn extract_marker(text: &str) -> Option<(SourceSystem, AssignmentKind, u64)> {
    let caps = MARKER_RE.captures(text)?;
    let system = match &caps[1] {
        "Canvas" => SourceSystem::Canvas,
        _ => SourceSystem::Moodle,
    };
    let kind = match &caps[2] {
        "Quiz" => AssignmentKind::Quiz,
        _ => AssignmentKind::Assignment,
    };
    let id = caps[3].parse().ok()?;
    Some((system, kind, id))
}

/// First card whose description contains the marker. Duplicates are not
/// detected; the earliest card is treated as authoritative.
pub fn find_by_marker<'a>(
    cards: &'a [Card],
    system: SourceSystem,
    kind: AssignmentKind,
    id: u64,
) -> Option<&'a Card> {
    let needle = marker(system, kind, id);
    cards.iter().find(|c| c.description.contains(&needle))
}

/// Drops everything from the first metadata separator onwards.
pub fn strip_metadata(description: &str) -> &str {
    description
        .split_once(METADATA_SEPARATOR)
        .map_or(description, |(base, _)| base)
}

pub fn format_grade(grade: Option<&Grade>) -> String {
    match grade.and_then(|g| g.percentage().map(|p| (g, p))) {
        Some((g, p)) => {
            let mut out = format!("{:.1}%", p);
            if g.needs_redo() {
                out.push_str(" (REDO NEEDED)");
            }
            out
        }
        None => "Not graded".to_string(),
    }
}

pub fn metadata_block(
    assignment: &RemoteAssignment,
    course_name: &str,
    grade: Option<&Grade>,
) -> String {
    format!(
        "{sep}{marker}\nCourse: {course}\nOriginal Due Date: {due}\nGrade: {grade}\n{system} URL: {url}",
        sep = METADATA_SEPARATOR,
        marker = marker(assignment.source, assignment.kind, assignment.source_id),
        course = course_name,
        due = assignment.due_raw,
        grade = format_grade(grade),
        system = assignment.source,
        url = assignment.source_url,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(id: &str, description: &str) -> Card {
        Card {
            id: id.into(),
            title: format!("card {}", id),
            description: description.into(),
            url: String::new(),
            is_closed: false,
            list_id: "list".into(),
            due_at: None,
            due_complete: false,
        }
    }

    #[test]
    fn marker_shape() {
        assert_eq!(
            marker(SourceSystem::Canvas, AssignmentKind::Assignment, 12345),
            "Canvas Assignment ID: 12345"
        );
        assert_eq!(marker(SourceSystem::Moodle, AssignmentKind::Quiz, 7), "Moodle Quiz ID: 7");
    }

    #[test]
    fn extract_reads_back_marker() {
        let text = "intro\n\n---\nMoodle Quiz ID: 77\nCourse: Art";
        assert_eq!(extract_marker(text), Some((SourceSystem::Moodle, AssignmentKind::Quiz, 77)));
        assert_eq!(extract_marker("no marker here"), None);
    }

    #[test]
    fn find_by_marker_returns_first_match() {
        let cards = vec![
            card("a", "Canvas Assignment ID: 1"),
            card("b", "x\n\n---\nCanvas Assignment ID: 12345\n"),
            card("c", "Canvas Assignment ID: 12345"),
        ];
        let found = find_by_marker(&cards, SourceSystem::Canvas, AssignmentKind::Assignment, 12345);
        assert_eq!(found.map(|c| c.id.as_str()), Some("b"));
    }

    #[test]
    fn kind_and_system_are_part_of_the_key() {
        let cards = vec![card("a", "Moodle Assignment ID: 5")];
        assert!(find_by_marker(&cards, SourceSystem::Moodle, AssignmentKind::Quiz, 5).is_none());
        assert!(find_by_marker(&cards, SourceSystem::Canvas, AssignmentKind::Assignment, 5).is_none());
    }

    #[test]
    fn strip_handles_missing_and_leading_separator() {
        assert_eq!(strip_metadata("This is a regular description"), "This is a regular description");
        assert_eq!(
            strip_metadata("Assignment description\n\n---\nCanvas Assignment ID: 123\nGrade: 90%"),
            "Assignment description"
        );
        assert_eq!(strip_metadata("\n\n---\nCanvas Assignment ID: 123"), "");
    }

    #[test]
    fn grade_strings() {
        assert_eq!(format_grade(None), "Not graded");
        let good = Grade { score: 95.0, max_score: 100.0, graded: true };
        let redo = Grade { score: 85.0, max_score: 100.0, graded: true };
        let ungradable = Grade { score: 3.0, max_score: 0.0, graded: true };
        assert_eq!(format_grade(Some(&good)), "95.0%");
        assert_eq!(format_grade(Some(&redo)), "85.0% (REDO NEEDED)");
        assert_eq!(format_grade(Some(&ungradable)), "Not graded");
    }
}
