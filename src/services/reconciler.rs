//! Maps one remote assignment onto at most one board card.
//!
//! Everything here is pure: the caller supplies the current card set and the
//! run's timestamp, and gets back a [`CardPlan`] describing the fields to
//! write and whether the card is created or updated.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::{Card, Grade, RemoteAssignment, SourceSystem};
use crate::services::marker::{find_by_marker, metadata_block, strip_metadata};

pub const REDO_PREFIX: &str = "REDO - ";

/// A redo gets a fresh week from the sync run, not the original deadline.
pub const REDO_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
    /// Drop assignments already graded at or above the threshold.
    pub skip_mastered: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CardAction {
    Create,
    /// The due date is always rewritten; title and description only when
    /// they differ from what the card holds.
    Update {
        card_id: String,
        title: Option<String>,
        description: Option<String>,
    },
    Skip {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardPlan {
    pub title: String,
    pub description: String,
    pub due: Option<DateTime<Utc>>,
    pub needs_redo: bool,
    pub action: CardAction,
}

pub fn needs_redo(grade: Option<&Grade>) -> bool {
    grade.is_some_and(Grade::needs_redo)
}

/// Adds or removes a single leading [`REDO_PREFIX`]. Applying it twice with
/// the same flag is a no-op.
pub fn apply_redo_prefix(title: &str, needs_redo: bool) -> String {
    match (needs_redo, title.strip_prefix(REDO_PREFIX)) {
        (true, None) => format!("{}{}", REDO_PREFIX, title),
        (false, Some(rest)) => rest.to_string(),
        _ => title.to_string(),
    }
}

pub fn card_title(course_name: &str, assignment: &RemoteAssignment, needs_redo: bool) -> String {
    apply_redo_prefix(&format!("{} - {}", course_name, assignment.title), needs_redo)
}

pub fn card_description(
    assignment: &RemoteAssignment,
    course_name: &str,
    grade: Option<&Grade>,
) -> String {
    let base = strip_metadata(&assignment.description);
    // Moodle intros arrive padded with whitespace around the HTML.
    let base = match assignment.source {
        SourceSystem::Moodle => base.trim(),
        SourceSystem::Canvas => base,
    };
    format!("{}{}", base, metadata_block(assignment, course_name, grade))
}

pub fn due_date(
    assignment: &RemoteAssignment,
    needs_redo: bool,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if needs_redo {
        Some(now + Duration::days(REDO_WINDOW_DAYS))
    } else {
        assignment.due_at
    }
}

pub fn reconcile(
    assignment: &RemoteAssignment,
    course_name: &str,
    grade: Option<&Grade>,
    existing: &[Card],
    options: ReconcileOptions,
    now: DateTime<Utc>,
) -> CardPlan {
    let redo = needs_redo(grade);
    let title = card_title(course_name, assignment, redo);
    let description = card_description(assignment, course_name, grade);
    let due = due_date(assignment, redo, now);

    let action = if options.skip_mastered && grade.is_some_and(Grade::is_passing) {
        let pct = grade.and_then(Grade::percentage).unwrap_or_default();
        CardAction::Skip {
            reason: format!("passing grade ({:.1}%)", pct),
        }
    } else {
        match find_by_marker(existing, assignment.source, assignment.kind, assignment.source_id) {
            Some(card) => CardAction::Update {
                card_id: card.id.clone(),
                title: (card.title != title).then(|| title.clone()),
                description: (card.description != description).then(|| description.clone()),
            },
            None => CardAction::Create,
        }
    };

    CardPlan {
        title,
        description,
        due,
        needs_redo: redo,
        action,
    }
}
