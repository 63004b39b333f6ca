use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scores below this percentage mean the work has to be redone.
pub const REDO_THRESHOLD: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceSystem {
    Canvas,
    Moodle,
}

impl SourceSystem {
    pub fn label(self) -> &'static str {
        match self {
            SourceSystem::Canvas => "Canvas",
            SourceSystem::Moodle => "Moodle",
        }
    }
}

impl fmt::Display for SourceSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentKind {
    #[default]
    Assignment,
    Quiz,
}

impl AssignmentKind {
    pub fn label(self) -> &'static str {
        match self {
            AssignmentKind::Assignment => "Assignment",
            AssignmentKind::Quiz => "Quiz",
        }
    }

    fn key(self) -> &'static str {
        match self {
            AssignmentKind::Assignment => "assignment",
            AssignmentKind::Quiz => "quiz",
        }
    }
}

impl fmt::Display for AssignmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An assignment or quiz as reported by one of the learning platforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteAssignment {
    pub source: SourceSystem,
    #[serde(default)]
    pub kind: AssignmentKind,
    pub source_id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub course_id: u64,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    /// Due date exactly as the source reported it, echoed into card metadata.
    #[serde(default)]
    pub due_raw: String,
    #[serde(default)]
    pub source_url: String,
}

/// Everything fetched from a source for one run. Also the on-disk format of
/// exported runs, so a sync can be replayed offline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentBatch {
    pub assignments: Vec<RemoteAssignment>,
    #[serde(default)]
    pub course_names: HashMap<u64, String>,
    /// Keyed by [`AssignmentBatch::grade_key`]; quiz and assignment ids share
    /// a number space.
    #[serde(default)]
    pub grades: HashMap<String, Grade>,
}

impl AssignmentBatch {
    pub fn grade_key(kind: AssignmentKind, source_id: u64) -> String {
        format!("{}:{}", kind.key(), source_id)
    }

    pub fn insert_grade(&mut self, kind: AssignmentKind, source_id: u64, grade: Grade) {
        self.grades.insert(Self::grade_key(kind, source_id), grade);
    }

    pub fn grade_for(&self, assignment: &RemoteAssignment) -> Option<&Grade> {
        self.grades.get(&Self::grade_key(assignment.kind, assignment.source_id))
    }

    pub fn course_name(&self, course_id: u64) -> String {
        self.course_names
            .get(&course_id)
            .filter(|n| !n.is_empty())
            .cloned()
            .unwrap_or_else(|| format!("Course {}", course_id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub score: f64,
    pub max_score: f64,
    #[serde(default)]
    pub graded: bool,
}

impl Grade {
    pub fn percentage(&self) -> Option<f64> {
        (self.max_score > 0.0).then(|| self.score / self.max_score * 100.0)
    }

    pub fn is_passing(&self) -> bool {
        self.percentage().is_some_and(|p| p >= REDO_THRESHOLD)
    }

    pub fn needs_redo(&self) -> bool {
        self.percentage().is_some_and(|p| p < REDO_THRESHOLD)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
}
