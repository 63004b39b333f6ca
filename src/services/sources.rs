use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::canvas::CanvasClient;
use crate::error::AppResult;
use crate::models::{AssignmentBatch, AssignmentKind, Grade, RemoteAssignment, SourceSystem};
use crate::moodle::MoodleClient;
use crate::services::reconciler::ReconcileOptions;

/// Where a sync run gets its assignments from.
#[async_trait]
pub trait AssignmentSource: Send + Sync {
    fn system(&self) -> SourceSystem;

    fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions::default()
    }

    /// Upcoming work with course names and whatever grades could be found.
    /// Grade and per-course failures are logged and left out.
    async fn fetch(&self, now: DateTime<Utc>) -> AppResult<AssignmentBatch>;
}

fn within(due: Option<DateTime<Utc>>, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
    due.is_some_and(|d| d > from && d < to)
}

pub struct CanvasSource {
    client: Arc<dyn CanvasClient>,
}

impl CanvasSource {
    pub const LOOKBACK_DAYS: i64 = 1;
    pub const LOOKAHEAD_DAYS: i64 = 14;

    pub fn new(client: Arc<dyn CanvasClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AssignmentSource for CanvasSource {
    fn system(&self) -> SourceSystem {
        SourceSystem::Canvas
    }

    async fn fetch(&self, now: DateTime<Utc>) -> AppResult<AssignmentBatch> {
        let user = self.client.current_user().await?;
        let courses = self.client.list_courses().await?;
        info!("Found {} Canvas courses", courses.len());

        let (from, to) = (
            now - Duration::days(Self::LOOKBACK_DAYS),
            now + Duration::days(Self::LOOKAHEAD_DAYS),
        );
        let mut batch = AssignmentBatch::default();

        for course in courses {
            batch.course_names.insert(course.id, course.name.clone());
            let assignments = match self.client.list_assignments(course.id).await {
                Ok(a) => a,
                Err(e) => {
                    warn!("failed to get assignments for course {}: {}", course.name, e);
                    continue;
                }
            };

            for assignment in assignments {
                if !within(assignment.parsed_due(), from, to) {
                    continue;
                }
                match self.client.get_submission(course.id, assignment.id, user.id).await {
                    Ok(sub) => {
                        if let Some(grade) = sub.to_grade(assignment.points_possible) {
                            batch.insert_grade(AssignmentKind::Assignment, assignment.id, grade);
                        }
                    }
                    Err(e) => warn!("failed to get submission for {}: {}", assignment.name, e),
                }
                batch.assignments.push(assignment.into_remote());
            }
        }

        info!("Found {} upcoming Canvas assignments", batch.assignments.len());
        Ok(batch)
    }
}

pub struct MoodleSource {
    client: Arc<dyn MoodleClient>,
    until: DateTime<Utc>,
    fetch_grades: bool,
}

impl MoodleSource {
    pub const SLACK_HOURS: i64 = 24;

    /// `until` is the last day of the window; anything due before the end of
    /// the following day is still picked up.
    pub fn new(client: Arc<dyn MoodleClient>, until: DateTime<Utc>, fetch_grades: bool) -> Self {
        Self {
            client,
            until,
            fetch_grades,
        }
    }

    async fn grade_for(&self, item: &RemoteAssignment, user_id: u64) -> Option<Grade> {
        if !self.fetch_grades {
            debug!("Moodle grade lookup disabled, treating {} as ungraded", item.source_id);
            return None;
        }
        match self
            .client
            .get_grade(item.source_id, item.course_id, user_id, item.kind)
            .await
        {
            Ok(grade) => grade,
            Err(e) => {
                warn!("failed to get grade for {} '{}': {}", item.kind, item.title, e);
                None
            }
        }
    }
}

#[async_trait]
impl AssignmentSource for MoodleSource {
    fn system(&self) -> SourceSystem {
        SourceSystem::Moodle
    }

    fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions { skip_mastered: true }
    }

    async fn fetch(&self, now: DateTime<Utc>) -> AppResult<AssignmentBatch> {
        let user_id = self.client.site_info().await?;
        let courses = self.client.list_courses(user_id).await?;
        let course_ids: Vec<u64> = courses.iter().map(|c| c.id).collect();
        info!("Found {} Moodle courses", courses.len());

        let (assignments, mut names) = self.client.list_assignments(&course_ids).await?;
        let quizzes = match self.client.list_quizzes(&course_ids).await {
            Ok(q) => q,
            Err(e) => {
                warn!("failed to get quizzes: {}", e);
                Vec::new()
            }
        };
        for course in &courses {
            if !course.full_name.is_empty() {
                let name = names.entry(course.id).or_default();
                if name.is_empty() {
                    name.clone_from(&course.full_name);
                }
            }
        }

        let (from, to) = (
            now - Duration::hours(Self::SLACK_HOURS),
            self.until + Duration::hours(Self::SLACK_HOURS),
        );
        let mut items: Vec<RemoteAssignment> = assignments
            .into_iter()
            .chain(quizzes)
            .filter(|a| within(a.due_at, from, to))
            .collect();
        items.sort_by_key(|a| a.due_at);

        let mut batch = AssignmentBatch {
            course_names: names,
            ..Default::default()
        };
        for item in &items {
            if let Some(grade) = self.grade_for(item, user_id).await {
                batch.insert_grade(item.kind, item.source_id, grade);
            }
        }
        batch.assignments = items;

        info!("Found {} upcoming Moodle items", batch.assignments.len());
        Ok(batch)
    }
}

/// Replays a previously exported batch.
pub struct OfflineSource {
    system: SourceSystem,
    batch: AssignmentBatch,
}

impl OfflineSource {
    pub fn new(system: SourceSystem, batch: AssignmentBatch) -> Self {
        Self { system, batch }
    }
}

#[async_trait]
impl AssignmentSource for OfflineSource {
    fn system(&self) -> SourceSystem {
        self.system
    }

    fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            skip_mastered: self.system == SourceSystem::Moodle,
        }
    }

    async fn fetch(&self, _now: DateTime<Utc>) -> AppResult<AssignmentBatch> {
        info!("Using {} offline assignments", self.batch.assignments.len());
        Ok(self.batch.clone())
    }
}
