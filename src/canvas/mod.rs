pub mod dto;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::CanvasConfig;
use crate::error::{AppError, AppResult};
use crate::models::{AssignmentKind, Grade, RemoteAssignment, SourceSystem};

pub use dto::{CanvasAssignment, CanvasCourse, CanvasSubmission, CanvasUser};

/// Used as the max score when an assignment does not report its points.
const DEFAULT_MAX_SCORE: f64 = 100.0;

#[async_trait]
pub trait CanvasClient: Send + Sync {
    async fn current_user(&self) -> AppResult<CanvasUser>;
    async fn list_courses(&self) -> AppResult<Vec<CanvasCourse>>;
    async fn list_assignments(&self, course_id: u64) -> AppResult<Vec<CanvasAssignment>>;
    async fn get_submission(
        &self,
        course_id: u64,
        assignment_id: u64,
        user_id: u64,
    ) -> AppResult<CanvasSubmission>;
}

pub struct CanvasHttpClient {
    client: Client,
    config: CanvasConfig,
}

impl CanvasHttpClient {
    pub fn new(config: CanvasConfig, client: Client) -> Self {
        Self { client, config }
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> AppResult<T> {
        let url = format!("{}/api/v1{}", self.config.base_url, endpoint);
        debug!("Canvas GET {}", endpoint);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_token))
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(AppError::Api {
                service: "Canvas",
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| AppError::Decode(format!("Canvas {}: {}", endpoint, e)))
    }
}

#[async_trait]
impl CanvasClient for CanvasHttpClient {
    async fn current_user(&self) -> AppResult<CanvasUser> {
        self.get_json("/users/self").await
    }

    async fn list_courses(&self) -> AppResult<Vec<CanvasCourse>> {
        self.get_json("/courses?enrollment_state=active&per_page=100").await
    }

    async fn list_assignments(&self, course_id: u64) -> AppResult<Vec<CanvasAssignment>> {
        self.get_json(&format!("/courses/{}/assignments?per_page=100", course_id))
            .await
    }

    async fn get_submission(
        &self,
        course_id: u64,
        assignment_id: u64,
        user_id: u64,
    ) -> AppResult<CanvasSubmission> {
        self.get_json(&format!(
            "/courses/{}/assignments/{}/submissions/{}",
            course_id, assignment_id, user_id
        ))
        .await
    }
}

impl CanvasAssignment {
    pub fn parsed_due(&self) -> Option<DateTime<Utc>> {
        self.due_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn into_remote(self) -> RemoteAssignment {
        let due_at = self.parsed_due();
        RemoteAssignment {
            source: SourceSystem::Canvas,
            kind: AssignmentKind::Assignment,
            source_id: self.id,
            title: self.name,
            description: self.description.unwrap_or_default(),
            course_id: self.course_id,
            due_at,
            due_raw: self.due_at.unwrap_or_default(),
            source_url: self.html_url,
        }
    }
}

impl CanvasSubmission {
    /// Only a scored submission counts as a grade.
    pub fn to_grade(&self, points_possible: Option<f64>) -> Option<Grade> {
        let score = self.score?;
        Some(Grade {
            score,
            max_score: points_possible.filter(|p| *p > 0.0).unwrap_or(DEFAULT_MAX_SCORE),
            graded: self.workflow_state.as_deref() == Some("graded") || self.grade.is_some(),
        })
    }
}
