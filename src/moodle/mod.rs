pub mod dto;

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::cache::{JsonFileStore, Store};
use crate::config::MoodleConfig;
use crate::error::{AppError, AppResult};
use crate::models::{AssignmentBatch, AssignmentKind, Grade, RemoteAssignment, SourceSystem};

pub use dto::MoodleCourse;

/// Assumed quiz maximum when the attempt does not say otherwise.
const FALLBACK_QUIZ_MAX: f64 = 100.0;

#[async_trait]
pub trait MoodleClient: Send + Sync {
    /// Returns the id of the user the token belongs to.
    async fn site_info(&self) -> AppResult<u64>;
    async fn list_courses(&self, user_id: u64) -> AppResult<Vec<MoodleCourse>>;
    /// Assignments of the given courses plus the course names the response carried.
    async fn list_assignments(
        &self,
        course_ids: &[u64],
    ) -> AppResult<(Vec<RemoteAssignment>, HashMap<u64, String>)>;
    async fn list_quizzes(&self, course_ids: &[u64]) -> AppResult<Vec<RemoteAssignment>>;
    async fn get_grade(
        &self,
        item_id: u64,
        course_id: u64,
        user_id: u64,
        kind: AssignmentKind,
    ) -> AppResult<Option<Grade>>;
}

pub struct MoodleHttpClient {
    client: Client,
    config: MoodleConfig,
}

impl MoodleHttpClient {
    pub fn new(config: MoodleConfig, client: Client) -> Self {
        Self { client, config }
    }

    async fn call(&self, wsfunction: &str, params: &[(String, String)]) -> AppResult<String> {
        let base = [
            ("wstoken".to_string(), self.config.token.clone()),
            ("wsfunction".to_string(), wsfunction.to_string()),
            ("moodlewsrestformat".to_string(), "json".to_string()),
        ];
        let url = Url::parse_with_params(
            &format!("{}/webservice/rest/server.php", self.config.base_url),
            base.iter().chain(params.iter()),
        )
        .map_err(|e| AppError::Config(format!("invalid Moodle URL: {}", e)))?;

        debug!("Moodle {}", wsfunction);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(AppError::Api {
                service: "Moodle",
                status: status.as_u16(),
                body,
            });
        }
        // Web service failures come back as 200 with an exception envelope.
        if body.contains("exception") && body.contains("errorcode") {
            return Err(AppError::Api {
                service: "Moodle",
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    async fn call_json<T: DeserializeOwned>(
        &self,
        wsfunction: &str,
        params: &[(String, String)],
    ) -> AppResult<T> {
        let body = self.call(wsfunction, params).await?;
        serde_json::from_str(&body).map_err(|e| AppError::Decode(format!("{}: {}", wsfunction, e)))
    }
}

fn course_params(course_ids: &[u64]) -> Vec<(String, String)> {
    course_ids
        .iter()
        .enumerate()
        .map(|(i, id)| (format!("courseids[{}]", i), id.to_string()))
        .collect()
}

fn unix_due(ts: i64) -> Option<DateTime<Utc>> {
    (ts > 0).then(|| DateTime::from_timestamp(ts, 0)).flatten()
}

fn remote(
    kind: AssignmentKind,
    id: u64,
    name: String,
    intro: String,
    course_id: u64,
    due_ts: i64,
    url: String,
) -> RemoteAssignment {
    let due_at = unix_due(due_ts);
    RemoteAssignment {
        source: SourceSystem::Moodle,
        kind,
        source_id: id,
        title: name,
        description: intro,
        course_id,
        due_raw: due_at
            .map(|d| d.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default(),
        due_at,
        source_url: url,
    }
}

fn sort_by_due(items: &mut [RemoteAssignment]) {
    items.sort_by_key(|a| a.due_at);
}

#[async_trait]
impl MoodleClient for MoodleHttpClient {
    async fn site_info(&self) -> AppResult<u64> {
        let info: dto::SiteInfo = self.call_json("core_webservice_get_site_info", &[]).await?;
        debug!("Moodle site '{}' as {}", info.sitename, info.fullname);
        Ok(info.user_id)
    }

    async fn list_courses(&self, user_id: u64) -> AppResult<Vec<MoodleCourse>> {
        self.call_json(
            "core_enrol_get_users_courses",
            &[("userid".to_string(), user_id.to_string())],
        )
        .await
    }

    async fn list_assignments(
        &self,
        course_ids: &[u64],
    ) -> AppResult<(Vec<RemoteAssignment>, HashMap<u64, String>)> {
        if course_ids.is_empty() {
            return Ok((Vec::new(), HashMap::new()));
        }
        let resp: dto::AssignmentsResponse = self
            .call_json("mod_assign_get_assignments", &course_params(course_ids))
            .await?;

        let mut names = HashMap::new();
        let mut out = Vec::new();
        for course in resp.courses {
            names.insert(course.id, course.full_name);
            for a in course.assignments {
                // The course id comes from the container, not the item.
                out.push(remote(
                    AssignmentKind::Assignment,
                    a.id,
                    a.name,
                    a.intro,
                    course.id,
                    a.due_date,
                    a.url,
                ));
            }
        }
        sort_by_due(&mut out);
        Ok((out, names))
    }

    async fn list_quizzes(&self, course_ids: &[u64]) -> AppResult<Vec<RemoteAssignment>> {
        if course_ids.is_empty() {
            return Ok(Vec::new());
        }
        let resp: dto::QuizzesResponse = self
            .call_json("mod_quiz_get_quizzes_by_courses", &course_params(course_ids))
            .await?;

        let mut out: Vec<RemoteAssignment> = resp
            .quizzes
            .into_iter()
            .map(|q| {
                remote(
                    AssignmentKind::Quiz,
                    q.id,
                    q.name,
                    q.intro,
                    q.course,
                    q.time_close,
                    q.url,
                )
            })
            .collect();
        sort_by_due(&mut out);
        Ok(out)
    }

    async fn get_grade(
        &self,
        item_id: u64,
        course_id: u64,
        user_id: u64,
        kind: AssignmentKind,
    ) -> AppResult<Option<Grade>> {
        debug!("Moodle grade lookup for {} {} in course {}", kind, item_id, course_id);
        match kind {
            AssignmentKind::Quiz => {
                let body = self
                    .call(
                        "mod_quiz_get_user_attempts",
                        &[
                            ("quizid".to_string(), item_id.to_string()),
                            ("userid".to_string(), user_id.to_string()),
                        ],
                    )
                    .await?;
                Ok(parse_quiz_grade(&body, user_id))
            }
            AssignmentKind::Assignment => {
                let body = self
                    .call(
                        "mod_assign_get_submissions",
                        &[("assignmentids[0]".to_string(), item_id.to_string())],
                    )
                    .await?;
                parse_assignment_grade(&body, user_id)
            }
        }
    }
}

/// First finished attempt of the user. An unparsable body yields no grade
/// rather than an error so one odd quiz cannot break a sync.
pub fn parse_quiz_grade(body: &str, user_id: u64) -> Option<Grade> {
    let resp: dto::QuizAttemptsResponse = match serde_json::from_str(body) {
        Ok(r) => r,
        Err(e) => {
            debug!("unparsable quiz attempts ({}): {}", e, body);
            return None;
        }
    };

    resp.attempts
        .iter()
        .filter(|a| a.user_id == user_id && a.state == "finished")
        .find_map(|a| {
            let score = a.sum_grades?;
            let max = a
                .quiz
                .as_ref()
                .and_then(|q| q.get("sumgrades"))
                .and_then(|v| v.as_f64())
                .filter(|m| *m > 0.0)
                .unwrap_or(FALLBACK_QUIZ_MAX);
            Some(Grade {
                score,
                max_score: max,
                graded: true,
            })
        })
}

pub fn parse_assignment_grade(body: &str, user_id: u64) -> AppResult<Option<Grade>> {
    let resp: dto::SubmissionsResponse = serde_json::from_str(body)
        .map_err(|e| AppError::Decode(format!("assignment submissions: {}", e)))?;

    let grade = resp
        .assignments
        .iter()
        .flat_map(|a| a.submissions.iter())
        .find(|s| s.user_id == user_id && s.grade.is_some())
        .map(|s| {
            let raw = s.grade.as_deref().unwrap_or_default().trim();
            let score = raw.trim_end_matches('%').trim().parse::<f64>().unwrap_or(0.0);
            Grade {
                score,
                max_score: s.assignment.as_ref().map(|a| a.grade).unwrap_or(0.0),
                graded: s.status == "graded" || !raw.is_empty(),
            }
        });
    Ok(grade)
}

/// Reads a batch written by `sync-moodle --export`.
pub fn load_test_data(path: &Path) -> AppResult<AssignmentBatch> {
    let batch = JsonFileStore::<AssignmentBatch>::new(path).load()?;
    if batch.assignments.iter().any(|a| a.source != SourceSystem::Moodle) {
        return Err(AppError::Config(format!(
            "{} contains non-Moodle assignments",
            path.display()
        )));
    }
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiz_grade_defaults_max_to_one_hundred() {
        let body = r#"{"attempts":[
            {"userid":9,"sumgrades":7.5,"state":"finished"},
            {"userid":3,"sumgrades":80.0,"state":"inprogress"},
            {"userid":3,"sumgrades":72.0,"state":"finished"}
        ]}"#;
        let grade = parse_quiz_grade(body, 3).unwrap();
        assert_eq!(grade.score, 72.0);
        assert_eq!(grade.max_score, 100.0);
    }

    #[test]
    fn quiz_grade_uses_quiz_sum_when_present() {
        let body = r#"{"attempts":[{"userid":3,"sumgrades":9.0,"state":"finished","quiz":{"sumgrades":10.0}}]}"#;
        let grade = parse_quiz_grade(body, 3).unwrap();
        assert_eq!(grade.percentage(), Some(90.0));
    }

    #[test]
    fn quiz_garbage_is_no_grade() {
        assert_eq!(parse_quiz_grade("<html>", 3), None);
    }

    #[test]
    fn assignment_grade_accepts_percent_suffix() {
        let body = r#"{"assignments":[{"submissions":[
            {"userid":3,"grade":"45%","status":"graded","assignment":{"grade":50.0}}
        ]}]}"#;
        let grade = parse_assignment_grade(body, 3).unwrap().unwrap();
        assert_eq!(grade.score, 45.0);
        assert_eq!(grade.max_score, 50.0);
        assert!(!grade.needs_redo() && grade.is_passing());
    }

    #[test]
    fn assignment_grade_for_other_user_is_absent() {
        let body = r#"{"assignments":[{"submissions":[{"userid":8,"grade":"10"}]}]}"#;
        assert_eq!(parse_assignment_grade(body, 3).unwrap(), None);
        assert!(parse_assignment_grade("nope", 3).is_err());
    }

    #[test]
    fn zero_due_date_means_undated() {
        let a = remote(AssignmentKind::Quiz, 1, "q".into(), " x ".into(), 2, 0, String::new());
        assert_eq!(a.due_at, None);
        assert_eq!(a.due_raw, "");
        let b = remote(AssignmentKind::Quiz, 1, "q".into(), String::new(), 2, 1_758_391_200, String::new());
        assert_eq!(b.due_raw, "2025-09-20T18:00:00Z");
    }
}
