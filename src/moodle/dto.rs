use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct SiteInfo {
    #[serde(rename = "userid")]
    pub user_id: u64,
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub sitename: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoodleCourse {
    pub id: u64,
    #[serde(rename = "fullname", default)]
    pub full_name: String,
    #[serde(rename = "shortname", default)]
    pub short_name: String,
}

#[derive(Debug, Deserialize)]
pub struct AssignmentsResponse {
    #[serde(default)]
    pub courses: Vec<CourseAssignments>,
}

#[derive(Debug, Deserialize)]
pub struct CourseAssignments {
    pub id: u64,
    #[serde(rename = "fullname", default)]
    pub full_name: String,
    #[serde(default)]
    pub assignments: Vec<MoodleAssignment>,
}

#[derive(Debug, Deserialize)]
pub struct MoodleAssignment {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub intro: String,
    #[serde(rename = "duedate", default)]
    pub due_date: i64,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct QuizzesResponse {
    #[serde(default)]
    pub quizzes: Vec<MoodleQuiz>,
}

#[derive(Debug, Deserialize)]
pub struct MoodleQuiz {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub intro: String,
    pub course: u64,
    #[serde(rename = "timeclose", default)]
    pub time_close: i64,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct QuizAttemptsResponse {
    #[serde(default)]
    pub attempts: Vec<QuizAttempt>,
}

#[derive(Debug, Deserialize)]
pub struct QuizAttempt {
    #[serde(rename = "userid")]
    pub user_id: u64,
    #[serde(rename = "sumgrades", default)]
    pub sum_grades: Option<f64>,
    #[serde(default)]
    pub state: String,
    /// Shape varies between sites; only `sumgrades` is read from it.
    #[serde(default)]
    pub quiz: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct SubmissionsResponse {
    #[serde(default)]
    pub assignments: Vec<AssignmentSubmissions>,
}

#[derive(Debug, Deserialize)]
pub struct AssignmentSubmissions {
    #[serde(default)]
    pub submissions: Vec<Submission>,
}

#[derive(Debug, Deserialize)]
pub struct Submission {
    #[serde(rename = "userid")]
    pub user_id: u64,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub assignment: Option<SubmissionAssignment>,
}

#[derive(Debug, Deserialize)]
pub struct SubmissionAssignment {
    #[serde(default)]
    pub grade: f64,
}
