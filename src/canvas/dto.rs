use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct CanvasUser {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub login_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CanvasCourse {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "course_code", default)]
    pub code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CanvasAssignment {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_at: Option<String>,
    pub course_id: u64,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub points_possible: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CanvasSubmission {
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub workflow_state: Option<String>,
}
