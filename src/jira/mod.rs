//! Local JIRA task folders and the `jira` command line tool.
//!
//! A tasks directory holds one folder per issue id, each with a `STATUS.md`
//! and an `<ID>.md`. Both are free-form markdown; only a handful of headings
//! and bullet fields are read.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::{NoExpand, Regex};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};

pub const STATUS_FILE: &str = "STATUS.md";
pub const DEFAULT_TITLE: &str = "JIRA Task";

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static regex is valid")
}

static CURRENT_STATUS_RE: LazyLock<Regex> = LazyLock::new(|| re(r"## Current Status:\s*(.+)"));
static NEXT_STEPS_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(?s)## Next Steps:(.*?)(?:## |$)"));
static KEY_FINDINGS_RE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?s)## Key Findings:(.*?)(?:## |$)"));
static JIRA_STATUS_RE: LazyLock<Regex> = LazyLock::new(|| re(r"- \*\*JIRA Status\*\*:\s*(.+)"));
static PRIORITY_RE: LazyLock<Regex> = LazyLock::new(|| re(r"- \*\*Priority\*\*:\s*(.+)"));
static ISSUE_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| re(r"- \*\*Issue Type\*\*:\s*(.+)"));
static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| re(r"# (.+)"));
static HEADING_LINE_RE: LazyLock<Regex> = LazyLock::new(|| re(r"(# [^\n]+\n)"));
static QUOTED_RE: LazyLock<Regex> = LazyLock::new(|| re(r"'([^']*)'"));
static PR_LINK_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"- 📋 \[Related PR\]\(([^)]+)\)",
        r"- 📋 \[PR\]\(([^)]+)\)",
        r"- \[PR\]\(([^)]+)\)",
        r"- \[Related PR\]\(([^)]+)\)",
    ]
    .into_iter()
    .map(re)
    .collect()
});
static GITHUB_PR_RE: LazyLock<Regex> = LazyLock::new(|| re(r"https://github\.com/[^\s)]+/pull/\d+"));

const PR_PLACEHOLDERS: [&str; 2] = ["#", "<!-- Add PR link when created -->"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JiraTask {
    pub id: String,
    pub title: String,
    pub status: String,
    pub next_steps: String,
    pub key_findings: String,
    pub jira_status: String,
    pub priority: String,
    pub issue_type: String,
    pub pr_link: Option<String>,
}

impl JiraTask {
    /// Some trackers file bugs under the priority field.
    pub fn is_bug(&self) -> bool {
        self.issue_type.eq_ignore_ascii_case("bug") || self.priority.eq_ignore_ascii_case("bug")
    }
}

fn capture(re: &Regex, text: &str) -> String {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

fn pr_link(status: &str) -> Option<String> {
    let link = PR_LINK_RES.iter().find_map(|re| {
        let link = capture(re, status);
        (!link.is_empty() && !PR_PLACEHOLDERS.contains(&link.as_str())).then_some(link)
    });
    link.or_else(|| GITHUB_PR_RE.find(status).map(|m| m.as_str().to_string()))
}

/// Builds a task from the contents of its two files, either of which may be missing.
pub fn parse_task(id: &str, status_md: Option<&str>, task_md: Option<&str>) -> JiraTask {
    let mut task = JiraTask {
        id: id.to_string(),
        ..Default::default()
    };

    if let Some(status) = status_md {
        task.status = capture(&CURRENT_STATUS_RE, status);
        task.next_steps = capture(&NEXT_STEPS_RE, status);
        task.key_findings = capture(&KEY_FINDINGS_RE, status);
        task.jira_status = capture(&JIRA_STATUS_RE, status);
        task.priority = capture(&PRIORITY_RE, status);
        task.issue_type = capture(&ISSUE_TYPE_RE, status);
        task.pr_link = pr_link(status);
    }

    if let Some(body) = task_md {
        task.title = capture(&TITLE_RE, body);
    }
    if task.title.is_empty() {
        task.title = DEFAULT_TITLE.to_string();
    }
    task
}

/// Reads every task folder under `dir`, ordered by id.
pub fn load_tasks(dir: &Path) -> AppResult<Vec<JiraTask>> {
    let mut ids: Vec<String> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter_map(|e| e.file_name().into_string().ok())
        .collect();
    ids.sort();

    Ok(ids
        .into_iter()
        .map(|id| {
            let folder = dir.join(&id);
            let status = fs::read_to_string(folder.join(STATUS_FILE)).ok();
            let body = fs::read_to_string(folder.join(format!("{}.md", id))).ok();
            parse_task(&id, status.as_deref(), body.as_deref())
        })
        .collect())
}

/// Rewrites the `## Current Status:` line, or inserts one after the first
/// heading when the file has none.
pub fn replace_status(content: &str, new_status: &str) -> String {
    let line = format!("## Current Status: {}", new_status);
    if CURRENT_STATUS_RE.is_match(content) {
        CURRENT_STATUS_RE.replace_all(content, NoExpand(&line)).into_owned()
    } else {
        HEADING_LINE_RE
            .replacen(content, 1, |caps: &regex::Captures| format!("{}\n{}\n", &caps[1], line))
            .into_owned()
    }
}

pub fn write_local_status(dir: &Path, id: &str, new_status: &str) -> AppResult<()> {
    let path = dir.join(id).join(STATUS_FILE);
    let content = fs::read_to_string(&path)?;
    fs::write(&path, replace_status(&content, new_status))?;
    Ok(())
}

/// Status line written back into STATUS.md for a board list.
pub fn local_status_for_list(list_name: &str) -> String {
    match list_name.to_lowercase().as_str() {
        "sprint" | "backlog" | "to do" | "todo" => "🎯 PLANNED".to_string(),
        "doing" | "in progress" => "🔄 IN PROGRESS".to_string(),
        "in review" | "code review" | "review" => "👀 IN REVIEW".to_string(),
        "done" | "completed" => "✅ COMPLETED".to_string(),
        _ => format!("🔄 {}", list_name.to_uppercase()),
    }
}

/// Tracker state a board list implies. Finished work is closed by hand.
pub fn tracker_state_for_list(list_name: &str) -> Option<&'static str> {
    match list_name.to_lowercase().as_str() {
        "sprint" | "backlog" | "to do" | "todo" => Some("Open"),
        "doing" | "in progress" | "in review" | "code review" | "review" => Some("In Progress"),
        _ => None,
    }
}

/// States listed on the first "Available states ...: 'A', 'B'" line.
pub fn parse_available_states(output: &str) -> Vec<String> {
    output
        .lines()
        .find(|l| l.contains("Available states"))
        .and_then(|l| l.split_once(':'))
        .map(|(_, rest)| {
            QUOTED_RE
                .captures_iter(rest)
                .map(|c| c[1].to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn candidates_for(target: &str) -> &'static [&'static str] {
    match target.to_lowercase().as_str() {
        "open" => &[
            "need requirements",
            "started development",
            "development started",
            "fix in progress",
            "in progress",
            "start",
            "begin",
        ],
        "in progress" => &[
            "fix in progress",
            "started development",
            "development started",
            "in progress",
            "progress",
            "working",
        ],
        "done" => &[
            "resolve issue",
            "close",
            "done",
            "complete",
            "finish",
            "resolved",
            "closed",
            "finished",
        ],
        _ => &[],
    }
}

/// Candidate order wins over the order the tracker lists its states in.
pub fn best_state(available: &[String], target: &str) -> Option<String> {
    candidates_for(target).iter().find_map(|candidate| {
        available
            .iter()
            .find(|s| s.to_lowercase().contains(candidate))
            .cloned()
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoveOutcome {
    pub success: bool,
    /// Reported by the tracker when the move was refused.
    pub available_states: Vec<String>,
}

#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn move_issue(&self, issue_id: &str, state: &str) -> AppResult<MoveOutcome>;
}

/// Shells out to `jira issue move <id> <state>`.
pub struct JiraCli {
    program: String,
}

impl JiraCli {
    pub fn new() -> Self {
        Self {
            program: "jira".to_string(),
        }
    }
}

impl Default for JiraCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IssueTracker for JiraCli {
    async fn move_issue(&self, issue_id: &str, state: &str) -> AppResult<MoveOutcome> {
        debug!("{} issue move {} '{}'", self.program, issue_id, state);
        let output = Command::new(&self.program)
            .args(["issue", "move", issue_id, state])
            .output()
            .await
            .map_err(|e| AppError::Command(format!("failed to run {}: {}", self.program, e)))?;

        if output.status.success() {
            return Ok(MoveOutcome {
                success: true,
                available_states: Vec::new(),
            });
        }

        let combined = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        let available_states = parse_available_states(&combined);
        if available_states.is_empty() {
            warn!("{} move of {} failed: {}", self.program, issue_id, combined.trim());
        }
        Ok(MoveOutcome {
            success: false,
            available_states,
        })
    }
}
