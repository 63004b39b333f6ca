use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, TimeZone};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::jira::{self, IssueTracker, JiraTask};
use crate::models::{Card, List};
use crate::services::matcher;
use crate::trello::{BoardClient, NewCard};

pub const BUG_LABEL_COLOR: &str = "red";

pub struct JiraSyncService {
    board: Arc<dyn BoardClient>,
    tracker: Arc<dyn IssueTracker>,
    board_name: String,
    browse_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JiraSyncReport {
    pub tasks: usize,
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Collapses a repeated `"<ID>: "` prefix left behind by older syncs.
pub fn dedupe_title(title: &str, task_id: &str) -> Option<String> {
    let prefix = format!("{}:", task_id);
    (title.matches(&prefix).count() > 1).then(|| title.replacen(&format!("{} ", prefix), "", 1))
}

pub fn new_card_title(task: &JiraTask) -> String {
    if task.title.starts_with(&format!("{}:", task.id)) {
        task.title.clone()
    } else {
        format!("{}: {}", task.id, task.title)
    }
}

pub fn card_description(task: &JiraTask, browse_url: Option<&str>, synced_at: &str) -> String {
    let mut desc = format!("**JIRA Task ID**: {}\n\n", task.id);

    if !task.status.is_empty() {
        let _ = write!(desc, "**Current Status**: {}\n\n", task.status);
    }

    if !task.jira_status.is_empty() || !task.priority.is_empty() || !task.issue_type.is_empty() {
        desc.push_str("**JIRA Info**:\n");
        for (label, value) in [
            ("Status", &task.jira_status),
            ("Priority", &task.priority),
            ("Type", &task.issue_type),
        ] {
            if !value.is_empty() {
                let _ = writeln!(desc, "- {}: {}", label, value);
            }
        }
        desc.push('\n');
    }

    for (heading, body) in [("Next Steps", &task.next_steps), ("Key Findings", &task.key_findings)] {
        if !body.is_empty() {
            let _ = write!(desc, "**{}**:\n{}\n\n", heading, body);
        }
    }

    let mut links = Vec::new();
    if let Some(base) = browse_url {
        links.push(format!("- [JIRA Ticket]({}/{})", base, task.id));
    }
    if let Some(pr) = &task.pr_link {
        links.push(format!("- [Related PR]({})", pr));
    }
    if !links.is_empty() {
        let _ = writeln!(desc, "**Links**:\n{}", links.join("\n"));
    }

    let _ = write!(desc, "\n---\n*Last synced: {}*", synced_at);
    desc
}

/// Moves an issue towards `target`. When the tracker refuses the name as
/// given, the closest state it offers is tried instead. `Ok(None)` means
/// nothing suitable was offered.
pub async fn transition(
    tracker: &dyn IssueTracker,
    issue_id: &str,
    target: &str,
) -> AppResult<Option<String>> {
    let first = tracker.move_issue(issue_id, target).await?;
    if first.success {
        return Ok(Some(target.to_string()));
    }

    let Some(best) = jira::best_state(&first.available_states, target) else {
        info!("No suitable JIRA transition for {} to '{}'", issue_id, target);
        return Ok(None);
    };

    info!("Moving {} to '{}' instead of '{}'", issue_id, best, target);
    let second = tracker.move_issue(issue_id, &best).await?;
    if !second.success {
        return Err(AppError::Command(format!("failed to move {} to '{}'", issue_id, best)));
    }
    Ok(Some(best))
}

impl JiraSyncService {
    pub fn new(
        board: Arc<dyn BoardClient>,
        tracker: Arc<dyn IssueTracker>,
        board_name: impl Into<String>,
        browse_url: Option<String>,
    ) -> Self {
        Self {
            board,
            tracker,
            board_name: board_name.into(),
            browse_url,
        }
    }

    pub async fn sync<Tz>(&self, tasks_dir: &Path, now: &DateTime<Tz>) -> AppResult<JiraSyncReport>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        info!("Syncing JIRA tasks from {}", tasks_dir.display());

        let boards = self.board.list_boards().await?;
        let board = matcher::find_board(&boards, &self.board_name)?;
        let lists = self.board.list_lists(&board.id).await?;
        let default_list = lists
            .first()
            .ok_or_else(|| AppError::not_found(format!("lists on board '{}'", board.name)))?;
        let cards = self.board.list_all_cards_on_board(&board.id).await?;

        let tasks = jira::load_tasks(tasks_dir)?;
        info!("Found {} JIRA tasks", tasks.len());

        let synced_at = now.format("%Y-%m-%d %H:%M").to_string();
        let mut report = JiraSyncReport {
            tasks: tasks.len(),
            ..Default::default()
        };

        for task in &tasks {
            let description = card_description(task, self.browse_url.as_deref(), &synced_at);
            match cards.iter().find(|c| c.title.contains(&task.id)) {
                Some(card) => {
                    match self.update_existing(task, card, &lists, tasks_dir, &description).await {
                        Ok(()) => report.updated += 1,
                        Err(e) => {
                            warn!("failed to update card for {}: {}", task.id, e);
                            report.failed += 1;
                        }
                    }
                }
                None => match self.create(task, &default_list.id, description).await {
                    Ok(()) => report.created += 1,
                    Err(e) => {
                        warn!("failed to create card for {}: {}", task.id, e);
                        report.failed += 1;
                    }
                },
            }
        }

        info!(
            "JIRA sync completed: {} created, {} updated",
            report.created, report.updated
        );
        Ok(report)
    }

    /// Only the description write decides success; the rest is best effort.
    async fn update_existing(
        &self,
        task: &JiraTask,
        card: &Card,
        lists: &[List],
        tasks_dir: &Path,
        description: &str,
    ) -> AppResult<()> {
        if let Some(fixed) = dedupe_title(&card.title, &task.id) {
            match self.board.update_card_title(&card.id, &fixed).await {
                Ok(()) => info!("Fixed duplicate title on {}", task.id),
                Err(e) => warn!("failed to fix card title for {}: {}", task.id, e),
            }
        }

        if let Some(list) = lists.iter().find(|l| l.id == card.list_id) {
            let status = jira::local_status_for_list(&list.name);
            match jira::write_local_status(tasks_dir, &task.id, &status) {
                Ok(()) => info!("{} local status is now {} (from {})", task.id, status, list.name),
                Err(e) => warn!("failed to update local status for {}: {}", task.id, e),
            }

            if let Some(target) = jira::tracker_state_for_list(&list.name) {
                if let Err(e) = transition(self.tracker.as_ref(), &task.id, target).await {
                    warn!("failed to update JIRA status for {}: {}", task.id, e);
                }
            }
        }

        self.board.update_card_description(&card.id, description).await?;

        if task.is_bug() {
            if let Err(e) = self.board.add_label(&card.id, BUG_LABEL_COLOR).await {
                warn!("failed to add bug label to {}: {}", task.id, e);
            }
        }
        Ok(())
    }

    async fn create(&self, task: &JiraTask, list_id: &str, description: String) -> AppResult<()> {
        let card = self
            .board
            .create_card(&NewCard {
                list_id: list_id.to_string(),
                title: new_card_title(task),
                description,
                due: None,
            })
            .await?;

        if task.is_bug() {
            if let Err(e) = self.board.add_label(&card.id, BUG_LABEL_COLOR).await {
                warn!("failed to add bug label to {}: {}", task.id, e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> JiraTask {
        JiraTask {
            id: "AK-12".into(),
            title: "Fix login".into(),
            status: "🔄 IN PROGRESS".into(),
            priority: "High".into(),
            pr_link: Some("https://github.com/acme/app/pull/7".into()),
            ..Default::default()
        }
    }

    #[test]
    fn duplicate_prefix_is_collapsed_once() {
        assert_eq!(dedupe_title("AK-12: AK-12: Fix login", "AK-12").as_deref(), Some("AK-12: Fix login"));
        assert_eq!(dedupe_title("AK-12: Fix login", "AK-12"), None);
    }

    #[test]
    fn new_title_is_prefixed_once() {
        assert_eq!(new_card_title(&task()), "AK-12: Fix login");
        let mut t = task();
        t.title = "AK-12: Fix login".into();
        assert_eq!(new_card_title(&t), "AK-12: Fix login");
    }

    #[test]
    fn description_layout() {
        let d = card_description(&task(), Some("https://acme.atlassian.net/browse"), "2025-09-15 08:30");
        assert_eq!(
            d,
            "**JIRA Task ID**: AK-12\n\n\
             **Current Status**: 🔄 IN PROGRESS\n\n\
             **JIRA Info**:\n- Priority: High\n\n\
             **Links**:\n- [JIRA Ticket](https://acme.atlassian.net/browse/AK-12)\n\
             - [Related PR](https://github.com/acme/app/pull/7)\n\
             \n---\n*Last synced: 2025-09-15 08:30*"
        );
    }
}
