use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::cache::{JsonFileStore, Store};
use crate::error::AppResult;
use crate::models::{AssignmentBatch, CacheSnapshot, Card, SourceSystem};
use crate::services::reconciler::{CardAction, CardPlan, reconcile};
use crate::services::sorter::{REPOSITION_DELAY, sort_list_by_due_date};
use crate::services::sources::AssignmentSource;
use crate::trello::{BoardClient, NewCard};

pub struct SyncService {
    board: Arc<dyn BoardClient>,
    cache: Arc<dyn Store<CacheSnapshot>>,
    board_name: String,
    list_name: String,
    reposition_delay: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Plan every card without writing to the board.
    pub dry_run: bool,
    /// Write the fetched batch to this file before reconciling.
    pub export: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum ItemOutcome {
    Created,
    Updated,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemReport {
    pub title: String,
    pub outcome: ItemOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub source: SourceSystem,
    pub dry_run: bool,
    pub items: Vec<ItemReport>,
    pub sorted: usize,
}

impl SyncReport {
    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|i| pred(&i.outcome)).count()
    }

    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Created))
    }

    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Updated))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Failed(_)))
    }
}

impl SyncService {
    pub fn new(
        board: Arc<dyn BoardClient>,
        cache: Arc<dyn Store<CacheSnapshot>>,
        board_name: impl Into<String>,
        list_name: impl Into<String>,
    ) -> Self {
        Self {
            board,
            cache,
            board_name: board_name.into(),
            list_name: list_name.into(),
            reposition_delay: REPOSITION_DELAY,
        }
    }

    pub fn with_reposition_delay(mut self, delay: Duration) -> Self {
        self.reposition_delay = delay;
        self
    }

    pub async fn sync(
        &self,
        source: &dyn AssignmentSource,
        options: &SyncOptions,
        now: DateTime<Utc>,
    ) -> AppResult<SyncReport> {
        info!("Starting {} sync...", source.system());
        let batch = source.fetch(now).await?;

        if let Some(path) = &options.export {
            JsonFileStore::<AssignmentBatch>::new(path).save(&batch)?;
            info!("Exported {} assignments to {}", batch.assignments.len(), path.display());
        }

        let snapshot = self.cache.load()?;
        let board = snapshot.find_board(&self.board_name)?;
        let list_id = snapshot.find_list_id(&self.board_name, &self.list_name)?;
        let mut cards = self.board.list_all_cards_on_board(&board.id).await?;

        let reconcile_options = source.reconcile_options();
        let mut items = Vec::with_capacity(batch.assignments.len());

        for assignment in &batch.assignments {
            let course_name = batch.course_name(assignment.course_id);
            let grade = batch.grade_for(assignment);
            let plan = reconcile(assignment, &course_name, grade, &cards, reconcile_options, now);

            let outcome = if options.dry_run {
                // A later item with the same marker must see the planned card.
                if plan.action == CardAction::Create {
                    cards.push(planned_card(&plan, &list_id, items.len()));
                }
                planned_outcome(&plan)
            } else {
                self.apply(&plan, &list_id, &mut cards).await
            };
            match &outcome {
                ItemOutcome::Failed(reason) => warn!("{}: {}", plan.title, reason),
                ItemOutcome::Skipped(reason) => info!("Skipping {}: {}", plan.title, reason),
                other => info!("{:?}: {}", other, plan.title),
            }
            items.push(ItemReport {
                title: plan.title,
                outcome,
            });
        }

        let sorted = if options.dry_run {
            0
        } else {
            match sort_list_by_due_date(self.board.as_ref(), &list_id, self.reposition_delay).await {
                Ok(n) => n,
                Err(e) => {
                    warn!("failed to sort cards by due date: {}", e);
                    0
                }
            }
        };

        let report = SyncReport {
            source: source.system(),
            dry_run: options.dry_run,
            items,
            sorted,
        };
        info!(
            "{} sync completed: {} created, {} updated, {} skipped, {} failed",
            report.source,
            report.created(),
            report.updated(),
            report.skipped(),
            report.failed()
        );
        Ok(report)
    }

    async fn apply(&self, plan: &CardPlan, list_id: &str, cards: &mut Vec<Card>) -> ItemOutcome {
        match &plan.action {
            CardAction::Skip { reason } => ItemOutcome::Skipped(reason.clone()),
            CardAction::Create => {
                let new_card = NewCard {
                    list_id: list_id.to_string(),
                    title: plan.title.clone(),
                    description: plan.description.clone(),
                    due: plan.due,
                };
                match self.board.create_card(&new_card).await {
                    Ok(card) => {
                        cards.push(card);
                        ItemOutcome::Created
                    }
                    Err(e) => ItemOutcome::Failed(format!("failed to create card: {}", e)),
                }
            }
            CardAction::Update {
                card_id,
                title,
                description,
            } => {
                if let Err(e) = self.board.update_card_due(card_id, plan.due, false).await {
                    return ItemOutcome::Failed(format!("failed to update due date: {}", e));
                }
                if let Some(title) = title {
                    if let Err(e) = self.board.update_card_title(card_id, title).await {
                        return ItemOutcome::Failed(format!("failed to update title: {}", e));
                    }
                }
                if let Some(description) = description {
                    if let Err(e) = self.board.update_card_description(card_id, description).await {
                        return ItemOutcome::Failed(format!("failed to update description: {}", e));
                    }
                }
                ItemOutcome::Updated
            }
        }
    }
}

fn planned_card(plan: &CardPlan, list_id: &str, index: usize) -> Card {
    Card {
        id: format!("dry-run-{}", index),
        title: plan.title.clone(),
        description: plan.description.clone(),
        url: String::new(),
        is_closed: false,
        list_id: list_id.to_string(),
        due_at: plan.due,
        due_complete: false,
    }
}

fn planned_outcome(plan: &CardPlan) -> ItemOutcome {
    match &plan.action {
        CardAction::Create => ItemOutcome::Created,
        CardAction::Update { .. } => ItemOutcome::Updated,
        CardAction::Skip { reason } => ItemOutcome::Skipped(reason.clone()),
    }
}
