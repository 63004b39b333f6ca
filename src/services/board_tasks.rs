use std::fmt::Display;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::cache::Store;
use crate::config::SyncConfig;
use crate::error::{AppError, AppResult};
use crate::models::{Board, CacheSnapshot, Card, List, Quarter, SubjectsConfig};
use crate::services::sunset_service::SunsetService;
use crate::trello::{BoardClient, NewCard};

const SUNDOWN_TITLE_DATE: &str = "%A, %B %-d, %Y";

/// Card-level chores on the board that are not tied to an assignment source.
pub struct BoardTasks {
    board: Arc<dyn BoardClient>,
    cache: Arc<dyn Store<CacheSnapshot>>,
    config: SyncConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardListing {
    pub board: Board,
    /// `None` when the lists could not be fetched.
    pub lists: Option<Vec<List>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SundownReport {
    pub card: Card,
    pub sunset: String,
    pub comment: String,
    pub cleared: usize,
}

/// Resolves a wall-clock time in `tz`. Ambiguous times take the earlier instant.
pub fn local_instant<Tz: TimeZone>(tz: &Tz, date: NaiveDate, time: NaiveTime) -> AppResult<DateTime<Utc>> {
    tz.from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| AppError::Config(format!("{} {} does not exist locally", date, time)))
}

pub fn weekly_card_title(subject: &str, week: &crate::models::Week) -> String {
    format!("{} Week {}: {}", subject, week.number, Quarter::format_week_range(week))
}

pub fn sundown_comment(mention: Option<&str>, date: &str, sunset: &str) -> String {
    match mention {
        Some(m) => format!("{} Sundown today ({}) is at {} 🌅", m, date, sunset),
        None => format!("Sundown today ({}) is at {} 🌅", date, sunset),
    }
}

impl BoardTasks {
    pub fn new(
        board: Arc<dyn BoardClient>,
        cache: Arc<dyn Store<CacheSnapshot>>,
        config: SyncConfig,
    ) -> Self {
        Self {
            board,
            cache,
            config,
        }
    }

    /// Live listing of every board. A board whose lists fail is still shown.
    pub async fn list_boards(&self) -> AppResult<Vec<BoardListing>> {
        let boards = self.board.list_boards().await?;
        let mut out = Vec::with_capacity(boards.len());
        for board in boards {
            let lists = match self.board.list_lists(&board.id).await {
                Ok(l) => Some(l),
                Err(e) => {
                    warn!("failed to get lists for board {}: {}", board.name, e);
                    None
                }
            };
            out.push(BoardListing { board, lists });
        }
        Ok(out)
    }

    pub async fn refresh_cache(&self) -> AppResult<CacheSnapshot> {
        let boards = self.board.list_boards().await?;
        let mut lists = Vec::new();
        for board in &boards {
            lists.extend(self.board.list_lists(&board.id).await?);
        }
        let snapshot = CacheSnapshot { boards, lists };
        self.cache.save(&snapshot)?;
        info!(
            "Cached {} boards and {} lists",
            snapshot.boards.len(),
            snapshot.lists.len()
        );
        Ok(snapshot)
    }

    pub fn load_cache(&self) -> AppResult<CacheSnapshot> {
        self.cache.load()
    }

    pub async fn cards(&self, board_name: &str, list_name: &str) -> AppResult<Vec<Card>> {
        let list_id = self.cache.load()?.find_list_id(board_name, list_name)?;
        self.board.list_cards_in_list(&list_id).await
    }

    /// Pushes every daily card to 23:59:59 tomorrow and reopens it. Stops at
    /// the first card that fails.
    pub async fn reset_daily<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> AppResult<usize> {
        let list_id = self
            .cache
            .load()?
            .find_list_id(&self.config.school_board, &self.config.daily_list)?;
        let tomorrow = now.date_naive() + Duration::days(1);
        let due = local_instant(&now.timezone(), tomorrow, end_of_day())?;

        let cards = self.board.list_cards_in_list(&list_id).await?;
        for card in &cards {
            self.board.update_card_due(&card.id, Some(due), false).await?;
            info!("Reset {}", card.title);
        }
        Ok(cards.len())
    }

    /// One card per subject for the week after the current one, due at
    /// 18:00 on that week's last day.
    pub async fn create_weekly<Tz: TimeZone>(
        &self,
        subjects: &SubjectsConfig,
        now: &DateTime<Tz>,
    ) -> AppResult<Vec<Card>> {
        let today = now.date_naive();
        let quarter = subjects.current_quarter(today)?;
        let current = quarter.current_week(today)?;
        let next = quarter.next_week(current)?;

        let list_id = self
            .cache
            .load()?
            .find_list_id(&self.config.school_board, &self.config.weekly_list)?;
        let due = local_instant(&now.timezone(), next.end_date, six_pm())?;

        let mut created = Vec::with_capacity(quarter.subjects.len());
        for subject in &quarter.subjects {
            let card = self
                .board
                .create_card(&NewCard {
                    list_id: list_id.clone(),
                    title: weekly_card_title(subject, next),
                    description: String::new(),
                    due: Some(due),
                })
                .await?;
            info!("Created {}", card.title);
            created.push(card);
        }
        Ok(created)
    }

    /// Replaces whatever is in the sundown list with today's card and
    /// comments the sunset time on it.
    pub async fn sundown_notification<Tz>(
        &self,
        sunset: &SunsetService<Tz>,
        now: &DateTime<Tz>,
    ) -> AppResult<SundownReport>
    where
        Tz: TimeZone + Send + Sync,
        Tz::Offset: Display,
    {
        let list_id = self
            .cache
            .load()?
            .find_list_id(&self.config.sundown_board, &self.config.sundown_list)?;

        let existing = self.board.list_cards_in_list(&list_id).await?;
        for card in &existing {
            self.board.delete_card(&card.id).await?;
        }

        let time = sunset.today_sunset(now.with_timezone(&Utc)).await?;
        let date = now.format(SUNDOWN_TITLE_DATE).to_string();

        let card = self
            .board
            .create_card(&NewCard {
                list_id,
                title: format!("Sundown Notification - {}", date),
                description: String::new(),
                due: None,
            })
            .await?;

        let comment = sundown_comment(self.config.sundown_mention.as_deref(), &date, &time);
        self.board.add_comment(&card.id, &comment).await?;
        info!("Created sundown notification for {} ({})", date, time);

        Ok(SundownReport {
            card,
            sunset: time,
            comment,
            cleared: existing.len(),
        })
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

fn six_pm() -> NaiveTime {
    NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN)
}
