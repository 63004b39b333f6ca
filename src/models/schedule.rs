use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Week {
    pub number: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quarter {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub subjects: Vec<String>,
    pub weeks: Vec<Week>,
}

/// Contents of the subjects file driving weekly card creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectsConfig {
    pub quarters: Vec<Quarter>,
}

impl SubjectsConfig {
    pub fn load(path: &std::path::Path) -> AppResult<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&data)
            .map_err(|e| AppError::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    pub fn current_quarter(&self, today: NaiveDate) -> AppResult<&Quarter> {
        self.quarters
            .iter()
            .find(|q| q.start_date <= today && today <= q.end_date)
            .ok_or_else(|| AppError::not_found(format!("no current quarter for {}", today)))
    }
}

impl Quarter {
    /// A week counts as current from the day before it starts through its last day.
    pub fn current_week(&self, today: NaiveDate) -> AppResult<&Week> {
        self.weeks
            .iter()
            .find(|w| w.start_date - Duration::days(1) <= today && today <= w.end_date)
            .ok_or_else(|| AppError::not_found(format!("no current week for {}", today)))
    }

    pub fn next_week(&self, current: &Week) -> AppResult<&Week> {
        self.weeks
            .iter()
            .position(|w| w.number == current.number)
            .and_then(|i| self.weeks.get(i + 1))
            .ok_or_else(|| {
                AppError::not_found(format!("no week after week {}", current.number))
            })
    }

    pub fn format_week_range(week: &Week) -> String {
        format!(
            "{} {}–{}",
            week.start_date.format("%B"),
            week.start_date.day(),
            week.end_date.day()
        )
    }
}
