use std::collections::BTreeMap;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::{AppError, AppResult};
use crate::models::GeoLocation;

/// Whole-document persistence port. `load` fails when nothing usable is
/// stored; callers decide whether that is fatal or a miss.
pub trait Store<T>: Send + Sync {
    fn load(&self) -> AppResult<T>;
    fn save(&self, value: &T) -> AppResult<()>;
}

/// Pretty-printed JSON file, overwritten on every save.
pub struct JsonFileStore<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonFileStore<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T> Store<T> for JsonFileStore<T>
where
    T: Serialize + DeserializeOwned,
{
    fn load(&self) -> AppResult<T> {
        let data = fs::read_to_string(&self.path).map_err(|e| {
            AppError::Cache(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        serde_json::from_str(&data).map_err(|e| {
            AppError::Cache(format!("failed to parse {}: {}", self.path.display(), e))
        })
    }

    fn save(&self, value: &T) -> AppResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(value)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

/// In-process store, mostly for tests and dry runs.
pub struct MemoryStore<T> {
    value: Mutex<Option<T>>,
    saves: Mutex<usize>,
}

impl<T> MemoryStore<T> {
    pub fn empty() -> Self {
        Self {
            value: Mutex::new(None),
            saves: Mutex::new(0),
        }
    }

    pub fn with(value: T) -> Self {
        Self {
            value: Mutex::new(Some(value)),
            saves: Mutex::new(0),
        }
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Store<T> for MemoryStore<T>
where
    T: Clone + Send,
{
    fn load(&self) -> AppResult<T> {
        self.value
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| AppError::Cache("nothing stored".to_string()))
    }

    fn save(&self, value: &T) -> AppResult<()> {
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = Some(value.clone());
        *self.saves.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }
}

/// Prefetched sunset times for one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SunsetCache {
    pub location: GeoLocation,
    #[serde(rename = "cached_until")]
    pub valid_until: DateTime<Utc>,
    /// ISO date -> formatted local sunset time.
    pub data: BTreeMap<String, String>,
}

impl SunsetCache {
    /// A cache is only usable for the exact location it was built for and
    /// strictly before its expiry.
    pub fn is_valid_for(&self, location: &GeoLocation, now: DateTime<Utc>) -> bool {
        self.location == *location && now < self.valid_until
    }

    pub fn get(&self, date: NaiveDate) -> Option<&str> {
        self.data.get(&date_key(date)).map(String::as_str)
    }
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
