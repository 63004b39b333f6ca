use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use tracing::{info, warn};

use crate::cache::{SunsetCache, Store, date_key};
use crate::error::{AppError, AppResult};
use crate::models::GeoLocation;
use crate::sunset::{SunsetDay, SunsetProvider};

/// Days fetched per provider call, today included.
pub const PREFETCH_DAYS: i64 = 30;

pub struct SunsetService<Tz: TimeZone> {
    provider: Arc<dyn SunsetProvider>,
    store: Arc<dyn Store<SunsetCache>>,
    location: GeoLocation,
    tz: Tz,
}

impl<Tz> SunsetService<Tz>
where
    Tz: TimeZone + Send + Sync,
    Tz::Offset: Display,
{
    pub fn new(
        provider: Arc<dyn SunsetProvider>,
        store: Arc<dyn Store<SunsetCache>>,
        location: GeoLocation,
        tz: Tz,
    ) -> Self {
        Self {
            provider,
            store,
            location,
            tz,
        }
    }

    /// Today's sunset as `"7:41 PM MDT"`, from the cache when it is usable
    /// for this location, otherwise from a fresh 30-day window.
    pub async fn today_sunset(&self, now: DateTime<Utc>) -> AppResult<String> {
        let today = now.with_timezone(&self.tz).date_naive();

        match self.store.load() {
            Ok(cache) if cache.is_valid_for(&self.location, now) => {
                if let Some(time) = cache.get(today) {
                    return Ok(time.to_string());
                }
                info!("sunset cache has no entry for {}", today);
            }
            Ok(_) => info!("sunset cache expired or for another location"),
            Err(e) => info!("sunset cache unavailable: {}", e),
        }

        let cache = self.prefetch(today).await?;
        cache
            .get(today)
            .map(str::to_string)
            .ok_or_else(|| AppError::Sunset(format!("no sunset data found for today ({})", today)))
    }

    async fn prefetch(&self, start: NaiveDate) -> AppResult<SunsetCache> {
        let end = start + Duration::days(PREFETCH_DAYS - 1);
        info!("fetching sunset data for {} days from {}", PREFETCH_DAYS, start);

        let days = self.provider.sunset_window(self.location, start, end).await?;

        let mut data = BTreeMap::new();
        for day in &days {
            match format_sunset(day, &self.tz) {
                Some((date, time)) => {
                    data.insert(date_key(date), time);
                }
                None => warn!("skipping unparsable sunset '{}' on '{}'", day.sunset, day.date),
            }
        }

        let cache = SunsetCache {
            location: self.location,
            valid_until: (end + Duration::days(1)).and_time(NaiveTime::MIN).and_utc(),
            data,
        };
        self.store.save(&cache)?;
        info!("cached sunset data until {}", end);
        Ok(cache)
    }
}

/// Provider times are read as UTC clock times on the given date, truncated
/// to the minute, and rendered in `tz`.
pub fn format_sunset<Tz>(day: &SunsetDay, tz: &Tz) -> Option<(NaiveDate, String)>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let date = NaiveDate::parse_from_str(&day.date, "%Y-%m-%d").ok()?;
    let time = NaiveTime::parse_from_str(&day.sunset, "%H:%M:%S").ok()?;
    let time = time.with_second(0)?;
    let local = date.and_time(time).and_utc().with_timezone(tz);
    Some((date, local.format("%-I:%M %p %Z").to_string()))
}
