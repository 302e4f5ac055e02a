//! User-selected filters and the channel that announces their changes.

use anyhow::anyhow;
use chrono::{DateTime, Duration, NaiveTime, SecondsFormat, Utc};
use std::fmt::Display;
use std::str::FromStr;
use tokio::sync::watch;
use tracing::debug;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Everything the dashboard fetch depends on. Also the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpenseFilters {
    pub category_id: Option<i64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub page: u32,
    pub limit: u32,
}

impl Default for ExpenseFilters {
    fn default() -> Self {
        Self::with_limit(DEFAULT_PAGE_SIZE)
    }
}

impl ExpenseFilters {
    pub fn with_limit(limit: u32) -> Self {
        Self {
            category_id: None,
            start_date: None,
            end_date: None,
            page: 1,
            limit: limit.max(1),
        }
    }

    /// `startDate`/`endDate` pairs, used alone by the summary endpoint.
    pub fn date_query(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(start) = self.start_date {
            pairs.push(("startDate", format_timestamp(start)));
        }
        if let Some(end) = self.end_date {
            pairs.push(("endDate", format_timestamp(end)));
        }
        pairs
    }

    /// Full query for the expense list.
    pub fn list_query(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(id) = self.category_id {
            pairs.push(("categoryId", id.to_string()));
        }
        pairs.extend(self.date_query());
        pairs.push(("page", self.page.to_string()));
        pairs.push(("limit", self.limit.to_string()));
        pairs
    }

    fn same_except_page(&self, other: &Self) -> bool {
        self.category_id == other.category_id
            && self.start_date == other.start_date
            && self.end_date == other.end_date
            && self.limit == other.limit
    }
}

/// ISO-8601 UTC with millisecond precision, e.g. `2025-01-15T00:00:00.000Z`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuickRange {
    Today,
    OneWeek,
    OneMonth,
    OneYear,
}

impl QuickRange {
    /// `[start, now]` for this range.
    pub fn bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = match self {
            QuickRange::Today => now.date_naive().and_time(NaiveTime::MIN).and_utc(),
            QuickRange::OneWeek => now - Duration::days(7),
            QuickRange::OneMonth => now - Duration::days(30),
            QuickRange::OneYear => now - Duration::days(365),
        };
        (start, now)
    }
}

impl Display for QuickRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                QuickRange::Today => "today",
                QuickRange::OneWeek => "1w",
                QuickRange::OneMonth => "1m",
                QuickRange::OneYear => "1y",
            }
        )
    }
}

impl FromStr for QuickRange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "today" | "1d" => Ok(QuickRange::Today),
            "1w" | "week" => Ok(QuickRange::OneWeek),
            "1m" | "month" => Ok(QuickRange::OneMonth),
            "1y" | "year" => Ok(QuickRange::OneYear),
            _ => Err(anyhow!("Invalid quick range: {}", s)),
        }
    }
}

/// Owner of the current [`ExpenseFilters`].
///
/// Subscribers see exactly one notification per effective change. Setting a
/// field to the value it already holds notifies nobody.
pub struct FilterState {
    tx: watch::Sender<ExpenseFilters>,
}

impl FilterState {
    pub fn new(initial: ExpenseFilters) -> Self {
        Self {
            tx: watch::Sender::new(initial),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ExpenseFilters> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> ExpenseFilters {
        self.tx.borrow().clone()
    }

    pub fn set_category(&self, category_id: Option<i64>) -> bool {
        self.update(|f| f.category_id = category_id)
    }

    pub fn set_start_date(&self, start: Option<DateTime<Utc>>) -> bool {
        self.update(|f| f.start_date = start)
    }

    pub fn set_end_date(&self, end: Option<DateTime<Utc>>) -> bool {
        self.update(|f| f.end_date = end)
    }

    /// Sets both bounds as a single transition.
    pub fn set_date_range(&self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> bool {
        self.update(|f| {
            f.start_date = start;
            f.end_date = end;
        })
    }

    pub fn apply_quick_range(&self, range: QuickRange, now: DateTime<Utc>) -> bool {
        let (start, end) = range.bounds(now);
        self.set_date_range(Some(start), Some(end))
    }

    /// Changes only the page; pages start at 1.
    pub fn set_page(&self, page: u32) -> bool {
        self.update(|f| f.page = page.max(1))
    }

    pub fn next_page(&self) -> bool {
        self.update(|f| f.page = f.page.saturating_add(1))
    }

    pub fn previous_page(&self) -> bool {
        self.update(|f| f.page = f.page.saturating_sub(1).max(1))
    }

    /// Drops every filter, keeping the page size.
    pub fn clear(&self) -> bool {
        self.update(|f| *f = ExpenseFilters::with_limit(f.limit))
    }

    fn update(&self, apply: impl FnOnce(&mut ExpenseFilters)) -> bool {
        self.tx.send_if_modified(|filters| {
            let before = filters.clone();
            apply(filters);
            if !filters.same_except_page(&before) {
                filters.page = 1;
            }
            let changed = *filters != before;
            if changed {
                debug!("Filters changed: {:?}", filters);
            }
            changed
        })
    }
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new(ExpenseFilters::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 15, 14, 30, 0).unwrap()
    }

    #[test]
    fn test_category_change_resets_page() {
        let state = FilterState::default();
        state.set_page(3);
        assert_eq!(state.current().page, 3);

        assert!(state.set_category(Some(5)));
        let filters = state.current();
        assert_eq!(filters.page, 1);
        assert_eq!(filters.category_id, Some(5));
    }

    #[test]
    fn test_page_change_keeps_other_filters() {
        let state = FilterState::default();
        state.set_category(Some(2));
        state.set_page(4);
        let filters = state.current();
        assert_eq!(filters.page, 4);
        assert_eq!(filters.category_id, Some(2));

        state.previous_page();
        assert_eq!(state.current().page, 3);
        state.set_page(0);
        assert_eq!(state.current().page, 1);
        assert!(!state.previous_page());
    }

    #[tokio::test]
    async fn test_one_notification_per_change() {
        let state = FilterState::default();
        let mut rx = state.subscribe();
        rx.borrow_and_update();

        assert!(state.apply_quick_range(QuickRange::OneWeek, now()));
        assert!(rx.has_changed().unwrap());
        let seen = rx.borrow_and_update().clone();
        assert_eq!(seen.start_date, Some(now() - Duration::days(7)));
        assert_eq!(seen.end_date, Some(now()));

        assert!(!state.apply_quick_range(QuickRange::OneWeek, now()));
        assert!(!state.set_category(None));
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_quick_range_bounds() {
        let (start, end) = QuickRange::Today.bounds(now());
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 3, 15, 0, 0, 0).unwrap());
        assert_eq!(end, now());

        let (start, _) = QuickRange::OneMonth.bounds(now());
        assert_eq!(start, now() - Duration::days(30));
        let (start, _) = QuickRange::OneYear.bounds(now());
        assert_eq!(start, now() - Duration::days(365));
    }

    #[test]
    fn test_quick_range_parse() {
        assert_eq!("today".parse::<QuickRange>().unwrap(), QuickRange::Today);
        assert_eq!("1W".parse::<QuickRange>().unwrap(), QuickRange::OneWeek);
        assert_eq!("month".parse::<QuickRange>().unwrap(), QuickRange::OneMonth);
        assert_eq!(QuickRange::OneYear.to_string(), "1y");
        assert!("fortnight".parse::<QuickRange>().is_err());
    }

    #[test]
    fn test_clear_keeps_limit() {
        let state = FilterState::new(ExpenseFilters::with_limit(25));
        state.set_category(Some(1));
        state.apply_quick_range(QuickRange::Today, now());
        assert!(state.clear());
        assert_eq!(state.current(), ExpenseFilters::with_limit(25));
        assert!(!state.clear());
    }

    #[test]
    fn test_query_pairs() {
        let filters = ExpenseFilters {
            category_id: Some(3),
            start_date: Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()),
            end_date: None,
            page: 2,
            limit: 10,
        };
        assert_eq!(
            filters.list_query(),
            vec![
                ("categoryId", "3".to_string()),
                ("startDate", "2025-01-01T00:00:00.000Z".to_string()),
                ("page", "2".to_string()),
                ("limit", "10".to_string()),
            ]
        );
        assert_eq!(filters.date_query().len(), 1);
        assert!(ExpenseFilters::default().date_query().is_empty());
    }
}
