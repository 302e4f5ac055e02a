pub mod auth;
pub mod categories;
pub mod currencies;
pub mod dashboard;
pub mod expenses;
pub mod setup;
pub mod ui;

use crate::core::config::AppConfig;
use crate::core::error::{ApiError, user_message};
use crate::core::filters::{FilterState, QuickRange};
use crate::core::session::SessionStore;
use crate::providers::RestBackend;
use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use clap::Args;
use std::sync::Arc;
use tracing::debug;

/// Everything a command needs: settings plus a backend bound to the
/// persisted session.
pub struct App {
    pub config: AppConfig,
    pub backend: Arc<RestBackend>,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let data_dir = config.data_dir()?;
        debug!("Using data directory {}", data_dir.display());
        let session = Arc::new(SessionStore::persistent(data_dir)?);
        let backend = Arc::new(RestBackend::new(&config.api.base_url, session)?);
        Ok(Self { config, backend })
    }

    /// Fails early for commands that are pointless without a session.
    pub fn require_session(&self) -> Result<()> {
        if self.backend.session().is_signed_in() {
            Ok(())
        } else {
            Err(anyhow!("Not signed in. Run `spendlog login` first."))
        }
    }
}

/// Prints the confirmation for a successful write, describing the stored
/// record when the backend echoed it and the request otherwise.
pub fn confirm_write(verb: &str, stored: Option<String>, requested: String) {
    println!(
        "{} {verb} {}",
        ui::style_text("✓", ui::StyleType::Success),
        stored.unwrap_or(requested)
    );
}

/// Filter flags shared by the dashboard and the expense list.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Quick range: today, 1w, 1m or 1y
    #[arg(long, conflicts_with_all = ["from", "to"])]
    pub range: Option<QuickRange>,
    /// First day to include (YYYY-MM-DD, UTC)
    #[arg(long)]
    pub from: Option<NaiveDate>,
    /// Last day to include (YYYY-MM-DD, UTC)
    #[arg(long)]
    pub to: Option<NaiveDate>,
    /// Only expenses in this category id
    #[arg(long)]
    pub category: Option<i64>,
}

impl FilterArgs {
    pub fn apply(&self, state: &FilterState, now: DateTime<Utc>) {
        state.set_category(self.category);
        match self.range {
            Some(range) => state.apply_quick_range(range, now),
            None => state.set_date_range(self.from.map(day_start), self.to.map(day_end)),
        };
    }

    pub fn describe(&self) -> String {
        match (self.range, self.from, self.to) {
            (Some(range), _, _) => format!("range {range}"),
            (None, Some(from), Some(to)) => format!("{from} to {to}"),
            (None, Some(from), None) => format!("since {from}"),
            (None, None, Some(to)) => format!("until {to}"),
            (None, None, None) => "all time".to_string(),
        }
    }
}

/// Converts a backend failure into the one-line message shown to the user.
pub fn api_error(error: ApiError) -> anyhow::Error {
    anyhow!(user_message(&error))
}

pub fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Last millisecond of `date` in UTC.
pub fn day_end(date: NaiveDate) -> DateTime<Utc> {
    day_start(date) + Duration::days(1) - Duration::milliseconds(1)
}
