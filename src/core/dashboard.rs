//! Fetch orchestration for the dashboard view.
//!
//! A load fans out to the four read endpoints at once and applies the result
//! only if no newer load was issued meanwhile. Loads are all-or-nothing: any
//! failed fetch leaves the previously shown data in place.

use crate::core::analytics::{self, CategoryShare, SummaryTotals};
use crate::core::backend::ExpenseBackend;
use crate::core::cache::{Cache, MemoryCache};
use crate::core::error::{ApiError, user_message};
use crate::core::filters::ExpenseFilters;
use crate::core::models::{
    Category, Currency, CurrencyTotal, Expense, ExpensePage, ExpenseSummary, Pagination,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardData {
    pub summary: ExpenseSummary,
    pub expenses: Vec<Expense>,
    pub totals_by_currency: Vec<CurrencyTotal>,
    pub categories: Vec<Category>,
    pub currencies: Vec<Currency>,
    pub pagination: Option<Pagination>,
}

impl DashboardData {
    pub fn totals(&self) -> SummaryTotals {
        analytics::summary_totals(&self.summary)
    }

    pub fn category_shares(&self) -> Vec<CategoryShare> {
        analytics::category_breakdown(&self.summary)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub data: Option<DashboardData>,
    pub loading: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Fresh data was fetched and is now displayed.
    Applied,
    /// Data for these filters came from the cache.
    Cached,
    /// A fetch failed; carries the user-facing message.
    Failed(String),
    /// A newer load was issued before this one finished; its result was dropped.
    Superseded,
}

pub struct Dashboard {
    backend: Arc<dyn ExpenseBackend>,
    state: Mutex<ViewState>,
    sequence: AtomicU64,
    cache: MemoryCache<ExpenseFilters, DashboardData>,
}

impl Dashboard {
    pub fn new(backend: Arc<dyn ExpenseBackend>, cache_ttl: Option<Duration>) -> Self {
        Self {
            backend,
            state: Mutex::new(ViewState::default()),
            sequence: AtomicU64::new(0),
            cache: MemoryCache::with_ttl(cache_ttl),
        }
    }

    pub async fn state(&self) -> ViewState {
        self.state.lock().await.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.lock().await.loading
    }

    /// Drops all cached results. Call after any mutation.
    pub async fn invalidate(&self) {
        self.cache.clear().await;
    }

    /// Invalidates, then loads `filters` from the backend.
    pub async fn refresh(&self, filters: &ExpenseFilters) -> LoadOutcome {
        self.invalidate().await;
        self.load(filters).await
    }

    pub async fn load(&self, filters: &ExpenseFilters) -> LoadOutcome {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(data) = self.cache.get(filters).await {
            let mut state = self.state.lock().await;
            if !self.is_latest(seq) {
                return LoadOutcome::Superseded;
            }
            state.data = Some(data);
            state.loading = false;
            state.last_error = None;
            return LoadOutcome::Cached;
        }

        self.state.lock().await.loading = true;
        debug!(seq, "Loading dashboard for {:?}", filters);

        let (summary, expenses, categories, currencies) = futures::join!(
            self.backend.fetch_summary(filters),
            self.backend.fetch_expenses(filters),
            self.backend.fetch_categories(),
            self.backend.fetch_currencies(),
        );
        let result = assemble(summary, expenses, categories, currencies);

        let mut state = self.state.lock().await;
        if !self.is_latest(seq) {
            debug!(seq, "Discarding superseded dashboard response");
            return LoadOutcome::Superseded;
        }
        state.loading = false;

        match result {
            Ok(data) => {
                info!(
                    expenses = data.expenses.len(),
                    categories = data.categories.len(),
                    "Dashboard loaded"
                );
                self.cache.put(filters.clone(), data.clone()).await;
                state.data = Some(data);
                state.last_error = None;
                LoadOutcome::Applied
            }
            Err(e) => {
                warn!(error = %e, "Dashboard load failed");
                let message = user_message(&e);
                state.last_error = Some(message.clone());
                LoadOutcome::Failed(message)
            }
        }
    }

    /// Loads the current filters, then reloads once per change until the
    /// sender is dropped.
    pub async fn watch_filters(&self, mut rx: watch::Receiver<ExpenseFilters>) {
        let mut first = true;
        loop {
            let filters = rx.borrow_and_update().clone();
            if !first {
                self.invalidate().await;
            }
            first = false;
            self.load(&filters).await;

            if rx.changed().await.is_err() {
                debug!("Filter channel closed; stopping dashboard watcher");
                break;
            }
        }
    }

    fn is_latest(&self, seq: u64) -> bool {
        self.sequence.load(Ordering::SeqCst) == seq
    }
}

fn assemble(
    summary: Result<ExpenseSummary, ApiError>,
    page: Result<ExpensePage, ApiError>,
    categories: Result<Vec<Category>, ApiError>,
    currencies: Result<Vec<Currency>, ApiError>,
) -> Result<DashboardData, ApiError> {
    let page = page?;
    Ok(DashboardData {
        summary: summary?,
        expenses: page.expenses,
        totals_by_currency: page.totals_by_currency,
        categories: categories?,
        currencies: currencies?,
        pagination: page.pagination,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{CategoryRef, CurrencyRef};
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use tokio::sync::Notify;

    #[derive(Default)]
    struct MockBackend {
        calls: AtomicUsize,
        fail_categories: AtomicBool,
        hold_currencies: AtomicBool,
        currencies_started: Notify,
        release_currencies: Notify,
    }

    impl MockBackend {
        fn expense(id: i64) -> Expense {
            Expense {
                id,
                amount: Decimal::ONE,
                description: None,
                date: Utc::now(),
                category_id: id,
                currency_id: 1,
                user_id: None,
                created_at: None,
                updated_at: None,
                category: None,
                currency: None,
            }
        }
    }

    #[async_trait]
    impl ExpenseBackend for MockBackend {
        async fn fetch_summary(
            &self,
            _filters: &ExpenseFilters,
        ) -> Result<ExpenseSummary, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ExpenseSummary {
                total_count: 1,
                totals_by_currency: vec![CurrencyTotal {
                    currency: CurrencyRef {
                        id: 1,
                        name: "USD".to_string(),
                        usd_exchange_rate: "1".to_string(),
                        rate_direction: None,
                    },
                    total_amount: "40".to_string(),
                    count: Some(1),
                }],
                total_by_category: vec![],
            })
        }

        async fn fetch_expenses(&self, filters: &ExpenseFilters) -> Result<ExpensePage, ApiError> {
            // Category 1 answers slowly so a later load can overtake it.
            let delay = if filters.category_id == Some(1) { 100 } else { 10 };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            let id = filters.category_id.unwrap_or(0);
            Ok(ExpensePage {
                expenses: vec![Self::expense(id)],
                totals_by_currency: vec![],
                pagination: Some(Pagination {
                    page: filters.page,
                    limit: filters.limit,
                    total: 1,
                    total_pages: 1,
                }),
            })
        }

        async fn fetch_categories(&self) -> Result<Vec<Category>, ApiError> {
            if self.fail_categories.load(Ordering::SeqCst) {
                return Err(ApiError::Http {
                    status: 500,
                    message: None,
                    errors: vec![],
                });
            }
            Ok(vec![])
        }

        async fn fetch_currencies(&self) -> Result<Vec<Currency>, ApiError> {
            if self.hold_currencies.load(Ordering::SeqCst) {
                self.currencies_started.notify_one();
                self.release_currencies.notified().await;
            }
            Ok(vec![])
        }
    }

    fn filters(category_id: Option<i64>) -> ExpenseFilters {
        ExpenseFilters {
            category_id,
            ..ExpenseFilters::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_applies_and_caches() {
        let backend = Arc::new(MockBackend::default());
        let dashboard = Dashboard::new(backend.clone(), None);

        assert_eq!(dashboard.load(&filters(None)).await, LoadOutcome::Applied);
        let state = dashboard.state().await;
        assert!(!state.loading);
        assert!(state.last_error.is_none());
        let data = state.data.unwrap();
        assert_eq!(data.pagination.unwrap().page, 1);
        assert_eq!(data.totals().by_currency, vec!["USD 40.00"]);

        assert_eq!(dashboard.load(&filters(None)).await, LoadOutcome::Cached);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

        assert_eq!(dashboard.refresh(&filters(None)).await, LoadOutcome::Applied);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_loading_until_every_fetch_settles() {
        let backend = Arc::new(MockBackend::default());
        backend.hold_currencies.store(true, Ordering::SeqCst);
        let dashboard = Arc::new(Dashboard::new(backend.clone(), None));
        assert!(!dashboard.is_loading().await);

        let load = {
            let dashboard = dashboard.clone();
            tokio::spawn(async move { dashboard.load(&filters(None)).await })
        };
        backend.currencies_started.notified().await;
        assert!(dashboard.is_loading().await);
        assert!(dashboard.state().await.data.is_none());

        backend.release_currencies.notify_one();
        assert_eq!(load.await.unwrap(), LoadOutcome::Applied);
        assert!(!dashboard.is_loading().await);
        assert!(dashboard.state().await.data.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_response_is_discarded() {
        let dashboard = Dashboard::new(Arc::new(MockBackend::default()), None);

        let slow_filters = filters(Some(1));
        let fast_filters = filters(Some(2));
        let (slow, fast) = tokio::join!(
            dashboard.load(&slow_filters),
            dashboard.load(&fast_filters)
        );
        assert_eq!(slow, LoadOutcome::Superseded);
        assert_eq!(fast, LoadOutcome::Applied);

        let state = dashboard.state().await;
        assert!(!state.loading);
        assert_eq!(state.data.unwrap().expenses[0].id, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_previous_data() {
        let backend = Arc::new(MockBackend::default());
        let dashboard = Dashboard::new(backend.clone(), None);
        dashboard.load(&filters(Some(2))).await;

        backend.fail_categories.store(true, Ordering::SeqCst);
        let outcome = dashboard.refresh(&filters(Some(3))).await;
        assert_eq!(
            outcome,
            LoadOutcome::Failed("Server error. Please try again later.".to_string())
        );

        let state = dashboard.state().await;
        assert!(!state.loading);
        assert_eq!(
            state.last_error.as_deref(),
            Some("Server error. Please try again later.")
        );
        assert_eq!(state.data.unwrap().expenses[0].id, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_filters_reloads_per_change() {
        let backend = Arc::new(MockBackend::default());
        let dashboard = Arc::new(Dashboard::new(backend.clone(), None));
        let state = crate::core::filters::FilterState::default();

        let watcher = {
            let dashboard = dashboard.clone();
            let rx = state.subscribe();
            tokio::spawn(async move { dashboard.watch_filters(rx).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

        state.set_category(Some(4));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
        let data = dashboard.state().await.data.unwrap();
        assert_eq!(data.expenses[0].id, 4);

        drop(state);
        watcher.await.unwrap();
    }

    #[test]
    fn test_category_shares_from_summary() {
        let data = DashboardData {
            summary: ExpenseSummary {
                total_count: 1,
                totals_by_currency: vec![],
                total_by_category: vec![crate::core::models::CategoryTotal {
                    category: CategoryRef {
                        id: 1,
                        name: "Food".to_string(),
                        color: None,
                    },
                    total_count: 1,
                    by_currency: vec![],
                }],
            },
            ..DashboardData::default()
        };
        let shares = data.category_shares();
        assert_eq!(shares.len(), 1);
        assert_eq!(shares[0].percent, 0);
    }
}
