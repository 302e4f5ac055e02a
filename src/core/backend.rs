//! The read-side seam between the dashboard and whatever serves expense data.

use crate::core::error::ApiError;
use crate::core::filters::ExpenseFilters;
use crate::core::models::{Category, Currency, ExpensePage, ExpenseSummary};
use async_trait::async_trait;

#[async_trait]
pub trait ExpenseBackend: Send + Sync {
    /// Aggregates for the filters' date range. Category and page are ignored.
    async fn fetch_summary(&self, filters: &ExpenseFilters) -> Result<ExpenseSummary, ApiError>;

    async fn fetch_expenses(&self, filters: &ExpenseFilters) -> Result<ExpensePage, ApiError>;

    async fn fetch_categories(&self) -> Result<Vec<Category>, ApiError>;

    async fn fetch_currencies(&self) -> Result<Vec<Currency>, ApiError>;
}
