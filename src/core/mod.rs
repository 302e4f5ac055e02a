//! Client-side domain logic of the expense tracker

pub mod analytics;
pub mod backend;
pub mod cache;
pub mod config;
pub mod conversion;
pub mod dashboard;
pub mod error;
pub mod filters;
pub mod log;
pub mod models;
pub mod session;
pub mod validation;

// Re-export main types for cleaner imports
pub use backend::ExpenseBackend;
pub use error::ApiError;
pub use filters::{ExpenseFilters, FilterState, QuickRange};
pub use session::{SessionEvent, SessionStore};
