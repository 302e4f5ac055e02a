//! Client-side checks applied to form payloads before they reach the network.

use crate::core::error::ApiError;
use crate::core::models::{
    CategoryUpdate, CurrencyUpdate, ExpenseUpdate, FieldError, NewCategory, NewCurrency,
    NewExpense,
};
use regex::Regex;
use rust_decimal::Decimal;
use std::sync::LazyLock;

pub const MAX_CURRENCY_NAME_LEN: usize = 50;

static COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("color pattern is valid"));

fn finish<T>(payload: T, errors: Vec<FieldError>) -> Result<T, ApiError> {
    if errors.is_empty() {
        Ok(payload)
    } else {
        Err(ApiError::Validation(errors))
    }
}

fn check_amount(amount: Decimal, errors: &mut Vec<FieldError>) {
    if amount <= Decimal::ZERO {
        errors.push(FieldError::new("amount", "Amount must be positive"));
    }
}

fn check_category_id(id: i64, errors: &mut Vec<FieldError>) {
    if id <= 0 {
        errors.push(FieldError::new("categoryId", "Please select a category"));
    }
}

fn check_currency_id(id: i64, errors: &mut Vec<FieldError>) {
    if id <= 0 {
        errors.push(FieldError::new("currencyId", "Please select a currency"));
    }
}

fn check_name(name: &str, errors: &mut Vec<FieldError>) {
    if name.trim().is_empty() {
        errors.push(FieldError::new("name", "Name is required"));
    }
}

fn check_currency_name(name: &str, errors: &mut Vec<FieldError>) {
    check_name(name, errors);
    if name.chars().count() > MAX_CURRENCY_NAME_LEN {
        errors.push(FieldError::new("name", "Name is too long"));
    }
}

fn check_rate(rate: Decimal, errors: &mut Vec<FieldError>) {
    if rate <= Decimal::ZERO {
        errors.push(FieldError::new(
            "usdExchangeRate",
            "Exchange rate must be positive",
        ));
    }
}

/// An empty color means "no color"; anything else must be `#RRGGBB`.
fn normalize_color(color: Option<String>, errors: &mut Vec<FieldError>) -> Option<String> {
    let color = color.filter(|c| !c.trim().is_empty())?;
    if !COLOR_RE.is_match(color.trim()) {
        errors.push(FieldError::new("color", "Invalid color format"));
    }
    Some(color.trim().to_string())
}

pub fn new_expense(payload: NewExpense) -> Result<NewExpense, ApiError> {
    let mut errors = Vec::new();
    check_amount(payload.amount, &mut errors);
    check_category_id(payload.category_id, &mut errors);
    check_currency_id(payload.currency_id, &mut errors);
    finish(payload, errors)
}

pub fn expense_update(payload: ExpenseUpdate) -> Result<ExpenseUpdate, ApiError> {
    let mut errors = Vec::new();
    if let Some(amount) = payload.amount {
        check_amount(amount, &mut errors);
    }
    if let Some(id) = payload.category_id {
        check_category_id(id, &mut errors);
    }
    if let Some(id) = payload.currency_id {
        check_currency_id(id, &mut errors);
    }
    finish(payload, errors)
}

pub fn new_category(mut payload: NewCategory) -> Result<NewCategory, ApiError> {
    let mut errors = Vec::new();
    check_name(&payload.name, &mut errors);
    payload.color = normalize_color(payload.color.take(), &mut errors);
    finish(payload, errors)
}

pub fn category_update(mut payload: CategoryUpdate) -> Result<CategoryUpdate, ApiError> {
    let mut errors = Vec::new();
    if let Some(name) = &payload.name {
        check_name(name, &mut errors);
    }
    payload.color = normalize_color(payload.color.take(), &mut errors);
    finish(payload, errors)
}

pub fn new_currency(payload: NewCurrency) -> Result<NewCurrency, ApiError> {
    let mut errors = Vec::new();
    check_currency_name(&payload.name, &mut errors);
    check_rate(payload.usd_exchange_rate, &mut errors);
    finish(payload, errors)
}

pub fn currency_update(payload: CurrencyUpdate) -> Result<CurrencyUpdate, ApiError> {
    let mut errors = Vec::new();
    if let Some(name) = &payload.name {
        check_currency_name(name, &mut errors);
    }
    if let Some(rate) = payload.usd_exchange_rate {
        check_rate(rate, &mut errors);
    }
    finish(payload, errors)
}
