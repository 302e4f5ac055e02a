//! Boundary adapter for the backend's response envelope.
//!
//! Endpoints and backend versions disagree on where lists live: a bare
//! array, `{categories: [...]}`, or `{data: [...]}`. Everything downstream
//! sees flat vectors; unexpected shapes become empty vectors, never errors.

use crate::core::models::{
    Category, Currency, CurrencyTotal, Expense, ExpensePage, ExpenseSummary, FieldError,
    Pagination,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

/// `{success, data?, message?, errors?}` wrapper around every response.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<FieldError>>,
    pub pagination: Option<Pagination>,
}

impl<T> Envelope<T> {
    pub fn empty() -> Self {
        Self {
            success: true,
            data: None,
            message: None,
            errors: None,
            pagination: None,
        }
    }
}

const ENVELOPE_KEYS: [&str; 4] = ["success", "data", "message", "errors"];

/// Reads a whole response body. Bodies that do not look like an envelope
/// (a bare array, say) become the `data` of a successful one.
///
/// Each envelope field is read on its own, so a malformed sibling never hides
/// `success: false` or the backend's message.
pub fn from_body(body: Value) -> Envelope<Value> {
    let mut map = match body {
        Value::Object(map) if ENVELOPE_KEYS.iter().any(|k| map.contains_key(*k)) => map,
        other => {
            return Envelope {
                data: Some(other),
                ..Envelope::empty()
            };
        }
    };

    let success = match map.remove("success") {
        None | Some(Value::Null) => true,
        Some(Value::Bool(success)) => success,
        Some(other) => {
            warn!(value = %other, "Non-boolean success flag; treating as failure");
            false
        }
    };
    let message = match map.remove("message") {
        Some(Value::String(message)) => Some(message),
        _ => None,
    };
    let errors = match map.remove("errors") {
        Some(Value::Array(items)) => Some(field_errors(items)),
        None | Some(Value::Null) => None,
        Some(other) => {
            warn!(value = %other, "Ignoring errors that are not a list");
            None
        }
    };
    let pagination = map
        .remove("pagination")
        .and_then(|p| serde_json::from_value(p).ok());

    Envelope {
        success,
        data: map.remove("data").filter(|d| !d.is_null()),
        message,
        errors,
        pagination,
    }
}

fn field_errors(items: Vec<Value>) -> Vec<FieldError> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<FieldError>(item) {
            Ok(error) => Some(error),
            Err(e) => {
                warn!(error = %e, "Skipping malformed field error");
                None
            }
        })
        .collect()
}

/// Flattens `value` into a list of `T`. Items that fail to decode are skipped.
pub fn unwrap_list<T: DeserializeOwned>(value: Value, key: &str) -> Vec<T> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(key).or_else(|| map.remove("data")) {
            Some(Value::Array(items)) => items,
            Some(nested @ Value::Object(_)) => return unwrap_list(nested, key),
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<T>(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(error = %e, key, "Skipping malformed list item");
                None
            }
        })
        .collect()
}

/// Extracts `T` from `{key: {...}}` or from the bare object.
pub fn unwrap_object<T: DeserializeOwned>(value: Value, key: &str) -> Option<T> {
    if let Value::Object(map) = &value {
        if let Some(inner) = map.get(key) {
            return serde_json::from_value(inner.clone()).ok();
        }
    }
    serde_json::from_value(value).ok()
}

pub fn categories(data: Option<Value>) -> Vec<Category> {
    data.map_or_else(Vec::new, |v| unwrap_list(v, "categories"))
}

pub fn currencies(data: Option<Value>) -> Vec<Currency> {
    data.map_or_else(Vec::new, |v| unwrap_list(v, "currencies"))
}

pub fn expenses(data: Option<Value>) -> Vec<Expense> {
    data.map_or_else(Vec::new, |v| unwrap_list(v, "expenses"))
}

pub fn summary(data: Option<Value>) -> ExpenseSummary {
    data.and_then(|v| unwrap_object(v, "summary"))
        .unwrap_or_else(|| {
            warn!("Summary payload missing or malformed; using an empty summary");
            ExpenseSummary::default()
        })
}

/// Expense list plus its per-currency totals and pagination, which may sit at
/// the envelope's top level or inside `data`.
pub fn expense_page(envelope: Envelope<Value>) -> ExpensePage {
    let data = envelope.data.unwrap_or(Value::Null);
    let totals_by_currency = data
        .get("totalsByCurrency")
        .cloned()
        .map_or_else(Vec::new, |v| unwrap_list::<CurrencyTotal>(v, "totalsByCurrency"));
    let pagination = envelope.pagination.or_else(|| {
        data.get("pagination")
            .and_then(|p| serde_json::from_value(p.clone()).ok())
    });

    ExpensePage {
        expenses: unwrap_list(data, "expenses"),
        totals_by_currency,
        pagination,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn expense_item(id: i64, amount: Value) -> Value {
        json!({
            "id": id,
            "amount": amount,
            "date": "2025-01-15T10:00:00.000Z",
            "categoryId": 1,
            "currencyId": 1
        })
    }

    #[test]
    fn test_equivalent_shapes_flatten_identically() {
        let items = json!([expense_item(1, json!("12.50")), expense_item(2, json!(3))]);

        let bare = expenses(Some(items.clone()));
        let keyed = expenses(Some(json!({ "expenses": items.clone() })));
        let data = expenses(Some(json!({ "data": items.clone() })));
        let nested = expenses(Some(json!({ "data": { "expenses": items } })));

        assert_eq!(bare.len(), 2);
        assert_eq!(bare, keyed);
        assert_eq!(bare, data);
        assert_eq!(bare, nested);
        assert_eq!(bare[0].amount.to_string(), "12.5");
    }

    #[test]
    fn test_unexpected_shapes_become_empty() {
        assert!(categories(None).is_empty());
        assert!(categories(Some(Value::Null)).is_empty());
        assert!(categories(Some(json!("categories"))).is_empty());
        assert!(categories(Some(json!({ "categories": 42 }))).is_empty());
        assert!(currencies(Some(json!({ "somethingElse": [] }))).is_empty());
    }

    #[test]
    fn test_malformed_items_are_skipped() {
        let list = json!({
            "currencies": [
                { "id": 1, "name": "USD", "usdExchangeRate": "1" },
                { "id": "oops" },
                { "id": 2, "name": "EUR", "usdExchangeRate": 1.08 }
            ]
        });
        let parsed = currencies(Some(list));
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].usd_exchange_rate, "1.08");
    }

    #[test]
    fn test_summary_unwrap() {
        let wrapped = json!({
            "summary": {
                "totalCount": 4,
                "totalsByCurrency": [
                    { "currency": { "id": 1, "name": "USD", "usdExchangeRate": "1" }, "totalAmount": "100", "count": 4 }
                ],
                "totalByCategory": []
            }
        });
        let s = summary(Some(wrapped));
        assert_eq!(s.total_count, 4);
        assert_eq!(s.totals_by_currency[0].count, Some(4));

        let bare = summary(Some(json!({ "totalCount": 2 })));
        assert_eq!(bare.total_count, 2);

        assert_eq!(summary(Some(json!([1, 2]))), ExpenseSummary::default());
        assert_eq!(summary(None), ExpenseSummary::default());
    }

    #[test]
    fn test_expense_page_pagination_locations() {
        let top_level = from_body(json!({
            "success": true,
            "data": {
                "expenses": [expense_item(1, json!(5))],
                "totalsByCurrency": [
                    { "currency": { "id": 1, "name": "USD", "usdExchangeRate": "1" }, "totalAmount": "5" }
                ]
            },
            "pagination": { "page": 2, "limit": 10, "total": 11, "totalPages": 2 }
        }));
        let page = expense_page(top_level);
        assert_eq!(page.expenses.len(), 1);
        assert_eq!(page.totals_by_currency.len(), 1);
        assert_eq!(page.pagination.unwrap().page, 2);

        let nested = from_body(json!({
            "success": true,
            "data": {
                "expenses": [],
                "pagination": { "page": 1, "limit": 5, "total": 0, "totalPages": 0 }
            }
        }));
        let page = expense_page(nested);
        assert!(page.expenses.is_empty());
        assert_eq!(page.pagination.unwrap().limit, 5);
    }

    #[test]
    fn test_envelope_defaults() {
        let env = from_body(json!({ "data": [] }));
        assert!(env.success);
        assert!(env.errors.is_none());

        let env = from_body(json!({
            "success": false,
            "message": "Nope",
            "errors": [{ "field": "name", "message": "taken" }]
        }));
        assert!(!env.success);
        assert_eq!(env.errors.unwrap()[0].field, "name");
    }

    #[test]
    fn test_from_body() {
        let bare = from_body(json!([{ "id": 1, "name": "Food" }]));
        assert!(bare.success);
        assert_eq!(categories(bare.data).len(), 1);

        let wrapped = from_body(json!({ "success": false, "message": "Nope" }));
        assert!(!wrapped.success);
        assert!(wrapped.data.is_none());

        let odd = from_body(json!({ "errors": "not a list", "data": [1] }));
        assert!(odd.success);
        assert!(odd.errors.is_none());
        assert_eq!(odd.data, Some(json!([1])));
    }

    #[test]
    fn test_failure_survives_malformed_siblings() {
        let env = from_body(json!({
            "success": false,
            "message": "Currency is in use",
            "errors": [
                { "msg": "in use" },
                { "field": "name", "message": "taken" },
                "plain text"
            ],
            "pagination": { "page": "1" }
        }));
        assert!(!env.success);
        assert_eq!(env.message.as_deref(), Some("Currency is in use"));
        assert_eq!(env.errors, Some(vec![FieldError::new("name", "taken")]));
        assert!(env.pagination.is_none());

        let env = from_body(json!({ "success": "no", "message": 42 }));
        assert!(!env.success);
        assert!(env.message.is_none());
    }

    #[test]
    fn test_unwrap_object() {
        let user = json!({ "user": { "id": 1, "email": "a@b.c", "name": "A" } });
        let parsed: crate::core::models::User = unwrap_object(user, "user").unwrap();
        assert_eq!(parsed.email, "a@b.c");
        let bare = json!({ "id": 2, "email": "d@e.f", "name": "D" });
        let parsed: crate::core::models::User = unwrap_object(bare, "user").unwrap();
        assert_eq!(parsed.id, 2);
        assert!(unwrap_object::<crate::core::models::User>(json!([]), "user").is_none());
    }
}
