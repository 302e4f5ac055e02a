//! Turns backend summary payloads into display values.
//!
//! Shares are computed on amounts converted to the reference unit, while the
//! per-category breakdown text keeps each currency's original amount.
use crate::core::conversion::{convert, parse_decimal, parse_rate};
use crate::core::models::{CategoryRef, CategoryTotal, CurrencyTotal, ExpenseSummary};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

/// Display row for one category of the summary.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryShare {
    pub category: CategoryRef,
    pub total_count: u64,
    pub reference_total: Decimal,
    pub percent: u32,
    pub breakdown: String,
}

/// Headline figures of a summary.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryTotals {
    pub total_count: u64,
    pub reference_total: Decimal,
    pub by_currency: Vec<String>,
}

/// Value of a single per-currency total in the reference unit. Unparsable
/// amounts and rates contribute 0.
pub fn currency_total_in_reference_unit(total: &CurrencyTotal) -> Decimal {
    let amount = parse_decimal(&total.total_amount);
    let rate = parse_rate(&total.currency.usd_exchange_rate);
    match (amount, rate) {
        (Some(amount), Some(rate)) => convert(amount, rate, total.currency.rate_direction),
        _ => {
            debug!(
                "Skipping {} total: amount {:?}, rate {:?}",
                total.currency.name, total.total_amount, total.currency.usd_exchange_rate
            );
            Decimal::ZERO
        }
    }
}

pub fn total_in_reference_unit(totals: &[CurrencyTotal]) -> Decimal {
    totals
        .iter()
        .map(currency_total_in_reference_unit)
        .fold(Decimal::ZERO, |acc, value| {
            acc.checked_add(value).unwrap_or(acc)
        })
}

/// Whole-number percentage of `grand_total` taken by `item`; 0 when the grand
/// total is zero.
pub fn category_share(item: &CategoryTotal, grand_total: Decimal) -> u32 {
    if grand_total <= Decimal::ZERO {
        return 0;
    }
    let item_total = total_in_reference_unit(&item.by_currency);
    item_total
        .checked_div(grand_total)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map(|pct| pct.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|pct| pct.to_u32())
        .unwrap_or(0)
}

/// Comma-separated original per-currency totals, e.g. `"USD 100.00, EUR 50.00"`.
pub fn format_breakdown(item: &CategoryTotal) -> String {
    item.by_currency
        .iter()
        .map(format_currency_total)
        .collect::<Vec<_>>()
        .join(", ")
}

/// `"EUR 50.00"`, or the raw text when the amount does not parse.
pub fn format_currency_total(total: &CurrencyTotal) -> String {
    match parse_decimal(&total.total_amount) {
        Some(amount) => format_currency(amount, &total.currency.name),
        None => format!("{} {}", total.currency.name, total.total_amount),
    }
}

/// Rows for every category in the summary, in backend order. Categories with
/// no per-currency totals still get a row at 0%.
pub fn category_breakdown(summary: &ExpenseSummary) -> Vec<CategoryShare> {
    let grand_total = summary
        .total_by_category
        .iter()
        .map(|item| total_in_reference_unit(&item.by_currency))
        .fold(Decimal::ZERO, |acc, value| {
            acc.checked_add(value).unwrap_or(acc)
        });

    summary
        .total_by_category
        .iter()
        .map(|item| CategoryShare {
            category: item.category.clone(),
            total_count: item.total_count,
            reference_total: total_in_reference_unit(&item.by_currency),
            percent: category_share(item, grand_total),
            breakdown: format_breakdown(item),
        })
        .collect()
}

pub fn summary_totals(summary: &ExpenseSummary) -> SummaryTotals {
    SummaryTotals {
        total_count: summary.total_count,
        reference_total: total_in_reference_unit(&summary.totals_by_currency),
        by_currency: summary
            .totals_by_currency
            .iter()
            .map(format_currency_total)
            .collect(),
    }
}

/// Two decimals with thousands separators: `1234.5` → `"1,234.50"`.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{frac_part}")
}

/// Amount prefixed with a currency label: `"EUR 1,234.50"`.
pub fn format_currency(amount: Decimal, currency_name: &str) -> String {
    format!("{currency_name} {}", format_amount(amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::conversion::RateDirection;
    use crate::core::models::CurrencyRef;
    use std::str::FromStr;

    fn d(raw: &str) -> Decimal {
        Decimal::from_str(raw).unwrap()
    }

    fn total(name: &str, rate: &str, amount: &str) -> CurrencyTotal {
        CurrencyTotal {
            currency: CurrencyRef {
                id: name.len() as i64,
                name: name.to_string(),
                usd_exchange_rate: rate.to_string(),
                rate_direction: None,
            },
            total_amount: amount.to_string(),
            count: None,
        }
    }

    fn category(id: i64, name: &str, by_currency: Vec<CurrencyTotal>) -> CategoryTotal {
        CategoryTotal {
            category: CategoryRef {
                id,
                name: name.to_string(),
                color: None,
            },
            total_count: by_currency.len() as u64,
            by_currency,
        }
    }

    #[test]
    fn test_mixed_currency_total() {
        let totals = vec![total("USD", "1", "100"), total("EUR", "1.08", "50")];
        assert_eq!(total_in_reference_unit(&totals), d("154"));
    }

    #[test]
    fn test_inverse_rate_total() {
        let totals = vec![total("JPY", "150", "15000")];
        assert_eq!(total_in_reference_unit(&totals), d("100"));
    }

    #[test]
    fn test_unparsable_entries_contribute_zero() {
        let totals = vec![
            total("USD", "1", "100"),
            total("BAD", "abc", "50"),
            total("NEG", "-1", "50"),
            total("NAN", "NaN", "50"),
            total("EUR", "1.08", "oops"),
        ];
        assert_eq!(total_in_reference_unit(&totals), d("100"));
        assert_eq!(total_in_reference_unit(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_explicit_direction_used_for_totals() {
        let mut kwd = total("KWD", "3.25", "10");
        assert_eq!(currency_total_in_reference_unit(&kwd), d("32.5"));
        kwd.currency.rate_direction = Some(RateDirection::UnitsPerUsd);
        assert_eq!(currency_total_in_reference_unit(&kwd), d("10") / d("3.25"));
    }

    #[test]
    fn test_category_share_zero_grand_total() {
        let item = category(1, "Food", vec![total("USD", "1", "100")]);
        assert_eq!(category_share(&item, Decimal::ZERO), 0);
        let empty = category(2, "Empty", vec![]);
        assert_eq!(category_share(&empty, d("100")), 0);
    }

    #[test]
    fn test_category_share_rounds() {
        let item = category(1, "Food", vec![total("USD", "1", "1")]);
        assert_eq!(category_share(&item, d("3")), 33);
        let item = category(1, "Food", vec![total("USD", "1", "2")]);
        assert_eq!(category_share(&item, d("3")), 67);
        let item = category(1, "Food", vec![total("USD", "1", "1")]);
        assert_eq!(category_share(&item, d("8")), 13); // 12.5 rounds up
    }

    #[test]
    fn test_breakdown_percentages_sum_to_about_100() {
        let summary = ExpenseSummary {
            total_count: 6,
            totals_by_currency: vec![],
            total_by_category: vec![
                category(1, "Food", vec![total("USD", "1", "10")]),
                category(2, "Rent", vec![total("EUR", "1.08", "10")]),
                category(3, "Fun", vec![total("JPY", "150", "1500")]),
                category(4, "Unused", vec![]),
            ],
        };
        let rows = category_breakdown(&summary);
        assert_eq!(rows.len(), 4);
        let sum: u32 = rows.iter().map(|r| r.percent).sum();
        assert!((98..=102).contains(&sum), "sum was {sum}");
        assert_eq!(rows[3].percent, 0);
        assert_eq!(rows[3].breakdown, "");
        assert_eq!(rows[3].reference_total, Decimal::ZERO);
    }

    #[test]
    fn test_breakdown_all_zero_when_nothing_spent() {
        let summary = ExpenseSummary {
            total_count: 0,
            totals_by_currency: vec![],
            total_by_category: vec![category(1, "Food", vec![]), category(2, "Rent", vec![])],
        };
        let rows = category_breakdown(&summary);
        assert!(rows.iter().all(|r| r.percent == 0));
    }

    #[test]
    fn test_format_breakdown_uses_unconverted_amounts() {
        let item = category(
            1,
            "Travel",
            vec![total("USD", "1", "100"), total("JPY", "150", "15000")],
        );
        assert_eq!(format_breakdown(&item), "USD 100.00, JPY 15,000.00");

        let odd = category(2, "Odd", vec![total("XYZ", "1", "n/a")]);
        assert_eq!(format_breakdown(&odd), "XYZ n/a");
    }

    #[test]
    fn test_summary_totals() {
        let summary = ExpenseSummary {
            total_count: 3,
            totals_by_currency: vec![total("USD", "1", "100"), total("EUR", "1.08", "50")],
            total_by_category: vec![],
        };
        let totals = summary_totals(&summary);
        assert_eq!(totals.total_count, 3);
        assert_eq!(totals.reference_total, d("154"));
        assert_eq!(totals.by_currency, vec!["USD 100.00", "EUR 50.00"]);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(d("0")), "0.00");
        assert_eq!(format_amount(d("12.5")), "12.50");
        assert_eq!(format_amount(d("999.999")), "1,000.00");
        assert_eq!(format_amount(d("1234567.891")), "1,234,567.89");
        assert_eq!(format_amount(d("-1234.5")), "-1,234.50");
        assert_eq!(format_currency(d("54"), "USD"), "USD 54.00");
    }
}
