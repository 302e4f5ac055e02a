use super::{App, api_error, confirm_write, ui};
use crate::core::conversion::{RateDirection, parse_rate};
use crate::core::models::{Currency, CurrencyUpdate, NewCurrency};
use anyhow::Result;
use clap::Subcommand;
use comfy_table::Cell;
use rust_decimal::Decimal;

#[derive(Subcommand, Debug, Clone)]
pub enum CurrencyAction {
    /// List currencies and how their rates are read
    List,
    /// Create a currency
    Add {
        #[arg(long)]
        name: String,
        /// Exchange rate against USD
        #[arg(long, allow_negative_numbers = true)]
        rate: Decimal,
        /// usd-per-unit or units-per-usd; inferred from the rate when omitted
        #[arg(long)]
        direction: Option<RateDirection>,
    },
    /// Change fields of a currency
    Edit {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        rate: Option<Decimal>,
        #[arg(long)]
        direction: Option<RateDirection>,
    },
    /// Delete a currency
    Delete { id: i64 },
}

/// How the rate is read, marking directions guessed from magnitude.
fn direction_label(currency: &Currency) -> String {
    match (currency.rate_direction, parse_rate(&currency.usd_exchange_rate)) {
        (Some(direction), _) => direction.to_string(),
        (None, Some(rate)) => format!("{} (inferred)", RateDirection::infer(rate)),
        (None, None) => "invalid rate".to_string(),
    }
}

pub fn render(currencies: &[Currency]) -> String {
    if currencies.is_empty() {
        return ui::style_text("No currencies yet.", ui::StyleType::Subtle);
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Id"),
        ui::header_cell("Name"),
        ui::header_cell("Rate (USD)"),
        ui::header_cell("Direction"),
    ]);
    for currency in currencies {
        table.add_row(vec![
            Cell::new(currency.id),
            Cell::new(&currency.name),
            ui::amount_cell(currency.usd_exchange_rate.clone()),
            Cell::new(direction_label(currency)),
        ]);
    }
    table.to_string()
}

pub async fn run(app: &App, action: CurrencyAction) -> Result<()> {
    app.require_session()?;
    match action {
        CurrencyAction::List => {
            let pb = ui::new_spinner("Fetching currencies...");
            let currencies = app.backend.currencies().await;
            pb.finish_and_clear();
            println!("{}", render(&currencies.map_err(api_error)?));
        }
        CurrencyAction::Add {
            name,
            rate,
            direction,
        } => {
            let requested = format!("currency {name}");
            let currency = app
                .backend
                .create_currency(NewCurrency {
                    name,
                    usd_exchange_rate: rate,
                    rate_direction: direction,
                })
                .await
                .map_err(api_error)?;
            confirm_write(
                "Created",
                currency.map(|c| {
                    format!("currency #{} {} ({})", c.id, c.name, direction_label(&c))
                }),
                requested,
            );
        }
        CurrencyAction::Edit {
            id,
            name,
            rate,
            direction,
        } => {
            let currency = app
                .backend
                .update_currency(
                    id,
                    CurrencyUpdate {
                        name,
                        usd_exchange_rate: rate,
                        rate_direction: direction,
                    },
                )
                .await
                .map_err(api_error)?;
            confirm_write(
                "Updated",
                currency.map(|c| format!("currency #{} {}", c.id, c.name)),
                format!("currency #{id}"),
            );
        }
        CurrencyAction::Delete { id } => {
            app.backend.delete_currency(id).await.map_err(api_error)?;
            println!("Deleted currency #{id}");
        }
    }
    Ok(())
}
