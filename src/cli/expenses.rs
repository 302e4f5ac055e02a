use super::{App, FilterArgs, api_error, confirm_write, day_start, ui};
use crate::core::analytics::{
    format_amount, format_currency, format_currency_total, total_in_reference_unit,
};
use crate::core::filters::{ExpenseFilters, FilterState};
use crate::core::models::{Category, Currency, Expense, ExpensePage, ExpenseUpdate, NewExpense};
use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use comfy_table::{Cell, Table};
use rust_decimal::Decimal;

#[derive(Subcommand, Debug, Clone)]
pub enum ExpenseAction {
    /// List expenses one page at a time
    List {
        #[command(flatten)]
        filters: FilterArgs,
        /// Page to show, starting at 1
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Record a new expense
    Add {
        #[arg(long, allow_negative_numbers = true)]
        amount: Decimal,
        /// Category id
        #[arg(long)]
        category: i64,
        /// Currency id
        #[arg(long)]
        currency: i64,
        #[arg(long)]
        description: Option<String>,
        /// Day of the expense (YYYY-MM-DD); defaults to now
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Change fields of an existing expense
    Edit {
        id: i64,
        #[arg(long, allow_negative_numbers = true)]
        amount: Option<Decimal>,
        #[arg(long)]
        category: Option<i64>,
        #[arg(long)]
        currency: Option<i64>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Delete an expense
    Delete { id: i64 },
}

fn category_name(expense: &Expense, categories: &[Category]) -> (String, Option<String>) {
    if let Some(category) = &expense.category {
        return (category.name.clone(), category.color.clone());
    }
    categories
        .iter()
        .find(|c| c.id == expense.category_id)
        .map(|c| (c.name.clone(), c.color.clone()))
        .unwrap_or_else(|| (format!("#{} (deleted)", expense.category_id), None))
}

fn currency_name(expense: &Expense, currencies: &[Currency]) -> String {
    if let Some(currency) = &expense.currency {
        return currency.name.clone();
    }
    currencies
        .iter()
        .find(|c| c.id == expense.currency_id)
        .map_or_else(|| format!("#{}", expense.currency_id), |c| c.name.clone())
}

/// Expense rows with names resolved from the embedded records or the lists.
pub fn expense_table(
    expenses: &[Expense],
    categories: &[Category],
    currencies: &[Currency],
) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Id"),
        ui::header_cell("Date"),
        ui::header_cell("Description"),
        ui::header_cell("Category"),
        ui::header_cell("Amount"),
    ]);

    for expense in expenses {
        let (category, color) = category_name(expense, categories);
        table.add_row(vec![
            Cell::new(expense.id),
            Cell::new(expense.date.format("%Y-%m-%d")),
            ui::optional_cell(expense.description.as_deref(), str::to_string),
            ui::category_cell(&category, color.as_deref()),
            ui::amount_cell(format_currency(
                expense.amount,
                &currency_name(expense, currencies),
            )),
        ]);
    }
    table
}

pub fn render_page(page: &ExpensePage, categories: &[Category], currencies: &[Currency]) -> String {
    if page.expenses.is_empty() {
        return ui::style_text("No expenses match these filters.", ui::StyleType::Subtle);
    }

    let mut output = expense_table(&page.expenses, categories, currencies).to_string();

    if !page.totals_by_currency.is_empty() {
        let by_currency = page
            .totals_by_currency
            .iter()
            .map(format_currency_total)
            .collect::<Vec<_>>()
            .join(", ");
        let reference = total_in_reference_unit(&page.totals_by_currency);
        output.push_str(&format!(
            "\n\n{} {} ({} USD)",
            ui::style_text("Totals:", ui::StyleType::TotalLabel),
            by_currency,
            ui::style_text(&format_amount(reference), ui::StyleType::TotalValue)
        ));
    }

    if let Some(p) = page.pagination {
        output.push_str(&format!(
            "\n{}",
            ui::style_text(
                &format!(
                    "Page {} of {} ({} expenses)",
                    p.page,
                    p.total_pages.max(1),
                    p.total
                ),
                ui::StyleType::Subtle
            )
        ));
    }
    output
}

async fn list(app: &App, args: &FilterArgs, page: u32) -> Result<()> {
    app.require_session()?;
    let state = FilterState::new(ExpenseFilters::with_limit(app.config.page_size));
    args.apply(&state, Utc::now());
    state.set_page(page);
    let filters = state.current();

    let pb = ui::new_spinner("Fetching expenses...");
    let result = futures::try_join!(
        app.backend.expenses(&filters),
        app.backend.categories(),
        app.backend.currencies(),
    );
    pb.finish_and_clear();
    let (page, categories, currencies) = result.map_err(api_error)?;

    println!(
        "{} {}\n",
        ui::style_text("Expenses", ui::StyleType::Title),
        ui::style_text(&format!("({})", args.describe()), ui::StyleType::Subtle)
    );
    println!("{}", render_page(&page, &categories, &currencies));
    Ok(())
}

pub async fn run(app: &App, action: ExpenseAction) -> Result<()> {
    match action {
        ExpenseAction::List { filters, page } => list(app, &filters, page).await,
        ExpenseAction::Add {
            amount,
            category,
            currency,
            description,
            date,
        } => {
            app.require_session()?;
            let payload = NewExpense {
                amount,
                description,
                date: date.map(day_start),
                category_id: category,
                currency_id: currency,
            };
            let expense = app
                .backend
                .create_expense(payload)
                .await
                .map_err(api_error)?;
            confirm_write(
                "Recorded",
                expense.map(|e| format!("expense #{} of {}", e.id, format_amount(e.amount))),
                format!("expense of {}", format_amount(amount)),
            );
            Ok(())
        }
        ExpenseAction::Edit {
            id,
            amount,
            category,
            currency,
            description,
            date,
        } => {
            app.require_session()?;
            let payload = ExpenseUpdate {
                amount,
                description,
                date: date.map(day_start),
                category_id: category,
                currency_id: currency,
            };
            let expense = app
                .backend
                .update_expense(id, payload)
                .await
                .map_err(api_error)?;
            confirm_write(
                "Updated",
                expense.map(|e| format!("expense #{}", e.id)),
                format!("expense #{id}"),
            );
            Ok(())
        }
        ExpenseAction::Delete { id } => {
            app.require_session()?;
            app.backend.delete_expense(id).await.map_err(api_error)?;
            println!("Deleted expense #{id}");
            Ok(())
        }
    }
}
