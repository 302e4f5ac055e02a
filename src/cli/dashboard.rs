use super::expenses::expense_table;
use super::{App, FilterArgs, ui};
use crate::core::analytics::{format_amount, format_currency};
use crate::core::dashboard::{Dashboard, DashboardData, LoadOutcome};
use crate::core::filters::{ExpenseFilters, FilterState};
use anyhow::{Context, Result, bail};
use chrono::Utc;
use comfy_table::{Cell, CellAlignment};

impl DashboardData {
    pub fn display(&self, period: &str) -> String {
        let totals = self.totals();
        let mut output = format!(
            "{} {}\n\n",
            ui::style_text("Overview", ui::StyleType::Title),
            ui::style_text(&format!("({period})"), ui::StyleType::Subtle)
        );

        output.push_str(&format!(
            "{} {}\n{} {}\n",
            ui::style_text("Expenses:", ui::StyleType::TotalLabel),
            totals.total_count,
            ui::style_text("Total:", ui::StyleType::TotalLabel),
            ui::style_text(
                &format_currency(totals.reference_total, "USD"),
                ui::StyleType::TotalValue
            ),
        ));
        if !totals.by_currency.is_empty() {
            output.push_str(&format!(
                "{}\n",
                ui::style_text(&totals.by_currency.join(", "), ui::StyleType::Subtle)
            ));
        }

        let shares = self.category_shares();
        if !shares.is_empty() {
            let mut table = ui::new_styled_table();
            table.set_header(vec![
                ui::header_cell("Category"),
                ui::header_cell("Expenses"),
                ui::header_cell("Total (USD)"),
                ui::header_cell("Share"),
                ui::header_cell("By currency"),
            ]);
            for share in &shares {
                table.add_row(vec![
                    ui::category_cell(&share.category.name, share.category.color.as_deref()),
                    Cell::new(share.total_count).set_alignment(CellAlignment::Right),
                    ui::amount_cell(format_amount(share.reference_total)),
                    ui::percent_cell(share.percent),
                    Cell::new(&share.breakdown),
                ]);
            }
            output.push_str(&format!(
                "\n{}\n{table}\n",
                ui::style_text("By category", ui::StyleType::TotalLabel)
            ));
        }

        output.push_str(&format!(
            "\n{}\n",
            ui::style_text("Recent expenses", ui::StyleType::TotalLabel)
        ));
        if self.expenses.is_empty() {
            output.push_str(&ui::style_text("Nothing recorded yet.", ui::StyleType::Subtle));
        } else {
            output.push_str(
                &expense_table(&self.expenses, &self.categories, &self.currencies).to_string(),
            );
        }
        output
    }
}

pub async fn run(app: &App, args: &FilterArgs) -> Result<()> {
    app.require_session()?;

    let state = FilterState::new(ExpenseFilters::with_limit(app.config.recent_limit));
    args.apply(&state, Utc::now());
    let dashboard = Dashboard::new(app.backend.clone(), app.config.cache_ttl());

    let pb = ui::new_spinner("Loading dashboard...");
    let outcome = dashboard.load(&state.current()).await;
    pb.finish_and_clear();

    if let LoadOutcome::Failed(message) = outcome {
        bail!(message);
    }
    let data = dashboard
        .state()
        .await
        .data
        .context("Dashboard finished without data")?;
    println!("{}", data.display(&args.describe()));
    Ok(())
}
