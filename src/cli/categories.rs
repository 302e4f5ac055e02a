use super::{App, api_error, confirm_write, ui};
use crate::core::models::{Category, CategoryUpdate, NewCategory};
use anyhow::Result;
use clap::Subcommand;
use comfy_table::{Cell, CellAlignment};

#[derive(Subcommand, Debug, Clone)]
pub enum CategoryAction {
    /// List categories with their expense counts
    List,
    /// Create a category
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Color as #RRGGBB
        #[arg(long)]
        color: Option<String>,
    },
    /// Change fields of a category
    Edit {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Color as #RRGGBB
        #[arg(long)]
        color: Option<String>,
    },
    /// Delete a category; its expenses are kept
    Delete { id: i64 },
}

pub fn render(categories: &[Category]) -> String {
    if categories.is_empty() {
        return ui::style_text("No categories yet.", ui::StyleType::Subtle);
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Id"),
        ui::header_cell("Name"),
        ui::header_cell("Color"),
        ui::header_cell("Description"),
        ui::header_cell("Expenses"),
    ]);
    for category in categories {
        table.add_row(vec![
            Cell::new(category.id),
            ui::category_cell(&category.name, category.color.as_deref()),
            ui::optional_cell(category.color.as_deref(), str::to_string),
            ui::optional_cell(category.description.as_deref(), str::to_string),
            Cell::new(category.expense_count()).set_alignment(CellAlignment::Right),
        ]);
    }
    table.to_string()
}

pub async fn run(app: &App, action: CategoryAction) -> Result<()> {
    app.require_session()?;
    match action {
        CategoryAction::List => {
            let pb = ui::new_spinner("Fetching categories...");
            let categories = app.backend.categories().await;
            pb.finish_and_clear();
            println!("{}", render(&categories.map_err(api_error)?));
        }
        CategoryAction::Add {
            name,
            description,
            color,
        } => {
            let requested = format!("category {name}");
            let category = app
                .backend
                .create_category(NewCategory {
                    name,
                    description,
                    color,
                })
                .await
                .map_err(api_error)?;
            confirm_write(
                "Created",
                category.map(|c| format!("category #{} {}", c.id, c.name)),
                requested,
            );
        }
        CategoryAction::Edit {
            id,
            name,
            description,
            color,
        } => {
            let category = app
                .backend
                .update_category(
                    id,
                    CategoryUpdate {
                        name,
                        description,
                        color,
                    },
                )
                .await
                .map_err(api_error)?;
            confirm_write(
                "Updated",
                category.map(|c| format!("category #{} {}", c.id, c.name)),
                format!("category #{id}"),
            );
        }
        CategoryAction::Delete { id } => {
            let linked = app
                .backend
                .categories()
                .await
                .map_err(api_error)?
                .iter()
                .find(|c| c.id == id)
                .map_or(0, Category::expense_count);
            app.backend.delete_category(id).await.map_err(api_error)?;
            println!("Deleted category #{id}");
            if linked > 0 {
                println!(
                    "{}",
                    ui::style_text(
                        &format!("{linked} expense(s) keep their reference to category #{id}"),
                        ui::StyleType::Subtle
                    )
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ExpenseCount;

    #[test]
    fn test_render_categories() {
        let categories = vec![Category {
            id: 3,
            name: "Groceries".to_string(),
            description: Some("Weekly shop".to_string()),
            color: Some("#22C55E".to_string()),
            user_id: Some(1),
            created_at: None,
            updated_at: None,
            count: Some(ExpenseCount { expenses: 12 }),
        }];
        let output = render(&categories);
        assert!(output.contains("Groceries"));
        assert!(output.contains("#22C55E"));
        assert!(output.contains("12"));
        assert!(render(&[]).contains("No categories"));
    }
}
