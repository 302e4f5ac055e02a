pub mod cli;
pub mod core;
pub mod providers;

pub use crate::core::config;

use crate::cli::categories::CategoryAction;
use crate::cli::currencies::CurrencyAction;
use crate::cli::expenses::ExpenseAction;
use crate::cli::{App, FilterArgs};
use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    Signup {
        email: String,
        name: String,
        password: Option<String>,
    },
    Login {
        email: String,
        password: Option<String>,
    },
    GoogleLogin {
        email: String,
        provider_account_id: String,
        name: Option<String>,
    },
    Logout,
    Profile,
    Dashboard(FilterArgs),
    Expenses(ExpenseAction),
    Categories(CategoryAction),
    Currencies(CurrencyAction),
}

/// Loads configuration (file, then environment) for a command run.
pub fn load_config(config_path: Option<&str>) -> Result<config::AppConfig> {
    let config = match config_path {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load()?,
    };
    let config = config.with_env_overrides(|key| std::env::var(key).ok());
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    info!("Using backend at {}", config.api.base_url);
    let app = App::new(config)?;
    execute(&app, command).await
}

pub async fn execute(app: &App, command: AppCommand) -> Result<()> {
    match command {
        AppCommand::Signup {
            email,
            name,
            password,
        } => cli::auth::signup(app, &email, &name, password).await,
        AppCommand::Login { email, password } => cli::auth::login(app, &email, password).await,
        AppCommand::GoogleLogin {
            email,
            provider_account_id,
            name,
        } => cli::auth::login_google(app, &email, &provider_account_id, name).await,
        AppCommand::Logout => cli::auth::logout(app),
        AppCommand::Profile => cli::auth::profile(app).await,
        AppCommand::Dashboard(filters) => cli::dashboard::run(app, &filters).await,
        AppCommand::Expenses(action) => cli::expenses::run(app, action).await,
        AppCommand::Categories(action) => cli::categories::run(app, action).await,
        AppCommand::Currencies(action) => cli::currencies::run(app, action).await,
    }
}
