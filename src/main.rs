use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use spendlog::cli::FilterArgs;
use spendlog::cli::categories::CategoryAction;
use spendlog::cli::currencies::CurrencyAction;
use spendlog::cli::expenses::ExpenseAction;
use spendlog::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for spendlog::AppCommand {
    fn from(cmd: Commands) -> spendlog::AppCommand {
        match cmd {
            Commands::Signup {
                email,
                name,
                password,
            } => spendlog::AppCommand::Signup {
                email,
                name,
                password,
            },
            Commands::Login {
                email,
                password,
                google_account,
                name,
            } => match google_account {
                Some(provider_account_id) => spendlog::AppCommand::GoogleLogin {
                    email,
                    provider_account_id,
                    name,
                },
                None => spendlog::AppCommand::Login { email, password },
            },
            Commands::Logout => spendlog::AppCommand::Logout,
            Commands::Profile => spendlog::AppCommand::Profile,
            Commands::Dashboard(filters) => spendlog::AppCommand::Dashboard(filters),
            Commands::Expenses { action } => spendlog::AppCommand::Expenses(action),
            Commands::Categories { action } => spendlog::AppCommand::Categories(action),
            Commands::Currencies { action } => spendlog::AppCommand::Currencies(action),
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Create an account
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign in and remember the session
    Login {
        #[arg(long)]
        email: String,
        /// Prompted for when omitted
        #[arg(long, conflicts_with = "google_account")]
        password: Option<String>,
        /// Sign in with a Google account id instead of a password
        #[arg(long)]
        google_account: Option<String>,
        /// Display name for Google sign-in
        #[arg(long, requires = "google_account")]
        name: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Profile,
    /// Show totals, category shares and recent expenses
    Dashboard(FilterArgs),
    /// Manage expenses
    Expenses {
        #[command(subcommand)]
        action: ExpenseAction,
    },
    /// Manage categories
    Categories {
        #[command(subcommand)]
        action: CategoryAction,
    },
    /// Manage currencies
    Currencies {
        #[command(subcommand)]
        action: CurrencyAction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => spendlog::cli::setup::setup_at_path(path),
            None => spendlog::cli::setup::setup(),
        },
        Some(cmd) => spendlog::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Command failed");
    }
    result
}
