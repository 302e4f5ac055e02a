use super::{App, api_error, ui};
use crate::core::models::{Credentials, GoogleAuthRequest, SignupRequest, User};
use anyhow::{Context, Result, bail};
use console::Term;

fn read_password(given: Option<String>, prompt: &str) -> Result<String> {
    let password = match given {
        Some(password) => password,
        None => {
            let term = Term::stderr();
            term.write_str(prompt)?;
            term.read_secure_line().context("Failed to read password")?
        }
    };
    if password.is_empty() {
        bail!("Password must not be empty");
    }
    Ok(password)
}

fn describe_user(user: &User) -> String {
    format!(
        "{} <{}>",
        ui::style_text(&user.name, ui::StyleType::TotalLabel),
        user.email
    )
}

pub async fn signup(app: &App, email: &str, name: &str, password: Option<String>) -> Result<()> {
    let request = SignupRequest {
        email: email.trim().to_string(),
        password: read_password(password, "Choose a password: ")?,
        name: name.trim().to_string(),
    };
    let user = app.backend.signup(&request).await.map_err(api_error)?;
    println!(
        "{} Created account for {}. Run `spendlog login` to sign in.",
        ui::style_text("✓", ui::StyleType::Success),
        describe_user(&user)
    );
    Ok(())
}

pub async fn login(app: &App, email: &str, password: Option<String>) -> Result<()> {
    let credentials = Credentials {
        email: email.trim().to_string(),
        password: read_password(password, "Password: ")?,
    };
    let auth = app.backend.signin(&credentials).await.map_err(api_error)?;
    println!(
        "{} Signed in as {}",
        ui::style_text("✓", ui::StyleType::Success),
        describe_user(&auth.user)
    );
    Ok(())
}

/// Registers an account already verified by Google. Only available when a
/// Google client id is configured.
pub async fn login_google(
    app: &App,
    email: &str,
    provider_account_id: &str,
    name: Option<String>,
) -> Result<()> {
    if app.config.api.google_client_id.is_none() {
        bail!("Google sign-in is not configured. Set api.google_client_id first.");
    }
    let request = GoogleAuthRequest {
        email: email.trim().to_string(),
        name,
        provider: "google".to_string(),
        provider_account_id: provider_account_id.to_string(),
        image: None,
    };
    let auth = app
        .backend
        .google_auth(&request)
        .await
        .map_err(api_error)?;
    println!(
        "{} Signed in with Google as {}",
        ui::style_text("✓", ui::StyleType::Success),
        describe_user(&auth.user)
    );
    Ok(())
}

pub fn logout(app: &App) -> Result<()> {
    if app.backend.logout() {
        println!("Signed out.");
    } else {
        println!("{}", ui::style_text("Not signed in.", ui::StyleType::Subtle));
    }
    Ok(())
}

pub async fn profile(app: &App) -> Result<()> {
    let user = app.backend.profile().await.map_err(api_error)?;
    println!("{}", describe_user(&user));
    if let Some(created) = user.created_at {
        println!(
            "{}",
            ui::style_text(
                &format!("Member since {}", created.format("%Y-%m-%d")),
                ui::StyleType::Subtle
            )
        );
    }
    Ok(())
}
