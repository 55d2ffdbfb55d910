//! Sessiongate demo CLI.
//!
//! Restores a persisted session (refreshing the access token when needed),
//! prompts for credentials when no session survives, and prints the
//! resulting state plus a sample navigation guard decision.

use std::io::{self, Write};
use std::time::Duration;

use anyhow::Result;
use serde_json::json;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sessiongate::api::{ApiError, AuthClient};
use sessiongate::auth::{FileStore, SessionStore};
use sessiongate::config::Config;
use sessiongate::router::{NavDecision, Router};

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn prompt_line(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    info!("Sessiongate demo starting");

    let mut config = Config::load()?;
    let client = AuthClient::new(config.effective_base_url())?;
    let bundle = FileStore::new(Config::bundle_dir()?);
    let session = SessionStore::with_check_interval(
        client,
        Box::new(bundle),
        Duration::from_secs(config.check_interval_secs),
    );

    session.initialize_auth().await;

    if !session.is_authenticated() {
        println!("No stored session; please log in.");
        let default_email = config.last_username.clone().unwrap_or_default();
        let label = if default_email.is_empty() {
            "Email".to_string()
        } else {
            format!("Email [{}]", default_email)
        };
        let mut email = prompt_line(&label)?;
        if email.is_empty() {
            email = default_email;
        }
        let password = rpassword::prompt_password("Password: ")?;

        match session.login(&json!({ "email": email, "password": password })).await {
            Ok(()) => {
                config.last_username = Some(email);
                config.save()?;
            }
            Err(ApiError::CredentialsRejected(payload)) => {
                eprintln!("Login rejected: {}", payload);
                return Ok(());
            }
            Err(e) => {
                eprintln!("Login failed: {}", e);
                return Ok(());
            }
        }
    }

    let state = session.state();
    println!("Authenticated: {}", state.is_authenticated);
    if let Some(user) = state.user {
        println!("User: {}", user);
    }

    let router = Router::with_default_routes();
    match router.before_navigation(&session, "/dashboard") {
        NavDecision::Allow => println!("Navigation to /dashboard: allowed"),
        NavDecision::Redirect(to) => println!("Navigation to /dashboard: redirected to {}", to),
    }

    session.dispose();
    info!("Sessiongate demo shutting down");
    Ok(())
}
