//! GameSpace CLI - account and session management for the GameSpace backend.
//!
//! The session is restored from local storage once at startup and every
//! command reaches it through `use_auth()`.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gamespace_core::pages::{LoginForm, RegisterForm};
use gamespace_core::storage::STORAGE_FILE;
use gamespace_core::{use_auth, ApiClient, AuthContext, AuthProvider, AuthState, Config, LocalStorage};

#[derive(Parser, Debug)]
#[command(name = "gamespace", version, about = "GameSpace account client")]
struct Cli {
    /// Backend base URL, e.g. http://127.0.0.1:8000/api
    #[arg(long, env = "GAMESPACE_API_URL", global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new account
    Register {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },

    /// Log in and store the session
    Login {
        #[arg(long)]
        username: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Exchange the refresh token for a new access token
    Refresh,

    /// Fetch the current user's profile from the backend
    Profile,
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing();

    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };

    let base_url = cli.api_url.clone().unwrap_or_else(|| config.base_url());
    let storage_path = config
        .storage_path()
        .unwrap_or_else(|_| PathBuf::from(".").join(STORAGE_FILE));
    let storage = LocalStorage::open(&storage_path)?;

    let api = ApiClient::new(base_url, storage)?;
    let auth = AuthContext::new(api);
    let state = auth.mount();
    info!(authenticated = matches!(state, AuthState::Authenticated(_)), "Session mounted");

    AuthProvider::scope(auth, run(cli.cmd, &mut config)).await
}

async fn run(cmd: Command, config: &mut Config) -> Result<ExitCode> {
    let auth = use_auth();

    match cmd {
        Command::Register { username, email } => {
            let mut form = RegisterForm::new();
            form.username = match username {
                Some(u) => u,
                None => prompt("Username")?,
            };
            form.email = match email {
                Some(e) => e,
                None => prompt("Email")?,
            };
            form.password = prompt_password()?;

            match form.submit(auth.api()).await {
                Some(route) => {
                    println!("Account created. Continue at {} (gamespace login).", route.path());
                    Ok(ExitCode::SUCCESS)
                }
                None => fail(form.error.as_deref()),
            }
        }

        Command::Login { username } => {
            let username = match (username, config.last_username.as_deref()) {
                (Some(u), _) => u,
                (None, Some(last_user)) => prompt_with_default("Username", last_user)?,
                (None, None) => prompt("Username")?,
            };
            let mut form = LoginForm::new(username);
            form.password = prompt_password()?;

            match form.submit(&auth).await {
                Some(_) => {
                    config.last_username = Some(form.username.clone());
                    if let Err(e) = config.save() {
                        warn!(error = %e, "Failed to save config");
                    }
                    if let Some(user) = auth.user() {
                        println!("Logged in as {} ({})", user.username, user.role);
                    }
                    Ok(ExitCode::SUCCESS)
                }
                None => fail(form.error.as_deref()),
            }
        }

        Command::Logout => match auth.logout() {
            Ok(()) => {
                println!("Logged out");
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => fail(Some(&format!("{:#}", e))),
        },

        Command::Whoami => {
            match auth.user() {
                Some(user) => println!("{} (id {}, {})", user.username, user.id, user.role),
                None => println!("Not logged in"),
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Refresh => match auth.refresh().await {
            Ok(()) => {
                println!("Access token refreshed");
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => fail(Some(&e.to_string())),
        },

        Command::Profile => match auth.api().fetch_profile().await {
            Ok(profile) => {
                println!("{}", serde_json::to_string_pretty(&profile)?);
                println!("Member since {}", profile.joined_display());
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => fail(Some(&e.to_string())),
        },
    }
}

fn fail(message: Option<&str>) -> Result<ExitCode> {
    eprintln!("Error: {}", message.unwrap_or_default());
    Ok(ExitCode::FAILURE)
}

fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Prompt showing `default` in brackets; empty input keeps the default
fn prompt_with_default(label: &str, default: &str) -> Result<String> {
    print!("{} [{}]: ", label, default);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(or_default(&input, default))
}

fn or_default(input: &str, default: &str) -> String {
    let input = input.trim();
    if input.is_empty() {
        default.to_string()
    } else {
        input.to_string()
    }
}

fn prompt_password() -> Result<String> {
    let password = rpassword::prompt_password("Password: ")?;
    Ok(password)
}
