use clap::{Parser, Subcommand};
use dashboard_client::config::get_configuration;
use dashboard_client::services::api_client::ApiClient;
use dashboard_client::session::FileCredentialStore;
use dashboard_client::{ApiError, AppState};
use dotenvy::dotenv;
use reqwest::Method;
use serde::Serialize;
use service_core::observability::init_tracing;
use std::ffi::OsString;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "dashboard-cli", about = "Command-line access to the sales dashboard API")]
struct Cli {
    #[command(subcommand)]
    command: Command,
    /// Dump request and renewal counters to stderr when done
    #[arg(long, global = true)]
    metrics: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and persist the session
    Login {
        email: String,
        #[arg(long, env = "DASHBOARD_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Revoke the session on the server and forget it locally
    Logout,
    /// Show the logged-in user
    Whoami {
        /// Fetch a fresh profile instead of the cached one
        #[arg(long)]
        refresh: bool,
    },
    /// Yearly revenue retrospective
    Retrospective { year: i32 },
    /// Seller comparison for a year
    Sellers { year: i32 },
    /// Strategy scenarios
    Strategies,
    /// Weekly management entries
    Weekly,
    /// Operating protocols
    Protocols,
    /// Authenticated GET of an arbitrary API path
    Get { path: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = parse_cli(None, std::env::args_os()).unwrap_or_else(|e| e.exit());

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(
        "dashboard-cli",
        &configuration.telemetry.log_level,
        configuration.telemetry.otlp_endpoint.as_deref(),
    );

    let store = Arc::new(FileCredentialStore::new(
        configuration.session.path.clone(),
        &configuration.session.namespace,
    ));
    let api = Arc::new(ApiClient::new(&configuration.api, store)?);
    let state = AppState::new(api);

    let outcome = run(&state, cli.command).await;
    if cli.metrics {
        eprint!("{}", state.api.metrics().render());
    }

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => report(e).map(ExitCode::from),
    }
}

/// Load `.env` when present, then parse arguments. The order matters: `.env`
/// may supply env-backed arguments such as `DASHBOARD_PASSWORD`.
fn parse_cli<I, T>(env_file: Option<&Path>, args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let _ = match env_file {
        Some(path) => dotenvy::from_path(path),
        None => dotenv().map(|_| ()),
    };
    Cli::try_parse_from(args)
}

/// Exit status for failures the user can act on; anything else propagates.
/// 2 means log in again, 1 means the credentials were wrong.
fn report(error: ApiError) -> anyhow::Result<u8> {
    match error {
        e if e.is_session_expired() => {
            eprintln!("Session expired, please log in again ({})", e);
            Ok(2)
        }
        ApiError::InvalidCredentials(detail) => {
            eprintln!("Login failed: {}", detail);
            Ok(1)
        }
        e => Err(anyhow::anyhow!(e)),
    }
}

async fn run(state: &AppState, command: Command) -> Result<(), ApiError> {
    match command {
        Command::Login { email, password } => {
            let profile = state.api.login(&email, &password).await?;
            println!("Logged in as {} <{}>", profile.display_name(), profile.email);
        }
        Command::Logout => {
            state.api.logout().await?;
            println!("Logged out");
        }
        Command::Whoami { refresh } => {
            let profile = if refresh {
                Some(state.users.me().await?)
            } else {
                state.api.session().await.map(|session| session.profile)
            };
            match profile {
                Some(profile) => print_json(&profile),
                None => println!("Not logged in"),
            }
        }
        Command::Retrospective { year } => {
            print_json(&state.dashboard.retrospective(year).await?);
        }
        Command::Sellers { year } => {
            print_json(&state.dashboard.seller_comparison(year).await?);
        }
        Command::Strategies => print_json(&state.dashboard.strategies(&[]).await?),
        Command::Weekly => print_json(&state.dashboard.weekly_entries(&[]).await?),
        Command::Protocols => print_json(&state.dashboard.protocols().await?),
        Command::Get { path } => {
            let response = state.api.request(Method::GET, &path, None).await?;
            let status = response.status();
            let body = response.text().await?;
            eprintln!("{}", status);
            println!("{}", body);
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    println!("{}", json);
}
