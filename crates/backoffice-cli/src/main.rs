//! Backoffice CLI - talk to the admin backend from a terminal.
//!
//! Every request goes through the shared gateway, and every outcome is
//! reported through the notification queue, the same way the admin pages do.

mod app;

use std::io;

use anyhow::{bail, Context, Result};
use backoffice_core::Method;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;

const USAGE: &str = "\
Usage: backoffice <command>

Commands:
  login                        Prompt for a bearer token and store it
  logout                       Remove the stored token
  config                       Print the effective configuration
  get <target>...              GET one or more targets concurrently
  delete <target>              DELETE a target
  post|put|patch <target> [json]
                               Send a JSON body (defaults to {})

Targets are joined onto BACKOFFICE_BASE_URL unless they are absolute URLs.";

#[derive(Debug, PartialEq)]
enum Command {
    Login,
    Logout,
    ShowConfig,
    Get(Vec<String>),
    Delete(String),
    Send {
        method: Method,
        target: String,
        body: serde_json::Value,
    },
    Help,
}

impl Command {
    fn parse(args: &[String]) -> Result<Self> {
        let Some((command, rest)) = args.split_first() else {
            return Ok(Command::Help);
        };

        match command.as_str() {
            "login" => Ok(Command::Login),
            "logout" => Ok(Command::Logout),
            "config" => Ok(Command::ShowConfig),
            "help" | "--help" | "-h" => Ok(Command::Help),
            "get" => {
                if rest.is_empty() {
                    bail!("get needs at least one target");
                }
                Ok(Command::Get(rest.to_vec()))
            }
            "delete" => match rest {
                [target] => Ok(Command::Delete(target.clone())),
                _ => bail!("delete takes exactly one target"),
            },
            "post" | "put" | "patch" => {
                let method = match command.as_str() {
                    "post" => Method::POST,
                    "put" => Method::PUT,
                    _ => Method::PATCH,
                };
                let (target, body) = match rest {
                    [target] => (target.clone(), serde_json::json!({})),
                    [target, body] => {
                        let body = serde_json::from_str(body)
                            .with_context(|| format!("Request body is not valid JSON: {}", body))?;
                        (target.clone(), body)
                    }
                    _ => bail!("{} takes a target and an optional JSON body", command),
                };
                Ok(Command::Send { method, target, body })
            }
            other => bail!("Unknown command: {}", other),
        }
    }
}

/// Initialize the tracing subscriber for logging
fn init_tracing() -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let (writer, guard) = tracing_appender::non_blocking(io::stderr());

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = Command::parse(&args)?;
    if command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    let app = App::new()?;
    info!(base_url = %app.config().base_url, "Backoffice starting");

    match command {
        Command::Login => app.login(),
        Command::Logout => app.logout(),
        Command::ShowConfig => app.show_config(),
        Command::Get(targets) => app.get_all(&targets).await,
        Command::Delete(target) => app.delete(&target).await,
        Command::Send { method, target, body } => app.send(method, &target, body).await,
        Command::Help => Ok(()),
    }
}
