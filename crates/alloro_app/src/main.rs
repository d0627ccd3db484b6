mod app;
mod config;
mod effects;
mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use alloro_core::JobId;
use alloro_engine::EngineHandle;
use alloro_logging::{alloro_error, alloro_info};
use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::app::Session;
use crate::config::Overrides;

/// Checkout session id used when the browser did not hand one back.
const DEFAULT_CHECKOUT_SESSION: &str = "checkout";

#[derive(Parser, Debug)]
#[command(name = "alloro")]
#[command(about = "Follow Alloro ranking and billing jobs from the terminal", long_about = None)]
struct Cli {
    /// RON config file (defaults to ./alloro.ron when present)
    #[arg(long, global = true, env = "ALLORO_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the Alloro API
    #[arg(long, global = true, env = "ALLORO_BASE_URL")]
    base_url: Option<String>,

    /// Session bearer token
    #[arg(long, global = true, env = "ALLORO_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Account id sent with every request
    #[arg(long, global = true, env = "ALLORO_ACCOUNT_ID")]
    account_id: Option<String>,

    /// Session role: admin or user
    #[arg(long, global = true)]
    role: Option<String>,

    /// Log destination: terminal, file, both or off
    #[arg(long, global = true)]
    log: Option<String>,

    /// Log level: error, warn, info, debug or trace
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Trigger a ranking analysis and follow it until it finishes
    Rank {
        /// Practice (Google Business Profile) name
        practice: String,

        #[arg(long)]
        location: Option<String>,
    },

    /// Follow an already running ranking job
    WatchRanking {
        job_id: String,
    },

    /// Confirm the subscription after checkout, then finish onboarding
    ConfirmBilling {
        #[arg(long)]
        session_id: Option<String>,
    },
}

impl Commands {
    fn into_session(self) -> Session {
        match self {
            Commands::Rank { practice, location } => Session::Rank {
                practice_name: practice,
                location,
            },
            Commands::WatchRanking { job_id } => Session::WatchRanking {
                job_id: JobId::from(job_id.trim()),
            },
            Commands::ConfirmBilling { session_id } => Session::ConfirmBilling {
                job_id: JobId::from(
                    session_id
                        .as_deref()
                        .map(str::trim)
                        .filter(|id| !id.is_empty())
                        .unwrap_or(DEFAULT_CHECKOUT_SESSION),
                ),
            },
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            alloro_error!("{:#}", err);
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let file = config::load(cli.config.as_deref())?;
    let source = file.source.clone();
    let resolved = file.resolve(Overrides {
        base_url: cli.base_url,
        token: cli.token,
        role: cli.role,
        account_id: cli.account_id,
        log: cli.log,
        log_level: cli.log_level,
    })?;
    alloro_logging::initialize(resolved.log, resolved.log_level);
    if let Some(path) = source {
        alloro_info!("Loaded config from {:?}", path);
    }
    alloro_info!("alloro starting against {}", resolved.engine.api.base_url);

    let engine =
        EngineHandle::new(resolved.engine, resolved.session).context("failed to start engine")?;
    let outcome = app::run(engine, cli.command.into_session()).context("terminal output failed")?;
    Ok(outcome.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_rank_with_global_flags() {
        let cli = Cli::try_parse_from([
            "alloro",
            "rank",
            "Bright Smiles",
            "--location",
            "Austin, TX",
            "--role",
            "admin",
        ])
        .unwrap();
        assert_eq!(cli.role.as_deref(), Some("admin"));
        assert_eq!(
            cli.command.into_session(),
            Session::Rank {
                practice_name: "Bright Smiles".to_string(),
                location: Some("Austin, TX".to_string()),
            }
        );
    }

    #[test]
    fn confirm_billing_defaults_session_id() {
        let cli = Cli::try_parse_from(["alloro", "confirm-billing"]).unwrap();
        assert_eq!(
            cli.command.into_session(),
            Session::ConfirmBilling {
                job_id: JobId::from(DEFAULT_CHECKOUT_SESSION),
            }
        );
        let args = ["alloro", "confirm-billing", "--session-id", "cs_live_9"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(
            cli.command.into_session(),
            Session::ConfirmBilling {
                job_id: JobId::from("cs_live_9"),
            }
        );
    }

    #[test]
    fn watch_ranking_takes_a_job_id() {
        let cli = Cli::try_parse_from(["alloro", "watch-ranking", "42"]).unwrap();
        assert_eq!(
            cli.command.into_session(),
            Session::WatchRanking {
                job_id: JobId::from(42u64),
            }
        );
    }
}
