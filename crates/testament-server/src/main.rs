//! Testament keeper: watches an estate database and fires the dead-man's
//! switch once the owner has missed the check-in interval.
//!
//! ```bash
//! testament-server -c keeper.toml --init <OWNER>   # create the estate
//! testament-server -c keeper.toml                  # watch until settled
//! testament-server -c keeper.toml --check          # one cycle (cron)
//! ```

mod config;
mod daemon;

use anyhow::{Context, Result};
use config::ServerConfig;
use std::path::{Path, PathBuf};
use testament_core::Principal;

const DEFAULT_CONFIG: &str = "/config/testament-server.toml";

#[derive(Debug, PartialEq)]
enum Command {
    Watch,
    Check,
    Validate,
    Init(Principal),
    Help,
    Version,
}

#[derive(Debug, PartialEq)]
struct Cli {
    config_path: PathBuf,
    command: Command,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Cli> {
    let mut config_path = PathBuf::from(DEFAULT_CONFIG);
    let mut command = Command::Watch;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        command = match arg.as_str() {
            "--config" | "-c" => {
                let path = args.next().context("--config requires a path")?;
                config_path = PathBuf::from(path);
                continue;
            }
            "--init" => {
                let owner = args.next().context("--init requires an owner principal")?;
                Command::Init(owner.parse::<Principal>().context("Invalid owner principal")?)
            }
            "--check" | "--once" => Command::Check,
            "--validate" => Command::Validate,
            "--help" | "-h" => Command::Help,
            "--version" | "-V" => Command::Version,
            other => anyhow::bail!("Unknown argument: {}", other),
        };
    }
    Ok(Cli {
        config_path,
        command,
    })
}

fn load_config(path: &Path) -> Result<ServerConfig> {
    let mut config = ServerConfig::from_file(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    config.apply_env_overrides();
    config
        .validate()
        .context("Configuration validation failed")?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = parse_args(std::env::args().skip(1))?;
    match cli.command {
        Command::Help => {
            print_help();
            return Ok(());
        }
        Command::Version => {
            println!("testament-server {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    let config = load_config(&cli.config_path)?;
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(&config.server.log_level),
    )
    .init();

    match cli.command {
        Command::Validate => {
            println!(
                "Configuration is valid: keeper {}, checking {} every {}s",
                config.keeper.identity,
                config.db_path().display(),
                config.server.check_interval_secs
            );
            Ok(())
        }
        Command::Init(owner) => {
            daemon::initialize_estate(&config, owner)?;
            println!("Estate created for owner {}", owner);
            Ok(())
        }
        Command::Check => {
            let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
            let outcome = rt.block_on(daemon::run_check_cycle(&config))?;
            log::info!("Done: {:?}", outcome);
            Ok(())
        }
        _ => {
            let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
            rt.block_on(async {
                tokio::select! {
                    result = daemon::run(config) => result,
                    _ = tokio::signal::ctrl_c() => {
                        log::info!("Received shutdown signal. Exiting…");
                        Ok(())
                    }
                }
            })
        }
    }
}

fn print_help() {
    println!(
        r#"testament-server: dead-man's switch keeper

USAGE:
    testament-server [-c <PATH>] [--init <OWNER> | --check | --validate]

    -c, --config <PATH>   Config file (default: {DEFAULT_CONFIG})
    --init <OWNER>        Create the estate with OWNER (64 hex chars) as Owner
    --check, --once       Run a single check cycle and exit
    --validate            Validate config and exit

Environment overrides: TESTAMENT_DATA_DIR, TESTAMENT_CHECK_INTERVAL,
TESTAMENT_LOG_LEVEL, TESTAMENT_KEEPER_IDENTITY, TESTAMENT_AUTO_CONFIRM"#
    );
}
