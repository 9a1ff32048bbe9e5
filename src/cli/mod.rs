//! CLI command handling
//!
//! Resolves configuration, runs suites or scenario files through the harness
//! and formats output.

use colored::Colorize;
use std::path::Path;

use crate::commands::{Commands, TargetArgs};
use crate::common::config::Config;
use crate::common::paths::{config_path, ensure_config_dir};
use crate::common::{Error, Result};
use crate::harness::{self, Harness, Ledger, Report, Summary};
use crate::suites;
use crate::testing;

/// Dispatch a CLI command
///
/// Returns the run's summary; commands that run no scenarios return an
/// empty one.
pub async fn dispatch(command: Commands) -> Result<Summary> {
    match command {
        Commands::Run {
            suites: ids,
            target,
            json,
            verbose: _,
        } => {
            let config = resolve_config(&target)?;
            let selected = suites::resolve(&ids)?;
            let api_base = config.api_base()?;

            let harness = if json {
                Harness::new(config).quiet()
            } else {
                Harness::new(config)
            };

            let mut groups = Vec::new();
            for suite in &selected {
                groups.extend(suites::build(suite, &harness.config().params));
            }

            if !json {
                let names: Vec<&str> = selected.iter().map(|s| s.name).collect();
                harness::print_header(&format!("{} TESTS", names.join(" + ")), &api_base);
            }

            tracing::info!(
                suites = selected.len(),
                groups = groups.len(),
                base = %api_base,
                "starting run"
            );
            let ledger = harness.run_groups(groups).await?;
            report(&ledger, json)
        }

        Commands::Test {
            path,
            target,
            json,
            verbose: _,
        } => {
            let config = resolve_config(&target)?;
            let api_base = config.api_base()?;
            let path = testing::resolve_path(&path)?;

            let harness = if json {
                Harness::new(config).quiet()
            } else {
                harness::print_header("SCENARIO FILE", &api_base);
                Harness::new(config)
            };

            let ledger = testing::run_scenario(&path, &harness).await?;
            report(&ledger, json)
        }

        Commands::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(suites::all())?);
            } else {
                println!("{}", "Available suites:".bold());
                for suite in suites::all() {
                    println!("\n  {} - {}", suite.id.cyan(), suite.description);
                    for endpoint in suite.endpoints {
                        let lock = if endpoint.auth { " (auth)" } else { "" };
                        println!("    {:<5} {}{}", endpoint.method, endpoint.path, lock.dimmed());
                    }
                }
            }
            Ok(Summary::default())
        }

        Commands::Config { target, init } => {
            if init {
                init_config_file()?;
            }
            let config = resolve_config(&target)?;
            print!("{}", config.to_toml()?);
            Ok(Summary::default())
        }
    }
}

/// Build the effective configuration
///
/// Order: config file, then dotenv and process environment, then flags.
fn resolve_config(target: &TargetArgs) -> Result<Config> {
    load_env_file(target.env_file.as_deref())?;

    let mut config = Config::load(target.config.as_deref())?;
    config.apply_env(|key| std::env::var(key).ok());
    config.apply_overrides(&target.overrides());
    Ok(config)
}

fn load_env_file(path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            dotenv::from_path(path).map_err(|e| Error::FileRead {
                path: path.display().to_string(),
                error: e.to_string(),
            })?;
            tracing::debug!(path = %path.display(), "loaded env file");
        }
        None => {
            if let Ok(found) = dotenv::dotenv() {
                tracing::debug!(path = %found.display(), "loaded .env");
            }
        }
    }
    Ok(())
}

fn init_config_file() -> Result<()> {
    let dir = ensure_config_dir()?
        .ok_or_else(|| Error::Config("No configuration directory on this platform".to_string()))?;
    let path = config_path().unwrap_or_else(|| dir.join("config.toml"));

    if path.exists() {
        eprintln!("Config file already exists: {}", path.display());
        return Ok(());
    }

    std::fs::write(&path, Config::default().to_toml()?)?;
    eprintln!("Wrote {}", path.display());
    Ok(())
}

fn report(ledger: &Ledger, json: bool) -> Result<Summary> {
    if json {
        println!("{}", serde_json::to_string_pretty(&Report::new(ledger))?);
    } else {
        harness::print_summary(ledger);
    }
    Ok(ledger.summarize())
}
