//! Backend scenarios CLI
//!
//! Runs end-to-end API scenarios against the corporate checkout, corporate
//! quote and payment endpoints of a running backend and exits non-zero when
//! any check fails.

use clap::Parser;
use scenarios::commands::Commands;
use scenarios::{cli, common::logging};

#[derive(Parser)]
#[command(name = "scenarios", about = "API scenario runner for the backend")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init_cli(cli.command.verbose());

    match cli::dispatch(cli.command).await {
        Ok(summary) => {
            let code = summary.exit_code();
            if code != 0 {
                std::process::exit(code);
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
