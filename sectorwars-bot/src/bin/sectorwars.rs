//! `sectorwars`: run the game over JSON lines on stdin/stdout.
//!
//! Each input line is a chat event such as
//! `{"sender":"U1","kind":"direct_message","text":"register"}`; each output
//! line is the array of replies for it. Logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use sectorwars_bot::{init_tracing, load_config, serve, Bot};

#[derive(Parser, Debug)]
#[command(author, version, about = "Sectorwars chat bot over JSON lines", long_about = None)]
struct Cli {
    /// Path to the TOML config. Defaults to `sectorwars.toml` when present.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("sectorwars: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.general.log_level);

    let bot = match Bot::from_config(&config) {
        Ok(bot) => bot,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Startup failed");
            return ExitCode::FAILURE;
        }
    };
    info!(
        sectors = bot.with_session(sectorwars_core::GameSession::sector_count),
        "Sectorwars ready"
    );

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    match serve(&bot, stdin.lock(), stdout.lock()) {
        Ok(stats) => {
            info!(events = stats.events, replies = stats.replies, rejected = stats.rejected, "Input closed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "Transport failed");
            ExitCode::FAILURE
        }
    }
}
