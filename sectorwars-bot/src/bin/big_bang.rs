//! `big-bang`: generate a new universe.
//!
//! Refuses to touch an existing universe unless `--force` is given. A forced
//! run takes a rotating backup of the database first.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info};

use sectorwars_bot::{ensure_intact, init_tracing, load_config};
use sectorwars_core::generation::BigBang;
use sectorwars_core::persistence::PersistenceEngine;

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate a Sectorwars universe", long_about = None)]
struct Cli {
    /// Path to the TOML config. Defaults to `sectorwars.toml` when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Wipe an existing universe and start over.
    #[arg(long)]
    force: bool,
    /// Seed for a reproducible galaxy.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("big-bang: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.general.log_level);

    match run(&cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Big bang failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, config: &sectorwars_core::SectorwarsConfig) -> anyhow::Result<()> {
    let engine = PersistenceEngine::open(&config.persistence.path, &config.persistence)
        .with_context(|| format!("opening {}", config.persistence.path))?;
    ensure_intact(&engine)?;
    let big_bang = BigBang::new(&engine);

    if cli.force && big_bang.universe_exists()? {
        engine
            .create_rotating_backup()
            .context("backing up before a forced run")?;
        info!("Existing universe backed up");
    }

    let mut rng = match cli.seed {
        Some(seed) => {
            info!(seed, "Using fixed seed");
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };

    let report = big_bang.run(&config.game, cli.force, &mut rng)?;
    for (name, members) in &report.clusters {
        info!(cluster = %name, sectors = members, "Cluster summary");
    }
    for (class, count) in &report.outposts_by_class {
        info!(class, count, "Outpost summary");
    }
    Ok(())
}
