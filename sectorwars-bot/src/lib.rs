//! # Sectorwars Bot
//!
//! Glue between a chat transport and [`sectorwars_core`].
//!
//! [`Bot`] owns the game session behind a mutex so events are handled one at
//! a time, whatever thread the transport delivers them on. [`serve`] is the
//! shipped transport: newline-delimited JSON over any reader/writer pair,
//! one [`ChatEvent`] per input line and one JSON array of [`Reply`] per
//! output line.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::Context;
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use sectorwars_core::commands::CommandEngine;
use sectorwars_core::identity::{IdentityDirectory, StaticDirectory};
use sectorwars_core::persistence::PersistenceEngine;
use sectorwars_core::{ChatEvent, GameSession, Reply, SectorwarsConfig};

/// Config file looked up when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = "sectorwars.toml";

/// A running game bound to one identity directory.
pub struct Bot {
    session: Mutex<GameSession>,
    commands: CommandEngine,
    directory: Box<dyn IdentityDirectory>,
}

impl std::fmt::Debug for Bot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot")
            .field("commands", &self.commands)
            .finish_non_exhaustive()
    }
}

impl Bot {
    /// Assemble a bot from its parts.
    #[must_use]
    pub fn new(
        session: GameSession,
        commands: CommandEngine,
        directory: Box<dyn IdentityDirectory>,
    ) -> Self {
        Self {
            session: Mutex::new(session),
            commands,
            directory,
        }
    }

    /// Open the configured database, load the universe and build the
    /// static identity directory from `[[profiles]]`.
    ///
    /// # Errors
    /// Fails if the database cannot be opened or fails SQLite's integrity
    /// check, if no universe exists, or if the stored galaxy is inconsistent.
    pub fn from_config(config: &SectorwarsConfig) -> anyhow::Result<Self> {
        let engine = PersistenceEngine::open(&config.persistence.path, &config.persistence)
            .with_context(|| format!("opening {}", config.persistence.path))?;
        ensure_intact(&engine)?;
        let session = GameSession::initialize(engine).context("loading the universe")?;
        let commands = CommandEngine::new(config.chat.clone())?;
        let directory = StaticDirectory::from_config(&config.profiles);
        info!(profiles = directory.len(), "Identity directory ready");
        Ok(Self::new(session, commands, Box::new(directory)))
    }

    /// Handle one chat event. Events are serialised on the session lock.
    pub fn handle(&self, event: &ChatEvent) -> Vec<Reply> {
        let mut session = self.session.lock();
        self.commands
            .handle(&mut session, self.directory.as_ref(), event)
    }

    /// Run `f` with shared access to the session.
    pub fn with_session<T>(&self, f: impl FnOnce(&GameSession) -> T) -> T {
        f(&self.session.lock())
    }
}

/// Refuse to work on a database that fails SQLite's integrity check.
///
/// # Errors
/// Fails if the check cannot run or reports corruption.
pub fn ensure_intact(engine: &PersistenceEngine) -> anyhow::Result<()> {
    if !engine.integrity_check().context("checking database integrity")? {
        anyhow::bail!("{} failed the integrity check", engine.db_path().display());
    }
    debug!(path = %engine.db_path().display(), "Integrity check passed");
    Ok(())
}

/// Counters for one [`serve`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeStats {
    /// Events handled.
    pub events: usize,
    /// Replies written.
    pub replies: usize,
    /// Lines that were not valid events.
    pub rejected: usize,
}

/// Pump newline-delimited JSON events from `input` to `output` until EOF.
///
/// Blank lines are skipped. A malformed line is logged and answered with an
/// empty array so output stays aligned with input.
///
/// # Errors
/// Fails only on I/O errors.
pub fn serve<R: BufRead, W: Write>(bot: &Bot, input: R, mut output: W) -> anyhow::Result<ServeStats> {
    let mut stats = ServeStats::default();
    for (line_no, line) in input.lines().enumerate() {
        let line = line.context("reading event")?;
        if line.trim().is_empty() {
            continue;
        }
        let replies = match serde_json::from_str::<ChatEvent>(&line) {
            Ok(event) => {
                debug!(sender = %event.sender, kind = %event.kind, "Event received");
                stats.events += 1;
                bot.handle(&event)
            }
            Err(e) => {
                warn!(line = line_no + 1, error = %e, "Malformed event");
                stats.rejected += 1;
                Vec::new()
            }
        };
        stats.replies += replies.len();
        serde_json::to_writer(&mut output, &replies).context("writing replies")?;
        output.write_all(b"\n").context("writing replies")?;
        output.flush().context("flushing replies")?;
    }
    Ok(stats)
}

/// Load the config at `path`, or [`DEFAULT_CONFIG_PATH`] when it exists,
/// falling back to built-in defaults.
///
/// # Errors
/// Fails if an explicitly given file is missing, or any file found is
/// malformed.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<SectorwarsConfig> {
    let config = match path {
        Some(path) => SectorwarsConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            SectorwarsConfig::from_file(Path::new(DEFAULT_CONFIG_PATH))
                .with_context(|| format!("loading {DEFAULT_CONFIG_PATH}"))?
        }
        None => SectorwarsConfig::default(),
    };
    Ok(config)
}

/// Install the global `fmt` subscriber on stderr. `RUST_LOG` wins over
/// `level`.
pub fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}
