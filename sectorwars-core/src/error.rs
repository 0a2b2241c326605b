//! Error types for the Sectorwars core library.
//!
//! Fatal conditions (configuration, loading, persistence during generation)
//! surface as [`SectorwarsError`]. Everything a player can trigger from chat
//! is a [`CommandError`] and is rendered as reply text instead of being
//! propagated to the chat boundary.

use thiserror::Error;

/// Top-level error type for all Sectorwars operations.
#[derive(Error, Debug)]
pub enum SectorwarsError {
    /// Malformed or out-of-range configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The persisted galaxy could not be materialised.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// A universe already exists and regeneration was not forced.
    #[error("Found existing universe, re-run with force flag to wipe and start over")]
    UniverseExists,

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while loading the persisted galaxy into a session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// No universe has been generated yet.
    #[error("No universe found, run big-bang first")]
    NoUniverse,

    /// A stored record references an id that does not exist.
    #[error("{kind} {id} referenced by {from} does not exist")]
    DanglingReference {
        /// Kind of the missing entity.
        kind: &'static str,
        /// The missing id.
        id: String,
        /// Which record holds the reference.
        from: String,
    },
}

/// Non-fatal, player-facing command failures.
///
/// The `Display` text of each variant is the reply sent back to chat.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The text did not match any known command.
    #[error("Sorry, I did not understand the command _\"{0}\"_")]
    NotFound(String),

    /// A private-only command was sent on a public channel.
    #[error("The *{0}* command can only be run in a direct message")]
    PrivateOnly(&'static str),

    /// The command needs a registered player.
    #[error("You must be registered to play, send me a private message that says *register*")]
    NotRegistered,

    /// The chat identity already owns a player.
    #[error("You are already registered")]
    AlreadyRegistered,

    /// The identity directory does not know this chat identity.
    #[error("Sorry, that is an invalid player id")]
    InvalidPlayerId,

    /// The acting player could not be found in the session.
    #[error("Sorry, I could not find your player")]
    UnknownPlayer,

    /// The requested sector number does not exist or was not a number.
    #[error("Sorry, _{0}_ is not a valid sector number")]
    InvalidSector(String),

    /// `move` was sent without a destination.
    #[error("Where to? Send *move* followed by a sector number")]
    MissingSector,

    /// The target sector has no warp lane from the current sector.
    #[error("Sector {target} is not a neighbor of Sector {current}")]
    NotANeighbor {
        /// Current sector number.
        current: u32,
        /// Requested sector number.
        target: u32,
    },

    /// A storage failure while handling a command.
    #[error("Something went wrong while saving your game, please try again")]
    Storage,
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, SectorwarsError>;
