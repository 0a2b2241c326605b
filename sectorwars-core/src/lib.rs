//! # Sectorwars Core Library
//!
//! Simulation core of a persistent, turn-based space-trading game played
//! through chat commands.
//!
//! The crate owns two responsibilities:
//!
//! - **Galaxy generation**: [`generation`] partitions a fixed number of
//!   sectors into clusters, wires directed warp lanes inside each cluster and
//!   scatters trading outposts across the map.
//! - **Command handling**: [`session::GameSession`] loads the persisted
//!   galaxy into memory and [`commands`] turns free text into player actions
//!   (register, display, status, move).
//!
//! ## Data flow
//!
//! ```text
//! BigBang ──► PersistenceEngine ──► GameSession::initialize
//!                                         │
//!   chat text ──► extract_command ──► policy gates ──► handler ──► replies
//! ```
//!
//! Everything that crosses the process boundary (chat transport, identity
//! lookup, storage) is reached through a narrow seam: [`types::ChatEvent`],
//! [`identity::IdentityDirectory`] and [`persistence::PersistenceEngine`].

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod commands;
pub mod config;
pub mod error;
pub mod generation;
pub mod identity;
pub mod model;
pub mod navigation;
pub mod persistence;
pub mod session;
pub mod types;
pub mod util;

pub use config::SectorwarsConfig;
pub use error::{CommandError, LoadError, SectorwarsError};
pub use session::GameSession;
pub use types::*;
