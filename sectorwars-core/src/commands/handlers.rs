//! Command handlers.
//!
//! Each handler performs at most one read-mutate-persist step against the
//! [`GameSession`] and returns the reply text. Storage failures are logged
//! here and surface to the player as [`CommandError::Storage`].

use tracing::{error, info};

use crate::error::CommandError;
use crate::identity::IdentityDirectory;
use crate::model::{Player, PlayerName, Sector};
use crate::navigation::Hop;
use crate::session::GameSession;
use crate::types::PlayerId;
use crate::util::{format_number, rpad};

use super::CommandSet;

/// Reply text or a player-facing failure.
pub type Outcome = std::result::Result<String, CommandError>;

const SECTOR_LABEL_WIDTH: usize = 9;
const STATUS_LABEL_WIDTH: usize = 12;

/// Resolve the sender's player and run a read-only handler.
///
/// # Errors
/// [`CommandError::UnknownPlayer`] if the identity owns no player, or
/// whatever `f` returns.
pub fn with_player<F>(session: &GameSession, identity: &str, f: F) -> Outcome
where
    F: FnOnce(&GameSession, PlayerId) -> Outcome,
{
    let id = session
        .player_by_identity(identity)
        .map(|p| p.id)
        .ok_or(CommandError::UnknownPlayer)?;
    f(session, id)
}

/// Resolve the sender's player and run a mutating handler.
///
/// # Errors
/// [`CommandError::UnknownPlayer`] if the identity owns no player, or
/// whatever `f` returns.
pub fn with_player_mut<F>(session: &mut GameSession, identity: &str, f: F) -> Outcome
where
    F: FnOnce(&mut GameSession, PlayerId) -> Outcome,
{
    let id = session
        .player_by_identity(identity)
        .map(|p| p.id)
        .ok_or(CommandError::UnknownPlayer)?;
    f(session, id)
}

// ---------------------------------------------------------------------------
// register
// ---------------------------------------------------------------------------

/// Create a player for `identity` in the spawn sector.
///
/// # Errors
/// - [`CommandError::AlreadyRegistered`] if the identity owns a player.
/// - [`CommandError::InvalidPlayerId`] if the directory does not know it.
/// - [`CommandError::Storage`] if the player could not be saved.
pub fn register(
    session: &mut GameSession,
    directory: &dyn IdentityDirectory,
    identity: &str,
) -> Outcome {
    if session.player_by_identity(identity).is_some() {
        return Err(CommandError::AlreadyRegistered);
    }
    let profile = directory
        .lookup(identity)
        .ok_or(CommandError::InvalidPlayerId)?;
    let Some(spawn) = session.universe().spawn_sector() else {
        error!(universe = %session.universe().id, "Universe has no sectors to spawn in");
        return Err(CommandError::Storage);
    };

    let player = Player {
        id: PlayerId::new(),
        name: PlayerName {
            first: profile.first_name,
            last: profile.last_name,
        },
        username: profile.display_name,
        chat_id: identity.to_string(),
        universe: session.universe().id,
        sector: spawn,
        ships: Vec::new(),
        cash: 0,
    };
    let name = player.display_name();
    let id = player.id;

    if let Err(e) = session.add_player(player) {
        error!(identity, error = %e, "Failed to save new player");
        return Err(CommandError::Storage);
    }
    info!(identity, player = %id, "Player registered");

    let sector = session
        .sector(spawn)
        .map_or_else(String::new, |s| s.name.clone());
    Ok(format!(
        "Welcome to Sectorwars, {name}! Your journey begins in *{sector}*. Send *display* to look around."
    ))
}

// ---------------------------------------------------------------------------
// display / status
// ---------------------------------------------------------------------------

/// Describe the player's current sector.
///
/// # Errors
/// [`CommandError::UnknownPlayer`] if the player or its sector is missing.
pub fn display(session: &GameSession, id: PlayerId) -> Outcome {
    let sector = current_sector(session, id)?;
    Ok(render_sector(session, sector))
}

/// Summarise the player.
///
/// # Errors
/// [`CommandError::UnknownPlayer`] if the player or its sector is missing.
pub fn status(session: &GameSession, id: PlayerId) -> Outcome {
    let player = session.player(id).ok_or(CommandError::UnknownPlayer)?;
    let sector = current_sector(session, id)?;
    let ship = player.ships.first().map_or("none", String::as_str);

    let lines = [
        format!("*{}*", player.display_name()),
        status_line("Level", "1"),
        status_line("Credits", &format_number(cash_as_f64(player.cash), 0, 3)),
        status_line("Ship", ship),
        status_line("Cargo", "0 / 0"),
        status_line("Sector", &sector.number.to_string()),
    ];
    Ok(lines.join("\n"))
}

fn status_line(label: &str, value: &str) -> String {
    format!("{}: {value}", rpad(label, '.', STATUS_LABEL_WIDTH))
}

#[allow(clippy::cast_precision_loss)]
fn cash_as_f64(cash: i64) -> f64 {
    cash as f64
}

fn current_sector(session: &GameSession, id: PlayerId) -> Result<&Sector, CommandError> {
    let player = session.player(id).ok_or(CommandError::UnknownPlayer)?;
    session
        .sector(player.sector)
        .ok_or(CommandError::UnknownPlayer)
}

fn render_sector(session: &GameSession, sector: &Sector) -> String {
    let cluster = sector
        .cluster
        .and_then(|c| session.cluster(c))
        .map(|c| format!(" in {}", c.name))
        .unwrap_or_default();

    let outposts: Vec<String> = sector
        .outposts
        .iter()
        .filter_map(|id| session.outpost(*id))
        .map(|o| format!("{} ({})", o.name, o.class.code()))
        .collect();
    let outposts = if outposts.is_empty() {
        "none".to_string()
    } else {
        outposts.join(", ")
    };

    let mut warps: Vec<u32> = sector
        .neighbors
        .iter()
        .filter_map(|id| session.sector(*id))
        .map(|s| s.number)
        .collect();
    warps.sort_unstable();
    warps.dedup();
    let warps = if warps.is_empty() {
        "none".to_string()
    } else {
        warps
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(" - ")
    };

    [
        format!("*{}*{cluster}", sector.name),
        format!("{}: {outposts}", rpad("Outposts", ' ', SECTOR_LABEL_WIDTH)),
        format!("{}: {warps}", rpad("Warps to", ' ', SECTOR_LABEL_WIDTH)),
    ]
    .join("\n")
}

// ---------------------------------------------------------------------------
// move
// ---------------------------------------------------------------------------

/// Warp the player one hop to the sector numbered `target`.
///
/// # Errors
/// - [`CommandError::MissingSector`] if `target` is empty.
/// - [`CommandError::InvalidSector`] if it is not a known sector number.
/// - [`CommandError::NotANeighbor`] if no lane leads there from here.
/// - [`CommandError::Storage`] if the new location could not be saved.
pub fn move_player(session: &mut GameSession, id: PlayerId, target: &str) -> Outcome {
    if target.is_empty() {
        return Err(CommandError::MissingSector);
    }
    let to = target
        .parse::<u32>()
        .ok()
        .and_then(|n| session.sector_index_by_number(n))
        .ok_or_else(|| CommandError::InvalidSector(target.to_string()))?;
    let here = current_sector(session, id)?;
    let from = session
        .graph()
        .index_of(here.id)
        .ok_or(CommandError::UnknownPlayer)?;
    let current = here.number;

    let destination = session
        .sector_at(to)
        .map(|s| (s.id, s.number, s.name.clone()))
        .ok_or_else(|| CommandError::InvalidSector(target.to_string()))?;
    let (dest_id, dest_number, dest_name) = destination;

    match session.graph().hop(from, to) {
        Hop::AlreadyHere => return Ok(format!("You are already here in *{dest_name}*")),
        Hop::NotAdjacent => {
            return Err(CommandError::NotANeighbor {
                current,
                target: dest_number,
            })
        }
        Hop::Adjacent => {}
    }

    match session.relocate_player(id, dest_id) {
        Ok(true) => {}
        Ok(false) => return Err(CommandError::UnknownPlayer),
        Err(e) => {
            error!(player = %id, target = dest_number, error = %e, "Failed to save move");
            return Err(CommandError::Storage);
        }
    }
    info!(player = %id, from = current, to = dest_number, "Player moved");

    let view = display(session, id)?;
    Ok(format!("You have arrived in *{dest_name}*\n{view}"))
}

// ---------------------------------------------------------------------------
// help
// ---------------------------------------------------------------------------

/// List the commands in dispatch order.
#[must_use]
pub fn help(commands: &CommandSet) -> String {
    let mut lines = vec!["Available commands:".to_string()];
    for spec in commands.iter() {
        let def = &spec.def;
        let aliases: Vec<&str> = def
            .aliases
            .iter()
            .copied()
            .filter(|a| *a != def.name)
            .collect();
        let shorthand = if aliases.is_empty() {
            String::new()
        } else {
            format!(" ({})", aliases.join(", "))
        };
        lines.push(format!("*{}*{shorthand}: {}", def.name, def.description));
    }
    lines.join("\n")
}
