//! In-memory game session.
//!
//! [`GameSession::initialize`] joins the persisted records into an arena of
//! sectors plus lookup maps. Each entity kind has one map by surrogate id and,
//! where a natural key exists, a second map by that key (sector number,
//! player chat identity). The maps never share a keyspace.
//!
//! Mutations go through the engine first; the in-memory copy only changes
//! once the write has succeeded, so a failed save leaves the session exactly
//! as it was.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::error::{LoadError, Result};
use crate::model::{Cluster, Outpost, Player, Sector, Universe};
use crate::navigation::{SectorGraph, SectorIndex};
use crate::persistence::PersistenceEngine;
use crate::types::{ClusterId, OutpostId, PlayerId, SectorId};

/// The active universe, loaded and indexed.
#[derive(Debug)]
pub struct GameSession {
    engine: PersistenceEngine,
    universe: Universe,
    clusters: HashMap<ClusterId, Cluster>,
    /// Arena; `sectors[i]` is node `i` of `graph`.
    sectors: Vec<Sector>,
    sector_by_number: HashMap<u32, SectorIndex>,
    graph: SectorGraph,
    outposts: HashMap<OutpostId, Outpost>,
    players: HashMap<PlayerId, Player>,
    player_by_identity: HashMap<String, PlayerId>,
}

impl GameSession {
    /// Load the active universe from `engine`.
    ///
    /// # Errors
    /// - [`LoadError::NoUniverse`] if nothing has been generated yet.
    /// - [`LoadError::DanglingReference`] if a stored id does not resolve.
    /// - Any persistence error while reading.
    pub fn initialize(engine: PersistenceEngine) -> Result<Self> {
        let mut universes: Vec<Universe> = engine.find_all()?;
        if universes.len() > 1 {
            warn!(count = universes.len(), "Multiple universes stored, using the first");
        }
        if universes.is_empty() {
            return Err(LoadError::NoUniverse.into());
        }
        let universe = universes.swap_remove(0);

        let stored_sectors: HashMap<SectorId, Sector> = engine
            .find_all::<Sector>()?
            .into_iter()
            .filter(|s| s.universe == universe.id)
            .map(|s| (s.id, s))
            .collect();

        // Arena in universe order, so index 0 is the spawn sector.
        let mut graph = SectorGraph::new();
        let mut sectors = Vec::with_capacity(universe.sectors.len());
        let mut sector_by_number = HashMap::with_capacity(universe.sectors.len());
        for id in &universe.sectors {
            let sector = stored_sectors
                .get(id)
                .cloned()
                .ok_or_else(|| dangling("sector", id, "universe"))?;
            let idx = graph.add_node(sector.id);
            sector_by_number.insert(sector.number, idx);
            sectors.push(sector);
        }
        for (from, sector) in sectors.iter().enumerate() {
            for neighbor in &sector.neighbors {
                let to = graph
                    .index_of(*neighbor)
                    .ok_or_else(|| dangling("sector", neighbor, &sector.name))?;
                graph.add_lane(from, to);
            }
        }

        let clusters: HashMap<ClusterId, Cluster> = engine
            .find_all::<Cluster>()?
            .into_iter()
            .filter(|c| c.universe == universe.id)
            .map(|c| (c.id, c))
            .collect();

        let outposts: HashMap<OutpostId, Outpost> = engine
            .find_all::<Outpost>()?
            .into_iter()
            .filter(|o| o.universe == universe.id)
            .map(|o| (o.id, o))
            .collect();
        for outpost in outposts.values() {
            if graph.index_of(outpost.sector).is_none() {
                return Err(dangling("sector", &outpost.sector, &outpost.name).into());
            }
        }

        let mut players = HashMap::new();
        let mut player_by_identity = HashMap::new();
        for player in engine.find_all::<Player>()? {
            if player.universe != universe.id {
                continue;
            }
            if graph.index_of(player.sector).is_none() {
                return Err(dangling("sector", &player.sector, &player.username).into());
            }
            player_by_identity.insert(player.chat_id.clone(), player.id);
            players.insert(player.id, player);
        }

        info!(
            universe = %universe.id,
            clusters = clusters.len(),
            sectors = sectors.len(),
            lanes = graph.lane_count(),
            outposts = outposts.len(),
            players = players.len(),
            "Game session loaded"
        );

        Ok(Self {
            engine,
            universe,
            clusters,
            sectors,
            sector_by_number,
            graph,
            outposts,
            players,
            player_by_identity,
        })
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    /// The active universe.
    #[must_use]
    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    /// Warp-lane graph; node indices match [`Self::sector_at`].
    #[must_use]
    pub fn graph(&self) -> &SectorGraph {
        &self.graph
    }

    /// Sector by arena index.
    #[must_use]
    pub fn sector_at(&self, idx: SectorIndex) -> Option<&Sector> {
        self.sectors.get(idx)
    }

    /// Sector by surrogate id.
    #[must_use]
    pub fn sector(&self, id: SectorId) -> Option<&Sector> {
        self.graph.index_of(id).and_then(|idx| self.sectors.get(idx))
    }

    /// Arena index of a sector by its visible number.
    #[must_use]
    pub fn sector_index_by_number(&self, number: u32) -> Option<SectorIndex> {
        self.sector_by_number.get(&number).copied()
    }

    /// Sector by its visible number.
    #[must_use]
    pub fn sector_by_number(&self, number: u32) -> Option<&Sector> {
        self.sector_index_by_number(number)
            .and_then(|idx| self.sectors.get(idx))
    }

    /// Cluster by id.
    #[must_use]
    pub fn cluster(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.get(&id)
    }

    /// Outpost by id.
    #[must_use]
    pub fn outpost(&self, id: OutpostId) -> Option<&Outpost> {
        self.outposts.get(&id)
    }

    /// Player by surrogate id.
    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Player owned by a chat identity.
    #[must_use]
    pub fn player_by_identity(&self, identity: &str) -> Option<&Player> {
        self.player_by_identity
            .get(identity)
            .and_then(|id| self.players.get(id))
    }

    /// Number of sectors.
    #[must_use]
    pub fn sector_count(&self) -> usize {
        self.sectors.len()
    }

    /// Number of registered players.
    #[must_use]
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Persist a new player and add it to the universe roster. Both rows are
    /// written in one transaction.
    ///
    /// # Errors
    /// Any persistence error; neither the database nor the session changes
    /// in that case.
    pub fn add_player(&mut self, player: Player) -> Result<()> {
        let mut universe = self.universe.clone();
        universe.players.push(player.id);

        self.engine
            .create_and_save(std::slice::from_ref(&player), std::slice::from_ref(&universe))?;

        self.universe = universe;
        self.player_by_identity
            .insert(player.chat_id.clone(), player.id);
        self.players.insert(player.id, player);
        Ok(())
    }

    /// Persist a player's new location.
    ///
    /// Returns `Ok(false)` if the player is unknown.
    ///
    /// # Errors
    /// Any persistence error; the session is unchanged in that case.
    pub fn relocate_player(&mut self, id: PlayerId, sector: SectorId) -> Result<bool> {
        let Some(current) = self.players.get(&id) else {
            return Ok(false);
        };
        let mut updated = current.clone();
        updated.sector = sector;

        self.engine.save_one(&updated)?;
        self.players.insert(id, updated);
        Ok(true)
    }

    #[cfg(test)]
    pub(crate) fn engine(&self) -> &PersistenceEngine {
        &self.engine
    }
}

fn dangling(kind: &'static str, id: &impl std::fmt::Display, from: &str) -> LoadError {
    LoadError::DanglingReference {
        kind,
        id: id.to_string(),
        from: from.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClusterConfig, GalaxyConfig, PersistenceConfig};
    use crate::error::SectorwarsError;
    use crate::generation::BigBang;
    use crate::model::PlayerName;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn generated_engine() -> PersistenceEngine {
        let engine =
            PersistenceEngine::open_in_memory(&PersistenceConfig::default()).expect("open");
        let config = GalaxyConfig {
            clusters: ClusterConfig { count: 2, size: 4 },
            ..GalaxyConfig::default()
        };
        BigBang::new(&engine)
            .run(&config, false, &mut StdRng::seed_from_u64(21))
            .expect("big bang");
        engine
    }

    fn new_player(session: &GameSession, chat_id: &str) -> Player {
        Player {
            id: PlayerId::new(),
            name: PlayerName::default(),
            username: chat_id.to_lowercase(),
            chat_id: chat_id.to_string(),
            universe: session.universe().id,
            sector: session.universe().spawn_sector().expect("spawn"),
            ships: Vec::new(),
            cash: 0,
        }
    }

    #[test]
    fn empty_database_is_a_load_error() {
        let engine =
            PersistenceEngine::open_in_memory(&PersistenceConfig::default()).expect("open");
        let err = GameSession::initialize(engine).expect_err("should fail");
        assert!(matches!(err, SectorwarsError::Load(LoadError::NoUniverse)));
    }

    #[test]
    fn indexes_sectors_by_id_and_number() {
        let session = GameSession::initialize(generated_engine()).expect("load");
        assert_eq!(session.sector_count(), 8);
        for number in 1..=8 {
            let sector = session.sector_by_number(number).expect("by number");
            assert_eq!(sector.number, number);
            assert_eq!(session.sector(sector.id).map(|s| s.number), Some(number));
        }
        assert!(session.sector_by_number(0).is_none());
        assert!(session.sector_by_number(9).is_none());
    }

    #[test]
    fn graph_matches_stored_lanes() {
        let session = GameSession::initialize(generated_engine()).expect("load");
        for idx in 0..session.sector_count() {
            let sector = session.sector_at(idx).expect("sector");
            let from_graph: Vec<SectorId> = session
                .graph()
                .neighbors(idx)
                .iter()
                .filter_map(|&n| session.graph().id_at(n))
                .collect();
            assert_eq!(from_graph, sector.neighbors);
        }
    }

    #[test]
    fn spawn_sector_is_arena_index_zero() {
        let session = GameSession::initialize(generated_engine()).expect("load");
        let spawn = session.universe().spawn_sector().expect("spawn");
        assert_eq!(session.graph().index_of(spawn), Some(0));
    }

    #[test]
    fn added_players_survive_reload() {
        let mut session = GameSession::initialize(generated_engine()).expect("load");
        let player = new_player(&session, "U1");
        let id = player.id;
        session.add_player(player).expect("add");

        assert_eq!(session.player_by_identity("U1").map(|p| p.id), Some(id));
        assert!(session.universe().players.contains(&id));

        let reloaded = GameSession::initialize(session.engine).expect("reload");
        assert_eq!(reloaded.player(id).map(|p| p.chat_id.as_str()), Some("U1"));
        assert!(reloaded.universe().players.contains(&id));
    }

    #[test]
    fn failed_save_leaves_session_unchanged() {
        let mut session = GameSession::initialize(generated_engine()).expect("load");
        let player = new_player(&session, "U1");
        let id = player.id;
        let spawn = player.sector;
        session.add_player(player).expect("add");

        session
            .engine()
            .connection()
            .execute_batch("DROP TABLE players;")
            .expect("drop table");

        let elsewhere = session.sector_by_number(2).expect("sector").id;
        assert!(session.relocate_player(id, elsewhere).is_err());
        assert_eq!(session.player(id).map(|p| p.sector), Some(spawn));
    }

    #[test]
    fn failed_roster_write_leaves_no_player_behind() {
        let mut session = GameSession::initialize(generated_engine()).expect("load");
        session
            .engine()
            .connection()
            .execute_batch(
                "CREATE TRIGGER reject_roster BEFORE UPDATE ON universes
                 BEGIN SELECT RAISE(FAIL, 'roster locked'); END;",
            )
            .expect("trigger");

        for _ in 0..2 {
            let player = new_player(&session, "U1");
            assert!(session.add_player(player).is_err());
        }
        assert!(session.player_by_identity("U1").is_none());
        assert!(session.universe().players.is_empty());
        assert_eq!(session.engine().count::<Player>().expect("count"), 0);

        let reloaded = GameSession::initialize(session.engine).expect("reload");
        assert!(reloaded.player_by_identity("U1").is_none());
    }

    #[test]
    fn relocating_unknown_player_is_false() {
        let mut session = GameSession::initialize(generated_engine()).expect("load");
        let target = session.sector_by_number(1).expect("sector").id;
        assert!(!session.relocate_player(PlayerId::new(), target).expect("relocate"));
    }

    #[test]
    fn dangling_neighbor_is_a_load_error() {
        let engine = generated_engine();
        let mut sectors: Vec<Sector> = engine.find_all().expect("sectors");
        sectors[0].neighbors.push(SectorId::new());
        engine.save_one(&sectors[0]).expect("save");

        let err = GameSession::initialize(engine).expect_err("should fail");
        assert!(matches!(
            err,
            SectorwarsError::Load(LoadError::DanglingReference { kind: "sector", .. })
        ));
    }
}
