//! Persisted entity records.
//!
//! Relations are stored as id references, never embedded; the
//! [`session`](crate::session) joins them at load time. Every record
//! implements [`Record`] so the persistence engine can keep one table per
//! entity kind.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{ClusterId, OutpostId, PlayerId, SectorId, UniverseId};

/// A storable entity: one table per implementing type.
pub trait Record: Serialize + DeserializeOwned {
    /// Table name.
    const COLLECTION: &'static str;

    /// Primary key.
    fn key(&self) -> Uuid;
}

/// Root aggregate. Exactly one exists once the galaxy has been generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    /// Surrogate id.
    pub id: UniverseId,
    /// All clusters, in creation order.
    pub clusters: Vec<ClusterId>,
    /// All sectors, in cluster partition order. The first entry is where
    /// new players spawn.
    pub sectors: Vec<SectorId>,
    /// All outposts.
    pub outposts: Vec<OutpostId>,
    /// Registered players.
    pub players: Vec<PlayerId>,
}

impl Universe {
    /// An empty universe with a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: UniverseId::new(),
            clusters: Vec::new(),
            sectors: Vec::new(),
            outposts: Vec::new(),
            players: Vec::new(),
        }
    }

    /// Where newly registered players are placed.
    #[must_use]
    pub fn spawn_sector(&self) -> Option<SectorId> {
        self.sectors.first().copied()
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self::new()
    }
}

/// A fixed-size group of sectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// Surrogate id.
    pub id: ClusterId,
    /// Display name, `Cluster N`.
    pub name: String,
    /// Owning universe.
    pub universe: UniverseId,
    /// Member sectors in partition order.
    pub sectors: Vec<SectorId>,
}

/// A graph node: one location a player can occupy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    /// Surrogate id.
    pub id: SectorId,
    /// Visible, unique number in `1..=total`.
    pub number: u32,
    /// Display name, `Sector N`.
    pub name: String,
    /// Owning cluster. `None` only before the partition phase.
    pub cluster: Option<ClusterId>,
    /// Owning universe.
    pub universe: UniverseId,
    /// Outgoing warp lanes. Directed: `B` in `A.neighbors` says nothing
    /// about `A` in `B.neighbors`.
    pub neighbors: Vec<SectorId>,
    /// Outposts located here.
    pub outposts: Vec<OutpostId>,
}

/// Per-commodity quantities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commodities {
    /// Fuel ore.
    pub fuel: i64,
    /// Organics.
    pub organics: i64,
    /// Equipment.
    pub equipment: i64,
}

/// Whether an outpost buys or sells a commodity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stance {
    /// The outpost buys from players.
    Buy,
    /// The outpost sells to players.
    Sell,
}

impl Stance {
    fn letter(self) -> char {
        match self {
            Self::Buy => 'B',
            Self::Sell => 'S',
        }
    }
}

/// Outpost class in `1..=8`; each class fixes a buy/sell stance for fuel,
/// organics and equipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct OutpostClass(u8);

impl OutpostClass {
    /// Every valid class, in order.
    pub const ALL: [Self; 8] = [
        Self(1),
        Self(2),
        Self(3),
        Self(4),
        Self(5),
        Self(6),
        Self(7),
        Self(8),
    ];

    /// Build a class, rejecting anything outside `1..=8`.
    #[must_use]
    pub fn new(value: u8) -> Option<Self> {
        (1..=8).contains(&value).then_some(Self(value))
    }

    /// Numeric class.
    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }

    /// Stance for fuel, organics and equipment.
    #[must_use]
    pub fn stances(self) -> [Stance; 3] {
        use Stance::{Buy as B, Sell as S};
        match self.0 {
            1 => [B, B, S],
            2 => [B, S, B],
            3 => [S, B, B],
            4 => [S, S, B],
            5 => [S, B, S],
            6 => [B, S, S],
            7 => [S, S, S],
            _ => [B, B, B],
        }
    }

    /// Three-letter trade code, e.g. `BBS`.
    #[must_use]
    pub fn code(self) -> String {
        self.stances().iter().map(|s| s.letter()).collect()
    }
}

impl TryFrom<u8> for OutpostClass {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("invalid outpost type {value}"))
    }
}

impl From<OutpostClass> for u8 {
    fn from(class: OutpostClass) -> Self {
        class.0
    }
}

/// A trading post in one sector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outpost {
    /// Surrogate id.
    pub id: OutpostId,
    /// Display name, `Outpost N`.
    pub name: String,
    /// Trade class.
    #[serde(rename = "type")]
    pub class: OutpostClass,
    /// Owning universe.
    pub universe: UniverseId,
    /// Location.
    pub sector: SectorId,
    /// Credits held by the outpost.
    #[serde(default)]
    pub bank: i64,
    /// Current unit prices.
    #[serde(default)]
    pub prices: Commodities,
    /// Units in stock.
    #[serde(default)]
    pub inventory: Commodities,
}

/// A player's real name as reported by the identity directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerName {
    /// Given name.
    pub first: String,
    /// Family name.
    pub last: String,
}

/// A registered chat identity's avatar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Surrogate id.
    pub id: PlayerId,
    /// Real name.
    pub name: PlayerName,
    /// Chat display handle.
    pub username: String,
    /// Chat identity; unique per universe.
    pub chat_id: String,
    /// Owning universe.
    pub universe: UniverseId,
    /// Current location.
    pub sector: SectorId,
    /// Owned ships.
    #[serde(default)]
    pub ships: Vec<String>,
    /// Credits on hand.
    #[serde(default)]
    pub cash: i64,
}

impl Player {
    /// Name shown in replies: the real name when known, otherwise the handle.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.name.first, self.name.last);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

impl Record for Universe {
    const COLLECTION: &'static str = "universes";
    fn key(&self) -> Uuid {
        self.id.0
    }
}

impl Record for Cluster {
    const COLLECTION: &'static str = "clusters";
    fn key(&self) -> Uuid {
        self.id.0
    }
}

impl Record for Sector {
    const COLLECTION: &'static str = "sectors";
    fn key(&self) -> Uuid {
        self.id.0
    }
}

impl Record for Outpost {
    const COLLECTION: &'static str = "outposts";
    fn key(&self) -> Uuid {
        self.id.0
    }
}

impl Record for Player {
    const COLLECTION: &'static str = "players";
    fn key(&self) -> Uuid {
        self.id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_codes_are_distinct() {
        let codes: std::collections::HashSet<String> =
            OutpostClass::ALL.iter().map(|c| c.code()).collect();
        assert_eq!(codes.len(), 8);
        assert_eq!(OutpostClass::ALL[0].code(), "BBS");
        assert_eq!(OutpostClass::ALL[6].code(), "SSS");
        assert_eq!(OutpostClass::ALL[7].code(), "BBB");
    }

    #[test]
    fn class_rejects_out_of_range() {
        assert!(OutpostClass::new(0).is_none());
        assert!(OutpostClass::new(9).is_none());
        assert_eq!(OutpostClass::new(8).map(OutpostClass::get), Some(8));
    }

    #[test]
    fn outpost_type_serializes_as_number() {
        let outpost = Outpost {
            id: OutpostId::new(),
            name: "Outpost 1".into(),
            class: OutpostClass::ALL[2],
            universe: UniverseId::new(),
            sector: SectorId::new(),
            bank: 0,
            prices: Commodities::default(),
            inventory: Commodities::default(),
        };
        let json = serde_json::to_value(&outpost).expect("encode");
        assert_eq!(json["type"], 3);

        let mut bad = json.clone();
        bad["type"] = serde_json::json!(9);
        assert!(serde_json::from_value::<Outpost>(bad).is_err());
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let mut player = Player {
            id: PlayerId::new(),
            name: PlayerName::default(),
            username: "ada".into(),
            chat_id: "U1".into(),
            universe: UniverseId::new(),
            sector: SectorId::new(),
            ships: Vec::new(),
            cash: 0,
        };
        assert_eq!(player.display_name(), "ada");
        player.name.first = "Ada".into();
        player.name.last = "Lovelace".into();
        assert_eq!(player.display_name(), "Ada Lovelace");
    }
}
