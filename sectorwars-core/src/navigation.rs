//! Directed warp-lane graph over an arena of sectors.
//!
//! Sectors are addressed by dense indices; each node keeps its outgoing
//! lanes as an index list. Cycles (including the cluster-closing loop) and
//! self-loops are ordinary topology and need no special handling.

use std::collections::HashMap;

use crate::types::SectorId;

/// Dense index of a sector inside a [`SectorGraph`].
pub type SectorIndex = usize;

/// Result of checking a single-hop move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hop {
    /// Origin and destination are the same sector.
    AlreadyHere,
    /// A lane `from → to` exists.
    Adjacent,
    /// No lane `from → to`, regardless of any lane `to → from`.
    NotAdjacent,
}

/// Adjacency lists keyed by arena index.
#[derive(Debug, Clone, Default)]
pub struct SectorGraph {
    ids: Vec<SectorId>,
    index: HashMap<SectorId, SectorIndex>,
    lanes: Vec<Vec<SectorIndex>>,
}

impl SectorGraph {
    /// An empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning its index. Adding an id twice returns the
    /// existing index.
    pub fn add_node(&mut self, id: SectorId) -> SectorIndex {
        if let Some(&idx) = self.index.get(&id) {
            return idx;
        }
        let idx = self.ids.len();
        self.ids.push(id);
        self.index.insert(id, idx);
        self.lanes.push(Vec::new());
        idx
    }

    /// Add a directed lane. Duplicate lanes are kept, mirroring how the
    /// generator may emit the same lane twice.
    ///
    /// # Panics
    /// Panics if `from` is not a node index.
    pub fn add_lane(&mut self, from: SectorIndex, to: SectorIndex) {
        self.lanes[from].push(to);
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Index of a sector id.
    #[must_use]
    pub fn index_of(&self, id: SectorId) -> Option<SectorIndex> {
        self.index.get(&id).copied()
    }

    /// Sector id at an index.
    #[must_use]
    pub fn id_at(&self, idx: SectorIndex) -> Option<SectorId> {
        self.ids.get(idx).copied()
    }

    /// Outgoing lanes of a node, in insertion order.
    #[must_use]
    pub fn neighbors(&self, idx: SectorIndex) -> &[SectorIndex] {
        self.lanes.get(idx).map_or(&[], Vec::as_slice)
    }

    /// Whether a lane `from → to` exists.
    #[must_use]
    pub fn is_neighbor(&self, from: SectorIndex, to: SectorIndex) -> bool {
        self.neighbors(from).contains(&to)
    }

    /// Classify a single-hop move.
    #[must_use]
    pub fn hop(&self, from: SectorIndex, to: SectorIndex) -> Hop {
        if from == to {
            Hop::AlreadyHere
        } else if self.is_neighbor(from, to) {
            Hop::Adjacent
        } else {
            Hop::NotAdjacent
        }
    }

    /// Total number of lanes, duplicates included.
    #[must_use]
    pub fn lane_count(&self) -> usize {
        self.lanes.iter().map(Vec::len).sum()
    }
}
