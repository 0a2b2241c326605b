//! Galaxy generation ("big bang").
//!
//! Generation is split in two:
//!
//! 1. [`plan_universe`]: pure and seedable. Numbers the sectors, shuffles
//!    them into clusters, wires the warp lanes and picks outpost sites.
//! 2. [`BigBang::run`]: writes a plan to the [`PersistenceEngine`] one
//!    phase at a time: sectors, clusters, lanes, outposts, players, roster.
//!    Each phase is a single transaction and later phases only start once
//!    the earlier one has landed.
//!
//! ## Lane construction
//!
//! Inside each cluster (members in partition order):
//!
//! - a forward chain `m[i] → m[i+1]`;
//! - per member, when a draw exceeds `ratios.two`, one extra lane to a
//!   random member of the same cluster (possibly itself);
//! - once per cluster, when a draw exceeds `ratios.one`, a loop-closing lane
//!   `last → first`; otherwise the full reverse chain `m[i] → m[i-1]`.
//!
//! Lanes never cross clusters, and nothing forces them to be symmetric.

use std::collections::{BTreeMap, HashSet};

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::{ConnectionRatios, GalaxyConfig, OutpostProbability, OutpostSampling};
use crate::error::{Result, SectorwarsError};
use crate::model::{Cluster, Commodities, Outpost, OutpostClass, Player, Sector, Universe};
use crate::persistence::PersistenceEngine;
use crate::types::{ClusterId, OutpostId, SectorId};

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// A fully generated galaxy that has not been written anywhere yet.
#[derive(Debug, Clone)]
pub struct UniversePlan {
    /// Root aggregate with cluster, sector and outpost ids filled in.
    pub universe: Universe,
    /// Clusters in creation order.
    pub clusters: Vec<Cluster>,
    /// Sectors in number order (`sectors[i].number == i + 1`).
    pub sectors: Vec<Sector>,
    /// Outposts, each on a distinct sector.
    pub outposts: Vec<Outpost>,
    /// Outposts the placement loop selected but could not classify.
    pub dropped_outposts: usize,
}

impl UniversePlan {
    /// Summary for logging.
    #[must_use]
    pub fn report(&self) -> GenerationReport {
        let mut outposts_by_class = BTreeMap::new();
        for outpost in &self.outposts {
            *outposts_by_class.entry(outpost.class.get()).or_insert(0) += 1;
        }
        GenerationReport {
            sectors: self.sectors.len(),
            clusters: self
                .clusters
                .iter()
                .map(|c| (c.name.clone(), c.sectors.len()))
                .collect(),
            lanes: self.sectors.iter().map(|s| s.neighbors.len()).sum(),
            outposts: self.outposts.len(),
            outposts_by_class,
            dropped_outposts: self.dropped_outposts,
            players_rehomed: 0,
        }
    }
}

/// What a generation run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    /// Sector count.
    pub sectors: usize,
    /// `(cluster name, member count)` in creation order.
    pub clusters: Vec<(String, usize)>,
    /// Total warp lanes.
    pub lanes: usize,
    /// Outposts created.
    pub outposts: usize,
    /// Outposts per class.
    pub outposts_by_class: BTreeMap<u8, usize>,
    /// Outposts dropped because no class threshold matched.
    pub dropped_outposts: usize,
    /// Existing players moved into the new universe.
    pub players_rehomed: usize,
}

/// Generate a galaxy in memory.
///
/// `config` is assumed valid (see [`GalaxyConfig::validate`]); an empty
/// galaxy is returned when it describes zero sectors or more sectors than
/// can be numbered.
pub fn plan_universe<R: Rng + ?Sized>(config: &GalaxyConfig, rng: &mut R) -> UniversePlan {
    let mut universe = Universe::new();
    let Some(numbered) = config.sector_count() else {
        warn!(
            count = config.clusters.count,
            size = config.clusters.size,
            "Galaxy shape exceeds the sector numbering range, nothing generated"
        );
        return UniversePlan {
            universe,
            clusters: Vec::new(),
            sectors: Vec::new(),
            outposts: Vec::new(),
            dropped_outposts: 0,
        };
    };

    let mut sectors = create_sectors(&universe, numbered);
    let total = sectors.len();
    let mut clusters = create_clusters(&universe, config.clusters.count);

    // Shuffle, then deal consecutive runs of `size` sectors to each cluster.
    let mut order: Vec<usize> = (0..total).collect();
    order.shuffle(rng);
    let partition = partition(&order, config.clusters.count, config.clusters.size);

    for (cluster, members) in clusters.iter_mut().zip(&partition) {
        for &idx in members {
            sectors[idx].cluster = Some(cluster.id);
            cluster.sectors.push(sectors[idx].id);
            universe.sectors.push(sectors[idx].id);
        }
        universe.clusters.push(cluster.id);
    }

    for members in &partition {
        for (from, to) in cluster_lanes(members, &config.sectors.connections.ratios, rng) {
            let target = sectors[to].id;
            sectors[from].neighbors.push(target);
        }
    }

    let sites = outpost_sites(total, config.target_outposts(), config.outposts.sampling, rng);
    let mut outposts = Vec::with_capacity(sites.len());
    let mut dropped_outposts = 0;
    for (iteration, idx) in sites {
        let Some(class) = sample_outpost_class(&config.outposts.probability, rng) else {
            warn!(
                sector = sectors[idx].number,
                "No outpost class matched the configured thresholds, dropping outpost"
            );
            dropped_outposts += 1;
            continue;
        };
        let outpost = Outpost {
            id: OutpostId::new(),
            name: format!("Outpost {}", iteration + 1),
            class,
            universe: universe.id,
            sector: sectors[idx].id,
            bank: 0,
            prices: Commodities::default(),
            inventory: Commodities::default(),
        };
        sectors[idx].outposts.push(outpost.id);
        universe.outposts.push(outpost.id);
        outposts.push(outpost);
    }

    UniversePlan {
        universe,
        clusters,
        sectors,
        outposts,
        dropped_outposts,
    }
}

/// `total` unlinked sectors numbered `1..=total`.
#[must_use]
pub fn create_sectors(universe: &Universe, total: u32) -> Vec<Sector> {
    (1..=total)
        .map(|number| Sector {
            id: SectorId::new(),
            number,
            name: format!("Sector {number}"),
            cluster: None,
            universe: universe.id,
            neighbors: Vec::new(),
            outposts: Vec::new(),
        })
        .collect()
}

/// `count` empty clusters named `Cluster 1..=count`.
#[must_use]
pub fn create_clusters(universe: &Universe, count: usize) -> Vec<Cluster> {
    (1..=count)
        .map(|n| Cluster {
            id: ClusterId::new(),
            name: format!("Cluster {n}"),
            universe: universe.id,
            sectors: Vec::new(),
        })
        .collect()
}

/// Split a (shuffled) index sequence into `count` consecutive groups of
/// `size`. Indices beyond `count * size` are ignored.
#[must_use]
pub fn partition(order: &[usize], count: usize, size: usize) -> Vec<Vec<usize>> {
    if size == 0 {
        return vec![Vec::new(); count];
    }
    order
        .chunks(size)
        .take(count)
        .map(<[usize]>::to_vec)
        .collect()
}

/// Directed lanes `(from, to)` for one cluster's members.
pub fn cluster_lanes<R: Rng + ?Sized>(
    members: &[usize],
    ratios: &ConnectionRatios,
    rng: &mut R,
) -> Vec<(usize, usize)> {
    let k = members.len();
    let mut lanes = Vec::with_capacity(k * 3);
    if k == 0 {
        return lanes;
    }

    for j in 0..k {
        if j + 1 < k {
            lanes.push((members[j], members[j + 1]));
        }
        if rng.r#gen::<f64>() > ratios.two {
            lanes.push((members[j], members[rng.gen_range(0..k)]));
        }
    }

    if rng.r#gen::<f64>() > ratios.one {
        lanes.push((members[k - 1], members[0]));
    } else {
        for j in (1..k).rev() {
            lanes.push((members[j], members[j - 1]));
        }
    }
    lanes
}

/// Pick outpost sites among `total` sectors in number order.
///
/// Runs exactly `target` draws. Draws that land on an already chosen sector,
/// or outside the sector range, are wasted, so fewer than `target` sites may
/// come back. Returns `(draw iteration, sector index)` pairs.
pub fn outpost_sites<R: Rng + ?Sized>(
    total: usize,
    target: usize,
    sampling: OutpostSampling,
    rng: &mut R,
) -> Vec<(usize, usize)> {
    let mut chosen = HashSet::new();
    let mut sites = Vec::with_capacity(target);
    if total == 0 {
        return sites;
    }

    for iteration in 0..target {
        let idx = match sampling {
            OutpostSampling::Legacy => rng.gen_range(1..=total),
            OutpostSampling::Uniform => rng.gen_range(0..total),
        };
        if idx >= total || !chosen.insert(idx) {
            continue;
        }
        sites.push((iteration, idx));
    }
    sites
}

/// Map a draw `r ∈ [0, 1)` to the first class whose cumulative threshold
/// exceeds it, scanning classes 1 through 8.
#[must_use]
pub fn outpost_class_for(probability: &OutpostProbability, r: f64) -> Option<OutpostClass> {
    probability
        .thresholds()
        .iter()
        .zip(OutpostClass::ALL)
        .find(|(threshold, _)| r < **threshold)
        .map(|(_, class)| class)
}

/// Draw a class using the configured cumulative thresholds.
pub fn sample_outpost_class<R: Rng + ?Sized>(
    probability: &OutpostProbability,
    rng: &mut R,
) -> Option<OutpostClass> {
    outpost_class_for(probability, rng.r#gen::<f64>())
}

// ---------------------------------------------------------------------------
// Persisting
// ---------------------------------------------------------------------------

/// Writes a generated galaxy through the persistence engine.
#[derive(Debug)]
pub struct BigBang<'a> {
    engine: &'a PersistenceEngine,
}

impl<'a> BigBang<'a> {
    /// Wrap an engine.
    #[must_use]
    pub fn new(engine: &'a PersistenceEngine) -> Self {
        Self { engine }
    }

    /// Whether a universe has already been generated.
    ///
    /// # Errors
    /// Returns [`SectorwarsError::Database`] on SQLite failures.
    pub fn universe_exists(&self) -> Result<bool> {
        Ok(self.engine.count::<Universe>()? > 0)
    }

    /// Generate and persist a new galaxy.
    ///
    /// Refuses to touch an existing universe unless `force` is set. With
    /// `force`, the old universe, clusters, sectors and outposts are removed
    /// and every existing player is moved to the new spawn sector.
    ///
    /// # Errors
    /// - [`SectorwarsError::Config`] if `config` is invalid.
    /// - [`SectorwarsError::UniverseExists`] if a universe exists and `force`
    ///   is not set.
    /// - Any persistence error; the run stops at the failing phase.
    pub fn run<R: Rng + ?Sized>(
        &self,
        config: &GalaxyConfig,
        force: bool,
        rng: &mut R,
    ) -> Result<GenerationReport> {
        config.validate()?;
        info!("Running big-bang");

        if self.universe_exists()? {
            if !force {
                return Err(SectorwarsError::UniverseExists);
            }
            info!("Imploding existing Universes");
        }

        let players: Vec<Player> = self.engine.find_all()?;
        self.purge()?;

        let plan = plan_universe(config, rng);
        let mut report = plan.report();
        report.players_rehomed = self.persist(plan, players)?;

        info!(
            sectors = report.sectors,
            clusters = report.clusters.len(),
            lanes = report.lanes,
            outposts = report.outposts,
            dropped = report.dropped_outposts,
            players = report.players_rehomed,
            "Big bang complete"
        );
        Ok(report)
    }

    fn purge(&self) -> Result<()> {
        self.engine.remove_all::<Universe>()?;
        self.engine.remove_all::<Cluster>()?;
        self.engine.remove_all::<Sector>()?;
        self.engine.remove_all::<Outpost>()?;
        Ok(())
    }

    /// Write `plan` phase by phase; returns how many players were re-homed.
    fn persist(&self, plan: UniversePlan, mut players: Vec<Player>) -> Result<usize> {
        let UniversePlan {
            mut universe,
            clusters,
            sectors,
            outposts,
            ..
        } = plan;
        let engine = self.engine;

        info!("Creating a new universe");
        let roster = std::mem::take(&mut universe.players);
        engine.create(std::slice::from_ref(&universe))?;

        // Phase 1: bare, numbered sectors.
        let bare: Vec<Sector> = sectors
            .iter()
            .map(|s| Sector {
                cluster: None,
                neighbors: Vec::new(),
                outposts: Vec::new(),
                ..s.clone()
            })
            .collect();
        engine.create(&bare)?;
        info!(count = bare.len(), "Created Sectors");

        // Phase 2: clusters, then the sector → cluster links.
        engine.create(&clusters)?;
        let assigned: Vec<Sector> = sectors
            .iter()
            .map(|s| Sector {
                neighbors: Vec::new(),
                outposts: Vec::new(),
                ..s.clone()
            })
            .collect();
        engine.save_many(&assigned)?;
        info!(count = clusters.len(), "Sectors Added to Clusters");
        for cluster in &clusters {
            info!(cluster = %cluster.name, sectors = cluster.sectors.len(), "Cluster");
        }

        // Phase 3: warp lanes.
        let linked: Vec<Sector> = sectors
            .iter()
            .map(|s| Sector {
                outposts: Vec::new(),
                ..s.clone()
            })
            .collect();
        engine.save_many(&linked)?;
        info!("Neighboring Sectors Connected");
        for sector in &linked {
            debug!(sector = %sector.name, neighbors = sector.neighbors.len(), "Sector lanes");
        }

        // Phase 4: outposts, then re-link them into their sectors.
        engine.create(&outposts)?;
        info!(count = outposts.len(), "Created Outposts");
        for class in OutpostClass::ALL {
            let count = outposts.iter().filter(|o| o.class == class).count();
            info!(class = class.get(), count, "Outpost class");
        }
        engine.save_many(&sectors)?;
        info!("Outposts Added to Sectors");

        // Phase 5: existing players move into the new universe.
        let mut rehomed = 0;
        universe.players = roster;
        if let Some(spawn) = universe.spawn_sector() {
            for player in &mut players {
                player.universe = universe.id;
                player.sector = spawn;
            }
            engine.save_many(&players)?;
            universe.players.extend(players.iter().map(|p| p.id));
            rehomed = players.len();
            if rehomed > 0 {
                info!(players = rehomed, "Players moved into the new universe");
            }
        }

        // Phase 6: the complete roster.
        engine.save_one(&universe)?;
        Ok(rehomed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
