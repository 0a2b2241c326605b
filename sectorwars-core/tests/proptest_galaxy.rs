//! Property-Based Tests for Galaxy Generation
//!
//! Uses `proptest` to check the structural invariants of a generated galaxy
//! for arbitrary cluster shapes, densities and seeds.

use std::collections::HashSet;

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use sectorwars_core::config::{
    ClusterConfig, ConnectionRatios, GalaxyConfig, OutpostConfig, OutpostSampling,
};
use sectorwars_core::generation::{cluster_lanes, outpost_sites, partition, plan_universe};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

fn arb_sampling() -> impl Strategy<Value = OutpostSampling> {
    prop_oneof![Just(OutpostSampling::Legacy), Just(OutpostSampling::Uniform)]
}

fn arb_config() -> impl Strategy<Value = GalaxyConfig> {
    (
        1usize..8,    // cluster count
        1usize..12,   // cluster size
        0.0..=1.0f64, // ratio one
        0.0..=1.0f64, // ratio two
        0.0..=1.0f64, // outpost density
        arb_sampling(),
    )
        .prop_map(|(count, size, one, two, density, sampling)| {
            let mut config = GalaxyConfig {
                clusters: ClusterConfig { count, size },
                outposts: OutpostConfig {
                    density,
                    sampling,
                    ..OutpostConfig::default()
                },
                ..GalaxyConfig::default()
            };
            config.sectors.connections.ratios = ConnectionRatios { one, two };
            config
        })
}

// ---------------------------------------------------------------------------
// Property: every sector lands in exactly one cluster
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn partition_is_exact(config in arb_config(), seed in any::<u64>()) {
        let plan = plan_universe(&config, &mut StdRng::seed_from_u64(seed));

        prop_assert_eq!(plan.clusters.len(), config.clusters.count);
        let mut seen = HashSet::new();
        for cluster in &plan.clusters {
            prop_assert_eq!(cluster.sectors.len(), config.clusters.size);
            for id in &cluster.sectors {
                prop_assert!(seen.insert(*id), "sector in two clusters");
            }
        }
        prop_assert_eq!(seen.len(), plan.sectors.len());
        for sector in &plan.sectors {
            prop_assert!(sector.cluster.is_some());
        }
    }

    #[test]
    fn sector_numbers_are_a_permutation(config in arb_config(), seed in any::<u64>()) {
        let plan = plan_universe(&config, &mut StdRng::seed_from_u64(seed));
        let total = config.clusters.count * config.clusters.size;

        let mut numbers: Vec<u32> = plan.sectors.iter().map(|s| s.number).collect();
        numbers.sort_unstable();
        let expected: Vec<u32> = (1..=u32::try_from(total).expect("fits")).collect();
        prop_assert_eq!(numbers, expected);
    }
}

// ---------------------------------------------------------------------------
// Property: lanes stay inside their cluster
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn lanes_never_cross_clusters(config in arb_config(), seed in any::<u64>()) {
        let plan = plan_universe(&config, &mut StdRng::seed_from_u64(seed));
        let cluster_of: std::collections::HashMap<_, _> = plan
            .sectors
            .iter()
            .map(|s| (s.id, s.cluster))
            .collect();
        for sector in &plan.sectors {
            for neighbor in &sector.neighbors {
                prop_assert_eq!(cluster_of.get(neighbor), Some(&sector.cluster));
            }
        }
    }

    #[test]
    fn chain_lanes_always_present(
        size in 1usize..20,
        one in 0.0..=1.0f64,
        two in 0.0..=1.0f64,
        seed in any::<u64>(),
    ) {
        let members: Vec<usize> = (0..size).collect();
        let ratios = ConnectionRatios { one, two };
        let lanes = cluster_lanes(&members, &ratios, &mut StdRng::seed_from_u64(seed));
        for pair in members.windows(2) {
            prop_assert!(lanes.contains(&(pair[0], pair[1])));
        }
    }
}

// ---------------------------------------------------------------------------
// Property: outposts are bounded, distinct and well-typed
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn outposts_bounded_and_distinct(config in arb_config(), seed in any::<u64>()) {
        let plan = plan_universe(&config, &mut StdRng::seed_from_u64(seed));

        prop_assert!(plan.outposts.len() + plan.dropped_outposts <= config.target_outposts());
        let sites: HashSet<_> = plan.outposts.iter().map(|o| o.sector).collect();
        prop_assert_eq!(sites.len(), plan.outposts.len());
        for outpost in &plan.outposts {
            prop_assert!((1..=8).contains(&outpost.class.get()));
        }
    }

    #[test]
    fn legacy_sampling_never_picks_the_first_sector(
        total in 1usize..200,
        density in 0.0..=1.0f64,
        seed in any::<u64>(),
    ) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let target = (total as f64 * density).floor() as usize;
        let sites = outpost_sites(
            total,
            target,
            OutpostSampling::Legacy,
            &mut StdRng::seed_from_u64(seed),
        );
        prop_assert!(sites.len() <= target);
        prop_assert!(sites.iter().all(|&(_, idx)| idx >= 1 && idx < total));
    }

    #[test]
    fn partition_ignores_surplus(count in 1usize..10, size in 1usize..10, extra in 0usize..10) {
        let order: Vec<usize> = (0..count * size + extra).collect();
        let groups = partition(&order, count, size);
        prop_assert_eq!(groups.len(), count);
        prop_assert!(groups.iter().all(|g| g.len() == size));
    }
}
