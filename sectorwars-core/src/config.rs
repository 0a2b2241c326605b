//! Configuration for Sectorwars.
//!
//! Maps directly to `sectorwars.toml`. Loaded once at startup; there is no
//! live reload. Every section has defaults so a partial file is valid, but
//! [`SectorwarsConfig::validate`] rejects values the generator cannot honour.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SectorwarsError};
use crate::types::EventKind;

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectorwarsConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Galaxy shape and generation tuning.
    #[serde(default)]
    pub game: GalaxyConfig,
    /// Persistence / save settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Chat channel policy.
    #[serde(default)]
    pub chat: ChatConfig,
    /// Known chat identities, served by the static identity directory.
    #[serde(default)]
    pub profiles: Vec<ProfileConfig>,
}

impl SectorwarsConfig {
    /// Load and validate configuration from a TOML string.
    ///
    /// # Errors
    /// Returns [`SectorwarsError::Config`] if the TOML is invalid or a value
    /// is out of range.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| SectorwarsError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Check every section for values the game cannot run with.
    ///
    /// # Errors
    /// Returns [`SectorwarsError::Config`] describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        self.game.validate()
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level used when `RUST_LOG` is unset: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Everything the galaxy generator needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GalaxyConfig {
    /// Cluster count and size.
    #[serde(default)]
    pub clusters: ClusterConfig,
    /// Warp lane tuning.
    #[serde(default)]
    pub sectors: SectorConfig,
    /// Outpost density and class distribution.
    #[serde(default)]
    pub outposts: OutpostConfig,
}

impl GalaxyConfig {
    /// Total number of sectors the generator will create.
    #[must_use]
    pub fn total_sectors(&self) -> usize {
        self.clusters.count.saturating_mul(self.clusters.size)
    }

    /// Sector count as a sector number bound, or `None` if `count × size`
    /// does not fit the `u32` sector numbering.
    #[must_use]
    pub fn sector_count(&self) -> Option<u32> {
        self.clusters
            .count
            .checked_mul(self.clusters.size)
            .and_then(|total| u32::try_from(total).ok())
    }

    /// Number of outposts the placement loop aims for.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn target_outposts(&self) -> usize {
        (self.total_sectors() as f64 * self.outposts.density).floor() as usize
    }

    /// Validate ranges.
    ///
    /// # Errors
    /// Returns [`SectorwarsError::Config`] on the first out-of-range value.
    pub fn validate(&self) -> Result<()> {
        if self.clusters.count == 0 {
            return Err(config_error("game.clusters.count must be at least 1"));
        }
        if self.clusters.size == 0 {
            return Err(config_error("game.clusters.size must be at least 1"));
        }
        if self.sector_count().is_none() {
            return Err(config_error(&format!(
                "game.clusters.count × game.clusters.size must not exceed {}",
                u32::MAX
            )));
        }
        let ratios = &self.sectors.connections.ratios;
        check_unit("game.sectors.connections.ratios.one", ratios.one)?;
        check_unit("game.sectors.connections.ratios.two", ratios.two)?;
        check_unit("game.outposts.density", self.outposts.density)?;

        let mut previous = 0.0;
        for (name, threshold) in self.outposts.probability.named() {
            check_unit(&format!("game.outposts.probability.{name}"), threshold)?;
            if threshold < previous {
                return Err(config_error(&format!(
                    "game.outposts.probability.{name} ({threshold}) must not be lower than the previous threshold ({previous})"
                )));
            }
            previous = threshold;
        }
        Ok(())
    }
}

/// Cluster partition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Number of clusters.
    #[serde(default = "default_cluster_count")]
    pub count: usize,
    /// Sectors per cluster.
    #[serde(default = "default_cluster_size")]
    pub size: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            count: default_cluster_count(),
            size: default_cluster_size(),
        }
    }
}

/// Sector settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectorConfig {
    /// Warp lane construction.
    #[serde(default)]
    pub connections: ConnectionConfig,
}

/// Warp lane construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Edge probabilities.
    #[serde(default)]
    pub ratios: ConnectionRatios,
}

/// Edge probabilities. Each extra edge is added when a uniform draw exceeds
/// the ratio, so higher ratios mean sparser clusters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionRatios {
    /// Above this draw a cluster closes into a loop; otherwise it gets a
    /// full reverse chain.
    #[serde(default = "default_half")]
    pub one: f64,
    /// Above this draw a sector gets one extra random lane inside its cluster.
    #[serde(default = "default_half")]
    pub two: f64,
}

impl Default for ConnectionRatios {
    fn default() -> Self {
        Self { one: 0.5, two: 0.5 }
    }
}

/// How the placement loop picks candidate sectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutpostSampling {
    /// Draw from `1..=total`: sector 1 is never eligible and a draw of
    /// `total` is wasted.
    #[default]
    Legacy,
    /// Draw from `0..total`.
    Uniform,
}

/// Outpost placement settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutpostConfig {
    /// Fraction of sectors the placement loop aims to fill.
    #[serde(default = "default_density")]
    pub density: f64,
    /// Candidate sector sampling mode.
    #[serde(default)]
    pub sampling: OutpostSampling,
    /// Cumulative class thresholds.
    #[serde(default)]
    pub probability: OutpostProbability,
}

impl Default for OutpostConfig {
    fn default() -> Self {
        Self {
            density: default_density(),
            sampling: OutpostSampling::default(),
            probability: OutpostProbability::default(),
        }
    }
}

/// Cumulative probability thresholds for outpost classes 1 through 8.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct OutpostProbability {
    pub one: f64,
    pub two: f64,
    pub three: f64,
    pub four: f64,
    pub five: f64,
    pub six: f64,
    pub seven: f64,
    pub eight: f64,
}

impl OutpostProbability {
    /// Thresholds in class order, `[one, .., eight]`.
    #[must_use]
    pub fn thresholds(&self) -> [f64; 8] {
        [
            self.one, self.two, self.three, self.four, self.five, self.six, self.seven, self.eight,
        ]
    }

    fn named(&self) -> [(&'static str, f64); 8] {
        let names = ["one", "two", "three", "four", "five", "six", "seven", "eight"];
        let thresholds = self.thresholds();
        std::array::from_fn(|i| (names[i], thresholds[i]))
    }
}

impl Default for OutpostProbability {
    fn default() -> Self {
        Self {
            one: 0.125,
            two: 0.25,
            three: 0.375,
            four: 0.5,
            five: 0.625,
            six: 0.75,
            seven: 0.875,
            eight: 1.0,
        }
    }
}

/// Persistence / save settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Path of the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Enable SQLite WAL journal mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Store and verify a CRC-32 per row.
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,
    /// Rotating backups kept before a forced regeneration (0 disables).
    #[serde(default = "default_backup_count")]
    pub backup_count: u32,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            wal_mode: true,
            checksum_enabled: true,
            backup_count: default_backup_count(),
        }
    }
}

/// Which chat event kinds count as public, and which are ignored outright
/// when a private-only command arrives on them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Event kinds that are visible to other users.
    #[serde(default = "default_public_events")]
    pub public_events: Vec<EventKind>,
    /// Public event kinds that never get a visibility reply.
    #[serde(default = "default_ignored_events")]
    pub ignored_events: Vec<EventKind>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            public_events: default_public_events(),
            ignored_events: default_ignored_events(),
        }
    }
}

impl ChatConfig {
    /// Whether an event of this kind is visible to others.
    #[must_use]
    pub fn is_public(&self, kind: EventKind) -> bool {
        self.public_events.contains(&kind)
    }

    /// Whether an event of this kind is silently dropped by the visibility gate.
    #[must_use]
    pub fn is_ignored(&self, kind: EventKind) -> bool {
        self.ignored_events.contains(&kind)
    }
}

/// One entry of the static identity directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Chat identity (user id on the chat platform).
    pub id: String,
    /// Given name.
    #[serde(default)]
    pub first_name: String,
    /// Family name.
    #[serde(default)]
    pub last_name: String,
    /// Handle shown in chat.
    pub display_name: String,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn config_error(message: &str) -> SectorwarsError {
    SectorwarsError::Config(message.to_string())
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(config_error(&format!("{name} must be within [0, 1], got {value}")))
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_cluster_count() -> usize {
    10
}
fn default_cluster_size() -> usize {
    10
}
fn default_half() -> f64 {
    0.5
}
fn default_density() -> f64 {
    0.3
}
fn default_true() -> bool {
    true
}
fn default_db_path() -> String {
    "sectorwars.db".to_string()
}
fn default_backup_count() -> u32 {
    3
}
fn default_public_events() -> Vec<EventKind> {
    vec![EventKind::DirectMention, EventKind::Ambient]
}
fn default_ignored_events() -> Vec<EventKind> {
    vec![EventKind::Ambient]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
