//! Identity directory abstraction.
//!
//! The chat platform knows who a handle belongs to; the game only needs a
//! name for new players. [`IdentityDirectory`] is the seam, and
//! [`StaticDirectory`] serves profiles listed in the configuration file.

use std::collections::HashMap;

use crate::config::ProfileConfig;

/// What the directory knows about a chat identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Handle shown in chat.
    pub display_name: String,
}

/// Resolve a chat identity to a profile.
///
/// Implementations must be `Send + Sync` so a bot can share one directory
/// across threads.
pub trait IdentityDirectory: Send + Sync {
    /// Look up an identity. `None` means the identity is unknown.
    fn lookup(&self, identity: &str) -> Option<Profile>;
}

/// A fixed set of profiles held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    profiles: HashMap<String, Profile>,
}

impl StaticDirectory {
    /// An empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from the `[[profiles]]` section of the config.
    #[must_use]
    pub fn from_config(profiles: &[ProfileConfig]) -> Self {
        let mut directory = Self::new();
        for p in profiles {
            directory.insert(
                p.id.clone(),
                Profile {
                    first_name: p.first_name.clone(),
                    last_name: p.last_name.clone(),
                    display_name: p.display_name.clone(),
                },
            );
        }
        directory
    }

    /// Add or replace a profile.
    pub fn insert(&mut self, identity: impl Into<String>, profile: Profile) {
        self.profiles.insert(identity.into(), profile);
    }

    /// Number of known identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether the directory is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl IdentityDirectory for StaticDirectory {
    fn lookup(&self, identity: &str) -> Option<Profile> {
        self.profiles.get(identity).cloned()
    }
}
