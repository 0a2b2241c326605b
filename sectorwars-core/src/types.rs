//! Core type definitions: entity identifiers and the chat boundary types.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random id.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Surrogate id of the (single) active universe.
    UniverseId
);
entity_id!(
    /// Surrogate id of a cluster.
    ClusterId
);
entity_id!(
    /// Surrogate id of a sector. Distinct from the sector's visible number.
    SectorId
);
entity_id!(
    /// Surrogate id of an outpost.
    OutpostId
);
entity_id!(
    /// Surrogate id of a player.
    PlayerId
);

// ---------------------------------------------------------------------------
// Chat boundary
// ---------------------------------------------------------------------------

/// How a chat message reached the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// The bot was @-mentioned in a shared channel.
    DirectMention,
    /// A message in a shared channel the bot can read but was not addressed to.
    Ambient,
    /// A one-to-one conversation with the bot.
    DirectMessage,
}

impl EventKind {
    /// Stable wire name, as used in configuration.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DirectMention => "direct_mention",
            Self::Ambient => "ambient",
            Self::DirectMessage => "direct_message",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An incoming chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEvent {
    /// Chat identity of the sender.
    pub sender: String,
    /// Channel kind the message arrived on.
    pub kind: EventKind,
    /// Raw message text.
    pub text: String,
}

impl ChatEvent {
    /// Build a chat event.
    #[must_use]
    pub fn new(sender: impl Into<String>, kind: EventKind, text: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            kind,
            text: text.into(),
        }
    }
}

/// One outgoing message for the chat collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    /// Message body (chat markdown).
    pub text: String,
    /// Whether the reply must be delivered in a private channel.
    pub private: bool,
}

impl Reply {
    /// A reply that may be posted where the event came from.
    #[must_use]
    pub fn public(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            private: false,
        }
    }

    /// A reply that must go to the sender's private channel.
    #[must_use]
    pub fn private(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            private: true,
        }
    }
}
