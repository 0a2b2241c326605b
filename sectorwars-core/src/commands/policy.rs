//! Dispatch policy gates.
//!
//! Gates run in a fixed order: visibility first, then registration. A public
//! sender of a private, registered-only command therefore always gets the
//! visibility guidance, never the registration prompt.

use crate::config::ChatConfig;
use crate::error::CommandError;
use crate::types::EventKind;

use super::CommandDef;

/// Verdict of the policy gates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    /// Run the handler.
    Allow,
    /// Drop the event without replying.
    Silent,
    /// Reply privately with the error text.
    Deny(CommandError),
}

/// Apply the gates to a matched command.
#[must_use]
pub fn check(def: &CommandDef, kind: EventKind, registered: bool, chat: &ChatConfig) -> Gate {
    if !def.public_allowed && chat.is_public(kind) {
        return if chat.is_ignored(kind) {
            Gate::Silent
        } else {
            Gate::Deny(CommandError::PrivateOnly(def.name))
        };
    }
    if def.requires_registered && !registered {
        return Gate::Deny(CommandError::NotRegistered);
    }
    Gate::Allow
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{CommandKind, STANDARD_COMMANDS};

    fn def(kind: CommandKind) -> CommandDef {
        STANDARD_COMMANDS
            .iter()
            .copied()
            .find(|d| d.kind == kind)
            .expect("standard command")
    }

    #[test]
    fn private_command_in_ambient_is_silent() {
        let chat = ChatConfig::default();
        let gate = check(&def(CommandKind::Display), EventKind::Ambient, false, &chat);
        assert_eq!(gate, Gate::Silent);
    }

    #[test]
    fn visibility_gate_precedes_registration_gate() {
        let chat = ChatConfig::default();
        let gate = check(&def(CommandKind::Display), EventKind::DirectMention, false, &chat);
        assert_eq!(gate, Gate::Deny(CommandError::PrivateOnly("display")));
    }

    #[test]
    fn unregistered_sender_gets_prompt_in_private() {
        let chat = ChatConfig::default();
        let gate = check(&def(CommandKind::Move), EventKind::DirectMessage, false, &chat);
        assert_eq!(gate, Gate::Deny(CommandError::NotRegistered));
    }

    #[test]
    fn register_needs_no_player() {
        let chat = ChatConfig::default();
        let gate = check(&def(CommandKind::Register), EventKind::DirectMessage, false, &chat);
        assert_eq!(gate, Gate::Allow);
    }

    #[test]
    fn public_commands_pass_everywhere() {
        let chat = ChatConfig::default();
        for kind in [EventKind::Ambient, EventKind::DirectMention, EventKind::DirectMessage] {
            assert_eq!(check(&def(CommandKind::Help), kind, false, &chat), Gate::Allow);
        }
    }

    #[test]
    fn ignore_list_is_configurable() {
        let chat = ChatConfig {
            ignored_events: Vec::new(),
            ..ChatConfig::default()
        };
        let gate = check(&def(CommandKind::Status), EventKind::Ambient, true, &chat);
        assert_eq!(gate, Gate::Deny(CommandError::PrivateOnly("status")));
    }
}
