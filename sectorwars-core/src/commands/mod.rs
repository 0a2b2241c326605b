//! Chat command parsing and dispatch.
//!
//! A [`CommandSet`] is an ordered list of [`CommandSpec`]s. Parsing tries the
//! specs in declaration order and the first whose pattern matches wins, so
//! adding a command never changes what an existing keyword resolves to.
//!
//! [`CommandEngine::handle`] runs the full pipeline for one chat event:
//! parse, apply the [`policy`] gates, then call the matching handler from
//! [`handlers`].

pub mod handlers;
pub mod policy;

use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::config::ChatConfig;
use crate::error::{CommandError, Result, SectorwarsError};
use crate::identity::IdentityDirectory;
use crate::session::GameSession;
use crate::types::{ChatEvent, Reply};

use policy::Gate;

// ---------------------------------------------------------------------------
// Command definitions
// ---------------------------------------------------------------------------

/// Every command the game understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Create a player for the sender.
    Register,
    /// Show the sender's current sector.
    Display,
    /// Show the sender's player summary.
    Status,
    /// Warp to a neighboring sector.
    Move,
    /// List the available commands.
    Help,
}

/// Static description of one command before its pattern is compiled.
#[derive(Debug, Clone, Copy)]
pub struct CommandDef {
    /// What the command does.
    pub kind: CommandKind,
    /// Canonical keyword, shown in help and policy replies.
    pub name: &'static str,
    /// Accepted keywords, the canonical one included.
    pub aliases: &'static [&'static str],
    /// One-line help text.
    pub description: &'static str,
    /// Whether the command may be run from a public channel.
    pub public_allowed: bool,
    /// Whether the sender must already own a player.
    pub requires_registered: bool,
}

/// The built-in commands, in dispatch order.
pub const STANDARD_COMMANDS: [CommandDef; 5] = [
    CommandDef {
        kind: CommandKind::Register,
        name: "register",
        aliases: &["register"],
        description: "Registers you as a player",
        public_allowed: false,
        requires_registered: false,
    },
    CommandDef {
        kind: CommandKind::Display,
        name: "display",
        aliases: &["display", "d"],
        description: "Display the sector you are in",
        public_allowed: false,
        requires_registered: true,
    },
    CommandDef {
        kind: CommandKind::Status,
        name: "status",
        aliases: &["status", "st"],
        description: "Show your player status",
        public_allowed: false,
        requires_registered: true,
    },
    CommandDef {
        kind: CommandKind::Move,
        name: "move",
        aliases: &["move", "m"],
        description: "Move to a neighboring sector",
        public_allowed: false,
        requires_registered: true,
    },
    CommandDef {
        kind: CommandKind::Help,
        name: "help",
        aliases: &["help", "h"],
        description: "List the available commands",
        public_allowed: true,
        requires_registered: false,
    },
];

/// A command with its compiled pattern.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Static definition.
    pub def: CommandDef,
    pattern: Regex,
}

impl CommandSpec {
    /// Compile a definition into a whole-word, case-insensitive pattern
    /// anchored at the start of the text.
    ///
    /// # Errors
    /// Returns [`SectorwarsError::Config`] if the aliases do not form a valid
    /// pattern.
    pub fn compile(def: CommandDef) -> Result<Self> {
        let alternation = def
            .aliases
            .iter()
            .map(|alias| regex::escape(alias))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = RegexBuilder::new(&format!(r"^\b({alternation})\b"))
            .case_insensitive(true)
            .build()
            .map_err(|e| SectorwarsError::Config(format!("command {}: {e}", def.name)))?;
        Ok(Self { def, pattern })
    }

    /// Byte length of the keyword if `text` starts with this command.
    fn match_len(&self, text: &str) -> Option<usize> {
        self.pattern.find(text).map(|m| m.end())
    }
}

/// The outcome of parsing a chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Which command matched.
    pub kind: CommandKind,
    /// Whitespace-separated words after the keyword.
    pub args: Vec<String>,
}

/// An ordered, first-match-wins collection of commands.
#[derive(Debug, Clone)]
pub struct CommandSet {
    specs: Vec<CommandSpec>,
}

impl CommandSet {
    /// Compile a set from definitions, keeping their order.
    ///
    /// # Errors
    /// Returns [`SectorwarsError::Config`] if any pattern fails to compile.
    pub fn new(defs: &[CommandDef]) -> Result<Self> {
        let specs = defs
            .iter()
            .map(|def| CommandSpec::compile(*def))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { specs })
    }

    /// The built-in commands.
    ///
    /// # Errors
    /// Returns [`SectorwarsError::Config`] if a built-in pattern fails to
    /// compile.
    pub fn standard() -> Result<Self> {
        Self::new(&STANDARD_COMMANDS)
    }

    /// Commands in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = &CommandSpec> {
        self.specs.iter()
    }

    /// Find a command by kind.
    #[must_use]
    pub fn get(&self, kind: CommandKind) -> Option<&CommandSpec> {
        self.specs.iter().find(|spec| spec.def.kind == kind)
    }

    /// Parse `text` into a command and its arguments.
    ///
    /// Specs are tried in declaration order; the first match wins.
    #[must_use]
    pub fn extract_command(&self, text: &str) -> Option<ParsedCommand> {
        let text = text.trim();
        self.specs.iter().find_map(|spec| {
            let end = spec.match_len(text)?;
            let args = text[end..]
                .split_whitespace()
                .map(str::to_string)
                .collect();
            Some(ParsedCommand {
                kind: spec.def.kind,
                args,
            })
        })
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Parses chat events and routes them to handlers.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    commands: CommandSet,
    chat: ChatConfig,
}

impl CommandEngine {
    /// Engine with the built-in commands.
    ///
    /// # Errors
    /// Returns [`SectorwarsError::Config`] if a command pattern fails to
    /// compile.
    pub fn new(chat: ChatConfig) -> Result<Self> {
        Ok(Self::with_commands(CommandSet::standard()?, chat))
    }

    /// Engine with a custom command set.
    #[must_use]
    pub fn with_commands(commands: CommandSet, chat: ChatConfig) -> Self {
        Self { commands, chat }
    }

    /// Handle one chat event, returning the replies to send in order.
    ///
    /// An empty vector means the event is silently ignored.
    pub fn handle(
        &self,
        session: &mut GameSession,
        directory: &dyn IdentityDirectory,
        event: &ChatEvent,
    ) -> Vec<Reply> {
        let Some(parsed) = self.commands.extract_command(&event.text) else {
            debug!(sender = %event.sender, kind = %event.kind, "No command matched");
            return vec![Reply::public(
                CommandError::NotFound(event.text.trim().to_string()).to_string(),
            )];
        };
        let Some(spec) = self.commands.get(parsed.kind) else {
            return Vec::new();
        };

        let registered = session.player_by_identity(&event.sender).is_some();
        match policy::check(&spec.def, event.kind, registered, &self.chat) {
            Gate::Allow => {}
            Gate::Silent => {
                debug!(command = spec.def.name, kind = %event.kind, "Ignored");
                return Vec::new();
            }
            Gate::Deny(err) => {
                debug!(command = spec.def.name, sender = %event.sender, %err, "Denied");
                return vec![Reply::private(err.to_string())];
            }
        }

        debug!(command = spec.def.name, sender = %event.sender, args = ?parsed.args, "Dispatching");
        let outcome = match parsed.kind {
            CommandKind::Register => handlers::register(session, directory, &event.sender),
            CommandKind::Display => {
                handlers::with_player(session, &event.sender, handlers::display)
            }
            CommandKind::Status => handlers::with_player(session, &event.sender, handlers::status),
            CommandKind::Move => {
                let target = parsed.args.first().map_or("", String::as_str);
                handlers::with_player_mut(session, &event.sender, |session, id| {
                    handlers::move_player(session, id, target)
                })
            }
            CommandKind::Help => Ok(handlers::help(&self.commands)),
        };

        match outcome {
            Ok(text) => vec![Reply::public(text)],
            Err(err) => vec![Reply::public(err.to_string())],
        }
    }
}
