//! Chat command registry and dispatch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Source of human-readable "now playing" strings.
///
/// Implementations resolve track info synchronously and without network
/// I/O; the surrounding app keeps these strings fresh.
pub trait NowPlayingProvider: Send + Sync {
    fn current_track(&self) -> String;
    fn last_track(&self) -> String;
}

type CommandAction = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// A chat command: a set of triggers and a pure action.
///
/// The action receives the argument text (everything after the trigger,
/// original casing preserved) and formats a response from values already
/// in memory. No side effects, no I/O.
pub struct BotCommand {
    name: String,
    triggers: Vec<String>,
    description: String,
    action: CommandAction,
}

impl BotCommand {
    pub fn new(
        name: impl Into<String>,
        triggers: impl IntoIterator<Item = impl Into<String>>,
        description: impl Into<String>,
        action: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            triggers: triggers
                .into_iter()
                .map(|t| t.into().to_lowercase())
                .collect(),
            description: description.into(),
            action: Box::new(action),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn triggers(&self) -> &[String] {
        &self.triggers
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

struct RegisteredCommand {
    command: BotCommand,
    enabled: AtomicBool,
}

/// Registry of commands, matched in registration order.
///
/// Triggers are compared case-insensitively against the first token of a
/// message; argument text keeps its original casing. Commands are toggled
/// at runtime through [`CommandDispatcher::set_enabled`] rather than by
/// unregistering.
#[derive(Default)]
pub struct CommandDispatcher {
    commands: Vec<RegisteredCommand>,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command to the registry. First match wins, so triggers
    /// should be disjoint by convention.
    pub fn register(&mut self, command: BotCommand) {
        self.commands.push(RegisteredCommand {
            command,
            enabled: AtomicBool::new(true),
        });
    }

    /// Flip a command's runtime flag. Returns `false` when no command has
    /// that name.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        match self
            .commands
            .iter()
            .find(|entry| entry.command.name == name)
        {
            Some(entry) => {
                entry.enabled.store(enabled, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.commands
            .iter()
            .find(|entry| entry.command.name == name)
            .map(|entry| entry.enabled.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    /// Registered commands as `(name, description)` pairs, in order.
    pub fn descriptions(&self) -> Vec<(&str, &str)> {
        self.commands
            .iter()
            .map(|entry| (entry.command.name.as_str(), entry.command.description()))
            .collect()
    }

    /// Dispatch a raw chat message; returns the first matching command's
    /// response, or `None` when nothing matches.
    pub fn dispatch(&self, raw_text: &str) -> Option<String> {
        let text = raw_text.trim();
        let (first, rest) = match text.split_once(char::is_whitespace) {
            Some((first, rest)) => (first, rest.trim_start()),
            None => (text, ""),
        };
        if first.is_empty() {
            return None;
        }
        let trigger = first.to_lowercase();
        for entry in &self.commands {
            if !entry.command.triggers.iter().any(|t| *t == trigger) {
                continue;
            }
            if !entry.enabled.load(Ordering::Relaxed) {
                continue;
            }
            if let Some(response) = (entry.command.action)(rest) {
                return Some(response);
            }
        }
        None
    }
}

/// `!song` / `!currentsong` / `!nowplaying` — replies with the current track.
pub fn song_command(provider: Arc<dyn NowPlayingProvider>) -> BotCommand {
    BotCommand::new(
        "song",
        ["!song", "!currentsong", "!nowplaying"],
        "Replies with the track currently playing",
        move |_args| Some(provider.current_track()),
    )
}

/// `!lastsong` / `!previoussong` — replies with the previously played track.
pub fn last_song_command(provider: Arc<dyn NowPlayingProvider>) -> BotCommand {
    BotCommand::new(
        "lastsong",
        ["!lastsong", "!previoussong"],
        "Replies with the previously played track",
        move |_args| Some(provider.last_track()),
    )
}
