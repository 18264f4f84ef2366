//! REPL slash commands
//!
//! Lines starting with `/` are commands; anything else is a chat message.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    /// Re-render panels, dropping cached values first
    Refresh,
    State,
    History,
    States,
    Schema,
    Agent,
    Agents,
    Scenario,
    /// Archive session state and start a new session
    New,
    /// Clear the chat transcript only
    NewChat,
    Memories,
    Graph,
    Stats,
    Cleanup,
    Export,
    Clear,
    Quit,
}

impl ReplCommand {
    pub fn all() -> &'static [ReplCommand] {
        &[
            ReplCommand::Help,
            ReplCommand::Refresh,
            ReplCommand::State,
            ReplCommand::History,
            ReplCommand::States,
            ReplCommand::Schema,
            ReplCommand::Agent,
            ReplCommand::Agents,
            ReplCommand::Scenario,
            ReplCommand::New,
            ReplCommand::NewChat,
            ReplCommand::Memories,
            ReplCommand::Graph,
            ReplCommand::Stats,
            ReplCommand::Cleanup,
            ReplCommand::Export,
            ReplCommand::Clear,
            ReplCommand::Quit,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReplCommand::Help => "help",
            ReplCommand::Refresh => "refresh",
            ReplCommand::State => "state",
            ReplCommand::History => "history",
            ReplCommand::States => "states",
            ReplCommand::Schema => "schema",
            ReplCommand::Agent => "agent",
            ReplCommand::Agents => "agents",
            ReplCommand::Scenario => "scenario",
            ReplCommand::New => "new",
            ReplCommand::NewChat => "newchat",
            ReplCommand::Memories => "memories",
            ReplCommand::Graph => "graph",
            ReplCommand::Stats => "stats",
            ReplCommand::Cleanup => "cleanup",
            ReplCommand::Export => "export",
            ReplCommand::Clear => "clear",
            ReplCommand::Quit => "quit",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ReplCommand::Help => "show this help",
            ReplCommand::Refresh => "force-refresh all state panels",
            ReplCommand::State => "show the current state",
            ReplCommand::History => "show state transitions",
            ReplCommand::States => "show every state in this session",
            ReplCommand::Schema => "show the agent's schema",
            ReplCommand::Agent => "switch agent: /agent <id>",
            ReplCommand::Agents => "list available agents",
            ReplCommand::Scenario => "play a demo scenario: /scenario <id>",
            ReplCommand::New => "start a new session (stateful mode archives state first)",
            ReplCommand::NewChat => "clear the chat transcript",
            ReplCommand::Memories => "list stored memories",
            ReplCommand::Graph => "show entities and relationships",
            ReplCommand::Stats => "show memory statistics",
            ReplCommand::Cleanup => "show cleanup suggestions",
            ReplCommand::Export => "start a data export",
            ReplCommand::Clear => "delete all memories",
            ReplCommand::Quit => "exit",
        }
    }

    pub fn takes_args(&self) -> bool {
        matches!(self, ReplCommand::Agent | ReplCommand::Scenario)
    }

    /// Commands that only make sense in the stateful REPL
    pub fn is_stateful_only(&self) -> bool {
        matches!(
            self,
            ReplCommand::Refresh
                | ReplCommand::State
                | ReplCommand::History
                | ReplCommand::States
                | ReplCommand::Schema
                | ReplCommand::Agent
                | ReplCommand::Scenario
        )
    }

    pub fn matches(prefix: &str) -> Vec<ReplCommand> {
        let prefix = prefix.to_lowercase();
        Self::all()
            .iter()
            .filter(|cmd| cmd.name().starts_with(&prefix))
            .copied()
            .collect()
    }

    pub fn parse(name: &str) -> Option<ReplCommand> {
        let name = name.to_lowercase();
        match name.as_str() {
            "exit" | "q" => return Some(ReplCommand::Quit),
            "?" => return Some(ReplCommand::Help),
            _ => {}
        }
        Self::all().iter().find(|cmd| cmd.name() == name).copied()
    }
}

impl fmt::Display for ReplCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedCommand {
    Command(ReplCommand, String),
    Unknown(String),
}

/// Parse a REPL line. `None` means it is a chat message.
pub fn parse_command(input: &str) -> Option<ParsedCommand> {
    let rest = input.trim().strip_prefix('/')?;
    let mut parts = rest.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default();
    let args = parts.next().unwrap_or_default().trim().to_string();

    match ReplCommand::parse(name) {
        Some(cmd) => Some(ParsedCommand::Command(cmd, args)),
        None => Some(ParsedCommand::Unknown(name.to_string())),
    }
}

/// Help listing for the given REPL mode.
pub fn help_text(stateful: bool) -> String {
    ReplCommand::all()
        .iter()
        .filter(|cmd| stateful || !cmd.is_stateful_only())
        .map(|cmd| format!("  {:<12} {}", cmd.to_string(), cmd.description()))
        .collect::<Vec<_>>()
        .join("\n")
}
