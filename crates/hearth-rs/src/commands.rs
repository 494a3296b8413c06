//! Line input parsing for the terminal client.

use hearth_rs_protocol::ChatMode;

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text to send.
    Say(String),
    /// Send without showing the exchange in the transcript.
    Silent(String),
    Mode(ChatMode),
    Retry,
    History,
    Quit,
    Empty,
}

pub const HELP: &str = "commands: /mode test|production, /retry, /history, /silent <text>, /quit";

/// Parse an input line; errors carry a usage hint.
pub fn parse_command(input: &str) -> Result<Command, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Command::Empty);
    }
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Ok(Command::Say(trimmed.to_string()));
    };
    let (command, argument) = match rest.split_once(char::is_whitespace) {
        Some((command, argument)) => (command, argument.trim()),
        None => (rest, ""),
    };
    match command.to_lowercase().as_str() {
        "quit" | "exit" => Ok(Command::Quit),
        "retry" => Ok(Command::Retry),
        "history" => Ok(Command::History),
        "mode" => match argument.to_lowercase().as_str() {
            "test" => Ok(Command::Mode(ChatMode::Test)),
            "production" | "prod" => Ok(Command::Mode(ChatMode::Production)),
            _ => Err("usage: /mode test|production".to_string()),
        },
        "silent" if !argument.is_empty() => Ok(Command::Silent(argument.to_string())),
        "silent" => Err("usage: /silent <text>".to_string()),
        _ => Err(format!("unknown command /{command}; {HELP}")),
    }
}
