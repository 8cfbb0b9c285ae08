//! Line commands typed at the prompt.
//!
//! Only a handful of slash commands are local. Everything else, including
//! backend commands such as `/ОЦЕНИТЬ`, goes to the backend as text.

/// A parsed input line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// List the current actions.
    Actions,
    /// Activate the action at this 1-based position.
    Act(usize),
    /// Connect (or reconnect after exhaustion).
    Connect,
    /// Close the connection and stop reconnecting.
    Disconnect,
    /// Leave the client.
    Quit,
    /// Send as a prompt.
    Text(String),
    /// Blank line.
    Empty,
    /// A local command with a bad argument.
    Usage(&'static str),
}

impl Command {
    /// Parse one line of input.
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }

        let (head, rest) = trimmed
            .split_once(char::is_whitespace)
            .map_or((trimmed, ""), |(h, r)| (h, r.trim()));

        match head {
            "/actions" if rest.is_empty() => Self::Actions,
            "/act" => match rest.parse::<usize>() {
                Ok(n) if n > 0 => Self::Act(n),
                _ => Self::Usage("usage: /act <n>, see /actions"),
            },
            "/connect" if rest.is_empty() => Self::Connect,
            "/disconnect" if rest.is_empty() => Self::Disconnect,
            "/quit" | "/exit" if rest.is_empty() => Self::Quit,
            _ => Self::Text(trimmed.to_owned()),
        }
    }
}
