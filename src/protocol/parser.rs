//! Line protocol command parser.
//!
//! Parses incoming protocol lines into structured `Command` variants that the
//! binary's main loop dispatches on.

use tracing::warn;

use crate::territory::UserId;

/// A parsed client-to-engine command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Synchronization ping; engine must reply `readyok`.
    IsReady,

    /// Lists the engine options and their current values.
    Options,

    /// Set an engine option: `setoption name <id> [value <x>]`.
    SetOption { name: String, value: Option<String> },

    /// Register or update a user: `user <id> <color> <name...>`.
    User { id: UserId, color: String, name: String },

    /// Submit a route: `route <userId> <distance> <duration> <payload>`.
    Route {
        user: UserId,
        distance_m: f64,
        duration_s: f64,
        payload: String,
    },

    /// Print a user's territory.
    Territory { user: UserId },

    /// Print a user's conquest totals.
    Stats { user: UserId },

    /// Write the whole store to a JSON file.
    Save { path: String },

    /// Replace the whole store from a JSON file.
    Load { path: String },

    /// Terminate the engine process.
    Quit,
}

/// Parses a single line of input into a `Command`.
///
/// Returns `None` for empty lines or unrecognized commands. Malformed
/// arguments for known commands also return `None` after logging a warning.
pub fn parse_command(line: &str) -> Option<Command> {
    let trimmed = line.trim();
    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }

    match tokens[0] {
        "isready" => Some(Command::IsReady),
        "options" => Some(Command::Options),
        "quit" => Some(Command::Quit),

        "setoption" => parse_setoption(&tokens),
        "user" => parse_user(&tokens, trimmed),
        "route" => parse_route(&tokens, trimmed),
        "territory" => parse_user_id(&tokens, "territory").map(|user| Command::Territory { user }),
        "stats" => parse_user_id(&tokens, "stats").map(|user| Command::Stats { user }),
        "save" => rest_after(trimmed, 1).map(|path| Command::Save { path: path.to_string() }),
        "load" => rest_after(trimmed, 1).map(|path| Command::Load { path: path.to_string() }),

        other => {
            warn!(command = other, "unknown command");
            None
        }
    }
}

/// Returns the text following the first `n` whitespace-separated tokens, or
/// `None` if nothing follows them.
fn rest_after(line: &str, n: usize) -> Option<&str> {
    let mut rest = line.trim_start();
    for _ in 0..n {
        let end = rest.find(char::is_whitespace)?;
        rest = rest[end..].trim_start();
    }
    let rest = rest.trim_end();
    if rest.is_empty() {
        warn!(line, "missing argument");
        None
    } else {
        Some(rest)
    }
}

/// Parses `setoption name <id> [value <x>]`.
fn parse_setoption(tokens: &[&str]) -> Option<Command> {
    if tokens.len() < 3 || tokens[1] != "name" {
        warn!("malformed setoption: expected 'setoption name <id> [value <x>]'");
        return None;
    }

    let value_idx = tokens.iter().position(|&t| t == "value");
    let (name, value) = match value_idx {
        Some(vi) => {
            let name_parts = &tokens[2..vi];
            let value_parts = &tokens[vi + 1..];
            if name_parts.is_empty() {
                warn!("malformed setoption: empty name");
                return None;
            }
            let value = if value_parts.is_empty() {
                None
            } else {
                Some(value_parts.join(" "))
            };
            (name_parts.join(" "), value)
        }
        None => (tokens[2..].join(" "), None),
    };

    Some(Command::SetOption { name, value })
}

fn parse_user_id(tokens: &[&str], command: &str) -> Option<UserId> {
    let Some(raw) = tokens.get(1) else {
        warn!(command, "missing user id");
        return None;
    };
    match raw.parse() {
        Ok(id) => Some(id),
        Err(_) => {
            warn!(command, value = raw, "invalid user id");
            None
        }
    }
}

/// Parses `user <id> <color> <name...>`.
fn parse_user(tokens: &[&str], full_line: &str) -> Option<Command> {
    if tokens.len() < 4 {
        warn!("malformed user: expected 'user <id> <color> <name...>'");
        return None;
    }
    let id = parse_user_id(tokens, "user")?;
    let name = rest_after(full_line, 3)?.to_string();
    Some(Command::User {
        id,
        color: tokens[2].to_string(),
        name,
    })
}

/// Parses `route <userId> <distance> <duration> <payload>`.
fn parse_route(tokens: &[&str], full_line: &str) -> Option<Command> {
    if tokens.len() < 5 {
        warn!("malformed route: expected 'route <userId> <distance> <duration> <payload>'");
        return None;
    }
    let user = parse_user_id(tokens, "route")?;
    let number = |raw: &str, what: &str| match raw.parse::<f64>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(field = what, value = raw, "invalid route number");
            None
        }
    };
    let distance_m = number(tokens[2], "distance")?;
    let duration_s = number(tokens[3], "duration")?;
    let payload = rest_after(full_line, 4)?.to_string();
    Some(Command::Route {
        user,
        distance_m,
        duration_s,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_commands() {
        assert_eq!(parse_command("isready"), Some(Command::IsReady));
        assert_eq!(parse_command("options"), Some(Command::Options));
        assert_eq!(parse_command("quit"), Some(Command::Quit));
    }

    #[test]
    fn parse_empty_line_returns_none() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
        assert_eq!(parse_command("\t"), None);
    }

    #[test]
    fn parse_unknown_command_returns_none() {
        assert_eq!(parse_command("foobar"), None);
    }

    #[test]
    fn parse_setoption_with_value() {
        let cmd = parse_command("setoption name CorridorWidth value 25").unwrap();
        assert_eq!(
            cmd,
            Command::SetOption {
                name: "CorridorWidth".to_string(),
                value: Some("25".to_string()),
            }
        );
    }

    #[test]
    fn parse_setoption_no_value() {
        let cmd = parse_command("setoption name NegligibleArea").unwrap();
        assert_eq!(
            cmd,
            Command::SetOption {
                name: "NegligibleArea".to_string(),
                value: None,
            }
        );
    }

    #[test]
    fn parse_setoption_malformed_returns_none() {
        assert_eq!(parse_command("setoption"), None);
        assert_eq!(parse_command("setoption foo"), None);
        assert_eq!(parse_command("setoption name value 3"), None);
    }

    #[test]
    fn parse_user_with_multi_word_name() {
        let cmd = parse_command("user 7 #ff8800 Mary  Ann Lee").unwrap();
        assert_eq!(
            cmd,
            Command::User {
                id: UserId(7),
                color: "#ff8800".to_string(),
                name: "Mary  Ann Lee".to_string(),
            }
        );
    }

    #[test]
    fn parse_user_malformed_returns_none() {
        assert_eq!(parse_command("user 7 #ff8800"), None);
        assert_eq!(parse_command("user seven #ff8800 Mary"), None);
    }

    #[test]
    fn parse_route_keeps_payload_verbatim() {
        let cmd = parse_command(r#"route 3 1200.5 600 {"type": "LineString", "coordinates": [[1, 2], [3, 4]]}"#).unwrap();
        assert_eq!(
            cmd,
            Command::Route {
                user: UserId(3),
                distance_m: 1200.5,
                duration_s: 600.0,
                payload: r#"{"type": "LineString", "coordinates": [[1, 2], [3, 4]]}"#.to_string(),
            }
        );
    }

    #[test]
    fn parse_route_malformed_returns_none() {
        assert_eq!(parse_command("route 3 1200 600"), None);
        assert_eq!(parse_command("route 3 far 600 [[1,2],[3,4]]"), None);
        assert_eq!(parse_command("route x 1200 600 [[1,2],[3,4]]"), None);
    }

    #[test]
    fn parse_queries_and_files() {
        assert_eq!(parse_command("territory 4"), Some(Command::Territory { user: UserId(4) }));
        assert_eq!(parse_command("stats 4"), Some(Command::Stats { user: UserId(4) }));
        assert_eq!(parse_command("stats"), None);
        assert_eq!(
            parse_command("save /tmp/my store.json"),
            Some(Command::Save {
                path: "/tmp/my store.json".to_string()
            })
        );
        assert_eq!(
            parse_command("load state.json"),
            Some(Command::Load {
                path: "state.json".to_string()
            })
        );
        assert_eq!(parse_command("load"), None);
    }

    #[test]
    fn parse_with_leading_trailing_whitespace() {
        assert_eq!(parse_command("  isready  "), Some(Command::IsReady));
    }
}
