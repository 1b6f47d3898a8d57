//! Line commands accepted while tracking.

use std::str::FromStr;

/// One stdin command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `pause <hours>`
    Pause(f64),
    /// `safe`: answer a pending check-in.
    Safe,
    /// `ping [message]`: simulate a server check-in request.
    Ping(Option<String>),
    /// `status`
    Status,
    /// `help`
    Help,
    /// `quit` / `exit`
    Quit,
}

pub const HELP: &str = "\
Commands:
  pause <hours>    pause tracking (e.g. `pause 1.5`)
  safe             confirm you are safe after a check-in request
  ping [message]   simulate an ARE_YOU_OKAY push from the server
  status           show trip, cadence, and check-in state
  help             show this list
  quit             stop tracking and exit";

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(word, rest)| (word, rest.trim()));

        match word.to_ascii_lowercase().as_str() {
            "pause" => rest
                .parse::<f64>()
                .map(Self::Pause)
                .map_err(|_| "Please enter a valid number of hours.".to_string()),
            "safe" | "ok" => Ok(Self::Safe),
            "ping" => Ok(Self::Ping(
                (!rest.is_empty()).then(|| rest.to_string()),
            )),
            "status" => Ok(Self::Status),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            "" => Err(String::new()),
            other => Err(format!("Unknown command `{other}`; type `help`")),
        }
    }
}
