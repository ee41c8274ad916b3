//! Line commands understood by the interactive host.

use anyhow::{anyhow, bail, Context};
use guard_core::{EventKind, PartialConfiguration};
use std::str::FromStr;

pub const HELP: &str = "\
commands:
  <event>          publish a raw event (mousedown, mousemove, keypress, scroll,
                   touchstart, click, focus, blur, visible, hidden)
  status           session and engine status as JSON
  metrics          metrics snapshot as JSON
  config           current configuration as JSON
  preset <NAME>    apply DEVELOPMENT, OFFICE, PUBLIC or ADMIN
  update <JSON>    merge a partial configuration, e.g. update {\"warning_time_ms\": 60000}
  reset            restore default configuration
  extend           continue the session from the warning
  logout           end the session now
  init             force a fresh initialization
  help             this text
  quit             stop monitoring and exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Event(EventKind),
    Status,
    Metrics,
    Config,
    Preset(String),
    Update(PartialConfiguration),
    Reset,
    Extend,
    Logout,
    Init,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "" => bail!("empty command"),
            "status" => Self::Status,
            "metrics" => Self::Metrics,
            "config" => Self::Config,
            "preset" => {
                if rest.is_empty() {
                    bail!("usage: preset <NAME>");
                }
                Self::Preset(rest.to_string())
            }
            "update" => {
                let patch = serde_json::from_str(rest).context("invalid configuration patch")?;
                Self::Update(patch)
            }
            "reset" => Self::Reset,
            "extend" => Self::Extend,
            "logout" => Self::Logout,
            "init" => Self::Init,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => other
                .parse()
                .map(Self::Event)
                .map_err(|_| anyhow!("unknown command '{other}' (try 'help')"))?,
        };
        Ok(command)
    }
}
