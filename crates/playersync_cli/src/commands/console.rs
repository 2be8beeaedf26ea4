//! Console command implementation.
//!
//! Built-in line commands:
//!
//! | command | effect |
//! |---|---|
//! | `set <key> <value>` | write a value (`true`/`false`, integer, float, or text) |
//! | `get <key>` | show a value and its kind |
//! | `list [all]` | dump the store, metadata included with `all` |
//! | `json` | dump the store as JSON |
//! | `remote` | show the backend's copy of the record |
//! | `log [channel]` | show a console channel (default `Sync`) |
//! | `stats` | show sync statistics |
//! | `player` | show the session |
//! | `help` | list commands |
//! | `quit` | leave |
//!
//! Any other line invokes the registered command of that name.

use crate::backend::Backend;
use playersync_core::{StoreError, ValueCell};
use playersync_engine::{CommandError, SYNC_CHANNEL};
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use thiserror::Error;

/// Whether the console should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Output of one console line.
#[derive(Debug)]
pub struct Output {
    pub lines: Vec<String>,
    pub flow: Flow,
}

impl Output {
    fn lines(lines: Vec<String>) -> Self {
        Self {
            lines,
            flow: Flow::Continue,
        }
    }

    fn line(line: impl Into<String>) -> Self {
        Self::lines(vec![line.into()])
    }
}

/// Errors reported for a console line.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("unknown command: {0} (try 'help')")]
    UnknownCommand(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Command(CommandError),
}

impl From<CommandError> for ShellError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::NotFound(name) => ShellError::UnknownCommand(name),
            other => ShellError::Command(other),
        }
    }
}

/// Line interpreter over a connected backend.
pub struct Shell {
    backend: Backend,
}

impl Shell {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Executes one console line.
    pub async fn execute(&self, line: &str) -> Result<Output, ShellError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(Output::lines(Vec::new()));
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let sync = &self.backend.sync;

        match word.to_ascii_lowercase().as_str() {
            "quit" | "exit" => Ok(Output {
                lines: Vec::new(),
                flow: Flow::Quit,
            }),
            "help" => Ok(Output::lines(self.help())),
            "set" => {
                let (key, raw) = rest
                    .split_once(char::is_whitespace)
                    .ok_or(ShellError::Usage("set <key> <value>"))?;
                let value = parse_value(raw.trim());
                let kind = value.kind();
                sync.set(key, value.clone()).await?;
                Ok(Output::line(format!("{key} = {value} ({kind})")))
            }
            "get" => {
                if rest.is_empty() {
                    return Err(ShellError::Usage("get <key>"));
                }
                let line = sync
                    .with_store(|store| match store.value(rest) {
                        Some(value) => format!("{rest} = {value} ({})", value.kind()),
                        None => format!("{rest} is not set"),
                    })
                    .await;
                Ok(Output::line(line))
            }
            "list" => {
                let include_metadata = rest.eq_ignore_ascii_case("all");
                let dump = sync.with_store(|s| s.debug_dump(include_metadata)).await;
                Ok(Output::line(dump))
            }
            "json" => {
                let json = sync
                    .with_store(|store| {
                        let entries: BTreeMap<&str, &ValueCell> = store.iter().collect();
                        serde_json::to_string_pretty(&entries)
                    })
                    .await?;
                Ok(Output::line(json))
            }
            "remote" => {
                let player_id = &self.backend.session.player_id;
                let line = match self.backend.server.record(player_id) {
                    Some(record) => record
                        .iter()
                        .map(|(k, v)| format!("{k}:{v}"))
                        .collect::<Vec<_>>()
                        .join(", "),
                    None => format!("no record for {player_id}"),
                };
                Ok(Output::line(line))
            }
            "log" => {
                let channel = if rest.is_empty() { SYNC_CHANNEL } else { rest };
                Ok(Output::lines(self.backend.console.lines.lines(channel)))
            }
            "stats" => {
                let stats = sync.stats();
                Ok(Output::lines(vec![
                    format!("saves: {} ({} keys)", stats.saves, stats.keys_pushed),
                    format!("loads: {} ({} keys)", stats.loads, stats.keys_pulled),
                    format!("deletes: {} ({} keys)", stats.deletes, stats.keys_deleted),
                    format!("wipes: {}", stats.wipes),
                    format!("failures: {}", stats.failures),
                    format!(
                        "last error: {}",
                        stats.last_error.as_deref().unwrap_or("none")
                    ),
                ]))
            }
            "player" => {
                let session = &self.backend.session;
                let auth = if session.is_authenticated() {
                    "with token"
                } else {
                    "guest"
                };
                Ok(Output::line(format!("{} ({auth})", session.player_id)))
            }
            _ => {
                self.backend.registry.invoke(line).await?;
                Ok(Output::lines(Vec::new()))
            }
        }
    }

    fn help(&self) -> Vec<String> {
        let mut lines = vec![
            "set <key> <value> | get <key> | list [all] | json | remote".to_string(),
            "log [channel] | stats | player | help | quit".to_string(),
            "registered commands:".to_string(),
        ];
        lines.extend(
            self.backend
                .registry
                .names()
                .into_iter()
                .map(|name| format!("  {name}")),
        );
        lines
    }
}

/// Parses a console value: `true`/`false`, then integer, then finite
/// float, otherwise text. Double quotes force text.
pub fn parse_value(raw: &str) -> ValueCell {
    if let Some(text) = raw
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
    {
        return ValueCell::Text(text.to_string());
    }
    if raw.eq_ignore_ascii_case("true") {
        return ValueCell::Boolean(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return ValueCell::Boolean(false);
    }
    if let Ok(n) = raw.parse::<i64>() {
        return ValueCell::Integer(n);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() => ValueCell::Float(f),
        _ => ValueCell::Text(raw.to_string()),
    }
}

/// Reads lines from stdin until `quit` or end of input.
pub async fn run_interactive(shell: &Shell) -> Result<(), Box<dyn std::error::Error>> {
    println!(
        "PlayerSync console v{} - player {} - type 'help'",
        env!("CARGO_PKG_VERSION"),
        shell.backend().session.player_id
    );

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next().transpose()? else {
            break;
        };
        match shell.execute(&line).await {
            Ok(output) => {
                for text in &output.lines {
                    println!("{text}");
                }
                if output.flow == Flow::Quit {
                    break;
                }
            }
            Err(e) => println!("error: {e}"),
        }
    }

    Ok(())
}
