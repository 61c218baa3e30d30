//! Key scripts for the console host.
//!
//! A script line is a whitespace-separated list of tokens:
//!
//! - a key name (`BackSpace`, `space`, `Shift_L`, `a`), optionally prefixed
//!   with `C-` (control) or `M-` (alt); each key is pressed then released
//! - a run of printable characters (`nihao`), typed one key at a time
//! - `tick` fires the pending banner timer
//! - `focus-in <path> [client=<name>]`, `focus-out <path>`; without a
//!   client name the path stands in for it
//! - `click <index>` clicks a candidate on the visible page
//! - `reset`

use std::io::Write;

use anyhow::{bail, Context};
use imsession_core::{keysym_from_name, ConversionContext, KeyEvent, Modifiers, Session, PRIMARY_BUTTON};

use crate::sink::{JsonSink, SinkEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Key {
        name: String,
        keyval: u32,
        modifiers: Modifiers,
    },
    Tick,
    FocusIn {
        path: String,
        client: String,
    },
    FocusOut {
        path: String,
    },
    Click(usize),
    Reset,
}

pub fn parse_line(line: &str) -> anyhow::Result<Vec<Command>> {
    let mut tokens = line.split_whitespace().peekable();
    let mut out = Vec::new();

    while let Some(token) = tokens.next() {
        match token {
            "tick" => out.push(Command::Tick),
            "reset" => out.push(Command::Reset),
            "focus-in" => {
                let path = tokens.next().context("focus-in needs an object path")?;
                let client = match tokens.peek().and_then(|t| t.strip_prefix("client=")) {
                    Some(name) => {
                        tokens.next();
                        name
                    }
                    None => path,
                };
                out.push(Command::FocusIn {
                    path: path.to_string(),
                    client: client.to_string(),
                });
            }
            "focus-out" => {
                let path = tokens.next().context("focus-out needs an object path")?;
                out.push(Command::FocusOut {
                    path: path.to_string(),
                });
            }
            "click" => {
                let index = tokens.next().context("click needs a candidate index")?;
                let index = index
                    .parse()
                    .with_context(|| format!("invalid candidate index {index:?}"))?;
                out.push(Command::Click(index));
            }
            _ => parse_keys(token, &mut out)?,
        }
    }

    Ok(out)
}

fn parse_keys(token: &str, out: &mut Vec<Command>) -> anyhow::Result<()> {
    let (modifiers, name) = if let Some(rest) = token.strip_prefix("C-") {
        (Modifiers::CONTROL, rest)
    } else if let Some(rest) = token.strip_prefix("M-") {
        (Modifiers::MOD1, rest)
    } else {
        (Modifiers::empty(), token)
    };

    if let Ok(keyval) = keysym_from_name(name) {
        out.push(Command::Key {
            name: token.to_string(),
            keyval,
            modifiers,
        });
        return Ok(());
    }

    if !modifiers.is_empty() || !token.chars().all(|c| c.is_ascii_graphic()) {
        bail!("unknown key {token:?}");
    }
    for ch in token.chars() {
        out.push(Command::Key {
            name: ch.to_string(),
            keyval: ch as u32,
            modifiers,
        });
    }
    Ok(())
}

/// Apply one command to a session writing JSON lines.
pub fn run<C, W>(session: &mut Session<C, JsonSink<W>>, command: &Command)
where
    C: ConversionContext,
    W: Write,
{
    match command {
        Command::Key {
            name,
            keyval,
            modifiers,
        } => {
            let handled = session
                .process_key(KeyEvent::new(*keyval, 0, *modifiers))
                .is_handled();
            session.sink_mut().emit(&SinkEvent::Key {
                name: name.clone(),
                handled,
            });
            session.process_key(KeyEvent::new(*keyval, 0, *modifiers | Modifiers::RELEASE));
        }
        Command::Tick => {
            if let Some(deadline) = session.next_deadline() {
                session.tick(deadline);
            }
        }
        Command::FocusIn { path, client } => session.focus_in_id(path, client),
        Command::FocusOut { path } => session.focus_out_id(path),
        Command::Click(index) => session.candidate_clicked(*index, PRIMARY_BUTTON, 0),
        Command::Reset => session.reset(),
    }
}
