//! Command-line interface and REPL
//!
//! Drives a [`VolumeMirror`] bound to a [`SimulatedSurface`]: reads and
//! writes go through the mirror, `press` plays an external actor changing
//! the surface behind the mirror's back.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::sync::Arc;

use crate::channel::{AdjustDirection, ChannelKey, RingerMode, VolumeFlags};
use crate::error::VolumeError;
use crate::mirror::VolumeMirror;
use crate::surface::SimulatedSurface;

const HELP: &str = "\
Commands:
  get <ch>              current volume (cache first)
  set <ch> <value>      write volume through the surface
  up <ch> | down <ch>   step volume
  mute <ch> on|off      write mute flag
  toggle <ch>           flip mute flag
  bounds <ch>           min/max volume
  ringer [mode]         read or write ringer mode (normal|vibrate|silent)
  press <ch> <value>    simulate a hardware volume change
  stats                 cache cell counts
  help | quit";

/// Parsed REPL command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Get(ChannelKey),
    Set(ChannelKey, i32),
    Adjust(ChannelKey, AdjustDirection),
    Mute(ChannelKey, bool),
    Toggle(ChannelKey),
    Bounds(ChannelKey),
    Ringer(Option<RingerMode>),
    Press(ChannelKey, i32),
    Stats,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines and `#` comments yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let words: Vec<&str> = line.split_whitespace().collect();
        let command = match words.as_slice() {
            ["get", ch] => Command::Get(channel(ch)?),
            ["set", ch, value] => Command::Set(channel(ch)?, number(value)?),
            ["up", ch] => Command::Adjust(channel(ch)?, AdjustDirection::Raise),
            ["down", ch] => Command::Adjust(channel(ch)?, AdjustDirection::Lower),
            ["mute", ch, state] => Command::Mute(channel(ch)?, on_off(state)?),
            ["toggle", ch] => Command::Toggle(channel(ch)?),
            ["bounds", ch] => Command::Bounds(channel(ch)?),
            ["ringer"] => Command::Ringer(None),
            ["ringer", mode] => Command::Ringer(Some(
                mode.parse().map_err(anyhow::Error::msg)?,
            )),
            ["press", ch, value] => Command::Press(channel(ch)?, number(value)?),
            ["stats"] => Command::Stats,
            ["help"] | ["?"] => Command::Help,
            ["quit"] | ["exit"] => Command::Quit,
            _ => bail!("unrecognized command: {} (try 'help')", line),
        };
        Ok(Some(command))
    }
}

fn channel(word: &str) -> Result<ChannelKey> {
    word.parse().map_err(anyhow::Error::msg)
}

fn number(word: &str) -> Result<i32> {
    word.parse()
        .with_context(|| format!("not a number: {}", word))
}

fn on_off(word: &str) -> Result<bool> {
    match word {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        other => bail!("expected on/off, got {}", other),
    }
}

/// Result of running one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Continue(String),
    Quit,
}

/// Executes commands against a mirror and its simulated surface
pub struct Console {
    mirror: Arc<VolumeMirror>,
    surface: Arc<SimulatedSurface>,
}

impl Console {
    pub fn new(mirror: Arc<VolumeMirror>, surface: Arc<SimulatedSurface>) -> Self {
        Self { mirror, surface }
    }

    pub fn execute(&self, command: Command) -> Result<Outcome> {
        let output = match command {
            Command::Get(ch) => {
                let volume = self.mirror.read_volume(ch)?;
                let mute = match self.mirror.is_muted(ch) {
                    Ok(true) => " (muted)".yellow().to_string(),
                    Ok(false) => String::new(),
                    Err(e) => format!(" {}", format!("(mute unknown: {})", e).red()),
                };
                format!(
                    "{} volume {}{}",
                    ch.to_string().cyan(),
                    volume.to_string().green(),
                    mute
                )
            }
            Command::Set(ch, value) => {
                self.mirror.set_volume(ch, value, VolumeFlags::NONE)?;
                format!("{} volume write {} requested", ch.to_string().cyan(), value)
            }
            Command::Adjust(ch, direction) => {
                self.mirror.adjust_volume(ch, direction, VolumeFlags::NONE)?;
                format!("{} volume {:?} requested", ch.to_string().cyan(), direction)
            }
            Command::Mute(ch, muted) => {
                self.mirror.set_mute(ch, muted)?;
                format!("{} mute {} requested", ch.to_string().cyan(), muted)
            }
            Command::Toggle(ch) => {
                let requested = self.mirror.toggle_mute(ch)?;
                format!("{} mute {} requested", ch.to_string().cyan(), requested)
            }
            Command::Bounds(ch) => format!(
                "{} range [{}, {}]",
                ch.to_string().cyan(),
                self.mirror.min_volume(ch)?,
                self.mirror.max_volume(ch)?
            ),
            Command::Ringer(None) => {
                format!("ringer mode {}", self.mirror.ringer_mode()?.to_string().green())
            }
            Command::Ringer(Some(mode)) => match self.mirror.set_ringer_mode(mode) {
                Ok(()) => format!("ringer mode {} requested", mode),
                Err(VolumeError::PermissionDenied) => {
                    "ringer mode change denied (no notification policy access)"
                        .red()
                        .to_string()
                }
                Err(e) => return Err(e.into()),
            },
            Command::Press(ch, value) => {
                self.surface.inject_volume(ch, value)?;
                format!("{} pressed to {}", ch.to_string().cyan(), value)
            }
            Command::Stats => {
                let stats = self.mirror.cache_stats()?;
                format!(
                    "cells: {} volume, {} mute, ringer {}",
                    stats.volume_cells,
                    stats.mute_cells,
                    if stats.ringer_cell { "cached" } else { "not cached" }
                )
            }
            Command::Help => HELP.to_string(),
            Command::Quit => return Ok(Outcome::Quit),
        };
        Ok(Outcome::Continue(output))
    }

    /// Parse and execute one line; errors are printed, not returned
    pub fn handle_line(&self, line: &str) -> Outcome {
        let result = Command::parse(line).and_then(|command| match command {
            Some(command) => self.execute(command),
            None => Ok(Outcome::Continue(String::new())),
        });

        match result {
            Ok(outcome) => outcome,
            Err(e) => Outcome::Continue(format!("{} {}", "error:".red().bold(), e)),
        }
    }

    /// Run every line of a script, stopping at `quit`
    pub fn run_script(&self, contents: &str) {
        for line in contents.lines() {
            match self.handle_line(line) {
                Outcome::Continue(output) if output.is_empty() => {}
                Outcome::Continue(output) => println!("{}", output),
                Outcome::Quit => break,
            }
        }
    }
}

/// Interactive loop (blocking - run it off the async runtime)
pub fn run_repl(console: &Console) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    println!("{}", "Type 'help' for commands".dimmed());

    loop {
        match rl.readline("volume> ") {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                match console.handle_line(&line) {
                    Outcome::Continue(output) if output.is_empty() => {}
                    Outcome::Continue(output) => println!("{}", output),
                    Outcome::Quit => break,
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
