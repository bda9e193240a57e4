//! Keyboard chords for single-selection structural edits.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::EditOp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyCommand {
    ShiftBackward,
    ShiftForward,
    ShiftOut,
    ShiftIn,
    DeleteSubtree,
}

impl KeyCommand {
    pub fn op(self) -> EditOp {
        match self {
            KeyCommand::ShiftBackward => EditOp::ShiftBackward,
            KeyCommand::ShiftForward => EditOp::ShiftForward,
            KeyCommand::ShiftOut => EditOp::ShiftOut,
            KeyCommand::ShiftIn => EditOp::ShiftIn,
            KeyCommand::DeleteSubtree => EditOp::DeleteSubtree,
        }
    }
}

impl fmt::Display for KeyCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.op().name())
    }
}

impl FromStr for KeyCommand {
    type Err = ApplicationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let command = match s.parse::<EditOp>()? {
            EditOp::ShiftBackward => KeyCommand::ShiftBackward,
            EditOp::ShiftForward => KeyCommand::ShiftForward,
            EditOp::ShiftOut => KeyCommand::ShiftOut,
            EditOp::ShiftIn => KeyCommand::ShiftIn,
            EditOp::DeleteSubtree => KeyCommand::DeleteSubtree,
            other => {
                return Err(ApplicationError::Config {
                    message: format!("{other} cannot be bound to a key"),
                })
            }
        };
        Ok(command)
    }
}

/// Chord to command table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMap {
    bindings: BTreeMap<String, KeyCommand>,
}

impl Default for KeyMap {
    fn default() -> Self {
        let bindings = [
            ("alt+up", KeyCommand::ShiftBackward),
            ("alt+down", KeyCommand::ShiftForward),
            ("alt+left", KeyCommand::ShiftOut),
            ("alt+right", KeyCommand::ShiftIn),
            ("delete", KeyCommand::DeleteSubtree),
        ]
        .into_iter()
        .map(|(chord, command)| (chord.to_string(), command))
        .collect();
        Self { bindings }
    }
}

impl KeyMap {
    /// Defaults with per-chord overrides; an empty or `"none"` command unbinds.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> ApplicationResult<Self> {
        let mut keymap = Self::default();
        for (chord, command) in overrides {
            let chord = normalize_chord(chord);
            let command = command.trim();
            if command.is_empty() || command.eq_ignore_ascii_case("none") {
                keymap.bindings.remove(&chord);
            } else {
                keymap.bindings.insert(chord, command.parse()?);
            }
        }
        Ok(keymap)
    }

    pub fn lookup(&self, chord: &str) -> Option<KeyCommand> {
        self.bindings.get(&normalize_chord(chord)).copied()
    }

    pub fn bindings(&self) -> impl Iterator<Item = (&str, KeyCommand)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// `"Shift + Alt+Up"` and `"alt+shift+up"` both become `"alt+shift+up"`.
pub fn normalize_chord(chord: &str) -> String {
    const MODIFIER_ORDER: [&str; 4] = ["ctrl", "alt", "shift", "meta"];
    let parts: Vec<String> = chord
        .split('+')
        .map(|p| p.trim().to_ascii_lowercase())
        .filter(|p| !p.is_empty())
        .collect();
    let Some((key, modifiers)) = parts.split_last() else {
        return String::new();
    };
    let mut modifiers: Vec<&str> = modifiers
        .iter()
        .map(|m| match m.as_str() {
            "control" => "ctrl",
            "option" => "alt",
            other => other,
        })
        .collect();
    modifiers.sort_by_key(|m| {
        MODIFIER_ORDER
            .iter()
            .position(|o| o == m)
            .unwrap_or(MODIFIER_ORDER.len())
    });
    modifiers.dedup();
    modifiers
        .into_iter()
        .chain(std::iter::once(key.as_str()))
        .collect::<Vec<_>>()
        .join("+")
}
