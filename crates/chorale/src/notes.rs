//! Note-number to note-name lookup.

use std::collections::BTreeMap;

const SHARP_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// Read-only table mapping MIDI note numbers to display names.
///
/// The default table covers the two octaves starting at middle C (60..=83),
/// spelled with sharps. Anything outside the table renders as
/// `Unknown(<note>)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteNameTable {
    names: BTreeMap<u8, String>,
}

impl Default for NoteNameTable {
    fn default() -> Self {
        Self::octaves_from(60, 2)
    }
}

impl NoteNameTable {
    /// Build a sharp-spelled table covering `octaves` octaves from `lowest`.
    pub fn octaves_from(lowest: u8, octaves: u8) -> Self {
        let span = octaves as u16 * 12;
        let names = (0..span)
            .filter_map(|offset| u8::try_from(lowest as u16 + offset).ok())
            .filter(|note| *note <= 127)
            .map(|note| (note, SHARP_NAMES[(note % 12) as usize].to_string()))
            .collect();
        NoteNameTable { names }
    }

    pub fn from_names(names: impl IntoIterator<Item = (u8, String)>) -> Self {
        NoteNameTable {
            names: names.into_iter().collect(),
        }
    }

    pub fn get(&self, note: u8) -> Option<&str> {
        self.names.get(&note).map(String::as_str)
    }

    pub fn name(&self, note: u8) -> String {
        match self.get(note) {
            Some(name) => name.to_string(),
            None => format!("Unknown({})", note),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
