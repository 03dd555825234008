use std::collections::HashMap;

pub const DEFAULT_NOTE_KEYS: &str = "awsedftgyhujk";
pub const DEFAULT_BASE_NOTE: u8 = 60; // C4

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// One key went down on the piano.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NoteEvent {
    pub note: u8,
}

/* ------------------------ Computer keyboard -> piano ------------------------ */

/// Maps typed characters to consecutive semitones starting at `base_note`.
#[derive(Clone, Debug)]
pub struct Keymap {
    map: HashMap<char, u8>,
}

impl Keymap {
    pub fn new(keys: &str, base_note: u8) -> Self {
        let mut map = HashMap::new();
        for (offset, c) in keys.chars().enumerate() {
            let Some(note) = u8::try_from(offset)
                .ok()
                .and_then(|o| base_note.checked_add(o))
                .filter(|&n| n <= 127)
            else {
                break;
            };
            // First binding wins if a character repeats.
            map.entry(c.to_ascii_lowercase()).or_insert(note);
        }
        Self { map }
    }

    #[inline(always)]
    pub fn note_for(&self, c: char) -> Option<NoteEvent> {
        self.map
            .get(&c.to_ascii_lowercase())
            .map(|&note| NoteEvent { note })
    }

    /// Every mapped character in a line of input, in order.
    pub fn notes_in<'a>(&'a self, line: &'a str) -> impl Iterator<Item = NoteEvent> + 'a {
        line.chars().filter_map(|c| self.note_for(c))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Self::new(DEFAULT_NOTE_KEYS, DEFAULT_BASE_NOTE)
    }
}

/// Scientific pitch name, e.g. 60 -> "C4", 61 -> "C#4".
pub fn note_name(note: u8) -> String {
    let octave = i32::from(note / 12) - 1;
    format!("{}{}", NOTE_NAMES[usize::from(note % 12)], octave)
}
