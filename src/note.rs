use crate::util::hz_from_note;

/// A MIDI key number, 0 to 127.
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Note(pub u8);

impl From<u8> for Note {
    fn from(value: u8) -> Self {
        Self(value & 0x7f)
    }
}

impl std::fmt::Display for Note {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.name(), self.octave())
    }
}

impl std::fmt::Debug for Note {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self, self.0)
    }
}

impl Note {
    pub const fn middle_c() -> Self {
        Self(60)
    }

    /// The pitch class name, without the octave.
    pub fn name(&self) -> &'static str {
        const NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
        NAMES[(self.0 % 12) as usize]
    }

    /// The octave in scientific pitch notation, where middle C is C4.
    pub fn octave(&self) -> i8 {
        (self.0 / 12) as i8 - 1
    }

    pub fn frequency(&self) -> f64 {
        hz_from_note(self.0 as f64)
    }

    pub fn transpose(&self, offset: i8) -> Self {
        Self(self.0.saturating_add_signed(offset).min(127))
    }
}
