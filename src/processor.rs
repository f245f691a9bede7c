use crate::{mixer::MixerState, note::Note};
pub use tone::TestTone;

mod tone;

/// A sound source hosted by the mixer.
///
/// Every method is called on the audio thread. Implementations must not block or allocate.
pub trait Processor {
    /// Renders `output.len() / 2` interleaved stereo frames, adding to whatever the buffer
    /// already holds rather than overwriting it.
    fn process_block(&mut self, mixer: &MixerState, output: &mut [f32]);

    /// Starts playing a note. `velocity` is the raw MIDI velocity between 1 and 127.
    fn key_on(&mut self, _note: Note, _velocity: u8) {}

    /// Releases every voice playing `note`.
    fn key_off(&mut self, _note: Note) {}

    /// Sets the pitch bend in semitones, applied on top of every note.
    fn pitch_bend(&mut self, _semitones: f32) {}

    /// Releases every sounding note.
    fn all_notes_off(&mut self) {}

    /// Silences every sounding note without a release stage.
    fn all_sound_off(&mut self) {}
}
