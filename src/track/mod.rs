use crate::{
    mixer::{Command, CommandSink, ProcessorId},
    note::Note,
    util::semitones_from_pitch_wheel,
};
pub use router::EventRouter;

mod router;

const ALL_SOUND_OFF: u8 = 120;
const ALL_NOTES_OFF: u8 = 123;

/// Routes MIDI from a set of channels to one or more processors.
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    /// Bit `n` is set if the track listens on MIDI channel `n`.
    channel_mask: u16,
    /// Pitch bend at either extreme of the wheel, in cents.
    pitch_bend_range: f32,
    /// The processors driven by this track. Several tracks may share a processor.
    processors: Vec<ProcessorId>,
}

impl Default for Track {
    fn default() -> Self {
        Self {
            channel_mask: 1,
            pitch_bend_range: 200.0,
            processors: vec![],
        }
    }
}

impl Track {
    pub fn new(channel_mask: u16) -> Self {
        Self {
            channel_mask,
            ..Default::default()
        }
    }

    pub fn with_processor(mut self, processor: ProcessorId) -> Self {
        self.add_processor(processor);
        self
    }

    pub fn add_processor(&mut self, processor: ProcessorId) {
        if !self.processors.contains(&processor) {
            self.processors.push(processor);
        }
    }

    pub fn processors(&self) -> &[ProcessorId] {
        &self.processors
    }

    pub fn channel_mask(&self) -> u16 {
        self.channel_mask
    }

    pub fn set_channel_mask(&mut self, channel_mask: u16) {
        self.channel_mask = channel_mask;
    }

    pub fn pitch_bend_range(&self) -> f32 {
        self.pitch_bend_range
    }

    pub fn set_pitch_bend_range(&mut self, cents: f32) {
        self.pitch_bend_range = cents.max(0.0);
    }

    /// Whether the track listens on `channel`. Channels outside 0 to 15 are never matched.
    pub fn listens_on(&self, channel: u8) -> bool {
        channel < 16 && self.channel_mask & (1 << channel) != 0
    }

    pub fn note_on(&self, channel: u8, note: Note, velocity: u8, sink: &mut impl CommandSink) {
        log::debug!("[Channel {:2}] Note On: {}, velocity {}", channel, note, velocity);
        self.send_all(sink, |processor| Command::KeyOn {
            processor,
            note,
            velocity,
        });
    }

    pub fn note_off(&self, channel: u8, note: Note, velocity: u8, sink: &mut impl CommandSink) {
        log::debug!("[Channel {:2}] Note Off: {}, velocity {}", channel, note, velocity);
        self.send_all(sink, |processor| Command::KeyOff { processor, note });
    }

    pub fn poly_aftertouch(&self, channel: u8, note: Note, pressure: u8) {
        log::debug!("[Channel {:2}] Polyphonic Aftertouch: {}, pressure {}", channel, note, pressure);
    }

    pub fn control_change(&self, channel: u8, control: u8, value: u8, sink: &mut impl CommandSink) {
        log::debug!("[Channel {:2}] Control Change: controller {}, data {}", channel, control, value);
        match control {
            ALL_SOUND_OFF => self.send_all(sink, |processor| Command::AllSoundOff { processor }),
            ALL_NOTES_OFF => self.send_all(sink, |processor| Command::AllNotesOff { processor }),
            _ => {}
        }
    }

    pub fn program_change(&self, channel: u8, program: u8) {
        log::debug!("[Channel {:2}] Program Change: program {}", channel, program);
    }

    pub fn channel_aftertouch(&self, channel: u8, pressure: u8) {
        log::debug!("[Channel {:2}] Channel Aftertouch: pressure {}", channel, pressure);
    }

    pub fn pitch_wheel(&self, channel: u8, value: u16, sink: &mut impl CommandSink) {
        log::debug!("[Channel {:2}] Pitch Wheel: {}", channel, value);
        let semitones = semitones_from_pitch_wheel(value, self.pitch_bend_range);
        self.send_all(sink, |processor| Command::PitchBend { processor, semitones });
    }

    fn send_all(&self, sink: &mut impl CommandSink, command: impl Fn(ProcessorId) -> Command) {
        for &processor in &self.processors {
            sink.send(command(processor));
        }
    }
}
