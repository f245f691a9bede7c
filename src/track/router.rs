use super::Track;
use crate::{
    midi::{MidiEvent, MidiMessage},
    mixer::CommandSink,
};

/// Dispatches decoded MIDI to the tracks listening on each message's channel.
#[derive(Clone, Debug, Default)]
pub struct EventRouter {
    tracks: Vec<Track>,
}

impl EventRouter {
    pub fn new(tracks: impl IntoIterator<Item = Track>) -> Self {
        Self {
            tracks: tracks.into_iter().collect(),
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn tracks_mut(&mut self) -> &mut [Track] {
        &mut self.tracks
    }

    pub fn add_track(&mut self, track: Track) -> usize {
        self.tracks.push(track);
        self.tracks.len() - 1
    }

    pub fn dispatch_all(&self, messages: &[MidiMessage], sink: &mut impl CommandSink) {
        for message in messages {
            self.dispatch(message, sink);
        }
    }

    pub fn dispatch(&self, message: &MidiMessage, sink: &mut impl CommandSink) {
        let Some(channel) = message.channel() else {
            log::trace!("Ignoring system message {:#04x}", message.status);
            return;
        };
        let event = message.event();

        for track in self.tracks.iter().filter(|t| t.listens_on(channel)) {
            match event {
                MidiEvent::NoteOff { note, velocity, .. } => track.note_off(channel, note, velocity, sink),
                MidiEvent::NoteOn { note, velocity: 0, .. } => track.note_off(channel, note, 0, sink),
                MidiEvent::NoteOn { note, velocity, .. } => track.note_on(channel, note, velocity, sink),
                MidiEvent::PolyAftertouch { note, pressure, .. } => track.poly_aftertouch(channel, note, pressure),
                MidiEvent::ControlChange { control, value, .. } => {
                    track.control_change(channel, control, value, sink)
                }
                MidiEvent::ProgramChange { program, .. } => track.program_change(channel, program),
                MidiEvent::ChannelAftertouch { pressure, .. } => track.channel_aftertouch(channel, pressure),
                MidiEvent::PitchBend { value, .. } => track.pitch_wheel(channel, value, sink),
                MidiEvent::System { .. } => {}
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        mixer::{Command, ProcessorId},
        note::Note,
    };
    use slotmap::SlotMap;

    fn ids(n: usize) -> Vec<ProcessorId> {
        let mut map = SlotMap::<ProcessorId, ()>::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    fn message(bytes: &[u8]) -> MidiMessage {
        MidiMessage::decode(bytes).unwrap()
    }

    #[test]
    fn test_channel_filter() {
        let ids = ids(1);
        let router = EventRouter::new([Track::new(0b0000_0000_0000_0010).with_processor(ids[0])]);
        let mut sink = vec![];

        router.dispatch(&message(&[0x90, 60, 100]), &mut sink);
        assert!(sink.is_empty());

        router.dispatch(&message(&[0x91, 60, 100]), &mut sink);
        assert_eq!(
            sink,
            vec![Command::KeyOn {
                processor: ids[0],
                note: Note(60),
                velocity: 100
            }]
        );
    }

    #[test]
    fn test_zero_velocity_note_on_is_note_off() {
        let ids = ids(1);
        let router = EventRouter::new([Track::new(1).with_processor(ids[0])]);
        let mut sink = vec![];
        router.dispatch(&message(&[0x90, 64, 0]), &mut sink);
        router.dispatch(&message(&[0x80, 65, 40]), &mut sink);
        assert_eq!(
            sink,
            vec![
                Command::KeyOff {
                    processor: ids[0],
                    note: Note(64)
                },
                Command::KeyOff {
                    processor: ids[0],
                    note: Note(65)
                },
            ]
        );
    }

    #[test]
    fn test_tracks_can_share_processors() {
        let ids = ids(2);
        let router = EventRouter::new([
            Track::new(0b11).with_processor(ids[0]),
            Track::new(0b10).with_processor(ids[0]).with_processor(ids[1]),
        ]);
        let mut sink = vec![];

        router.dispatch(&message(&[0x90, 60, 1]), &mut sink);
        assert_eq!(sink.len(), 1);

        sink.clear();
        router.dispatch(&message(&[0x91, 60, 1]), &mut sink);
        let targets: Vec<_> = sink
            .iter()
            .map(|c| match c {
                Command::KeyOn { processor, .. } => *processor,
                other => panic!("unexpected command {:?}", other),
            })
            .collect();
        assert_eq!(targets, vec![ids[0], ids[0], ids[1]]);
    }

    #[test]
    fn test_pitch_wheel_uses_track_range() {
        let ids = ids(1);
        let mut track = Track::new(1).with_processor(ids[0]);
        track.set_pitch_bend_range(1200.0);
        let router = EventRouter::new([track]);
        let mut sink = vec![];

        router.dispatch(&message(&[0xe0, 0x00, 0x00]), &mut sink);
        router.dispatch(&message(&[0xe0, 0x00, 0x40]), &mut sink);
        assert_eq!(
            sink,
            vec![
                Command::PitchBend {
                    processor: ids[0],
                    semitones: -12.0
                },
                Command::PitchBend {
                    processor: ids[0],
                    semitones: 0.0
                },
            ]
        );
    }

    #[test]
    fn test_channel_mode_messages() {
        let ids = ids(1);
        let router = EventRouter::new([Track::new(1).with_processor(ids[0])]);
        let mut sink = vec![];
        router.dispatch(&message(&[0xb0, 123, 0]), &mut sink);
        router.dispatch(&message(&[0xb0, 120, 0]), &mut sink);
        router.dispatch(&message(&[0xb0, 7, 100]), &mut sink);
        assert_eq!(
            sink,
            vec![
                Command::AllNotesOff { processor: ids[0] },
                Command::AllSoundOff { processor: ids[0] },
            ]
        );
    }

    #[test]
    fn test_unforwarded_messages() {
        let ids = ids(1);
        let router = EventRouter::new([Track::new(0xffff).with_processor(ids[0])]);
        let mut sink = vec![];
        router.dispatch_all(
            &[
                message(&[0xa0, 60, 10]),
                message(&[0xc0, 3]),
                message(&[0xd0, 10]),
                message(&[0xf8]),
                message(&[0xff]),
            ],
            &mut sink,
        );
        assert!(sink.is_empty());
    }
}
