use crate::{error::MidiError, note::Note};
pub use ingest::{MidiConfig, MidiIngest, MidiQueue};

mod ingest;

/// A decoded MIDI message, as delivered by the input driver.
#[derive(Copy, Clone, Default, Eq, PartialEq, Debug)]
pub struct MidiMessage {
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
    pub data3: u8,
}

/// The typed form of a [`MidiMessage`].
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum MidiEvent {
    NoteOff { channel: u8, note: Note, velocity: u8 },
    NoteOn { channel: u8, note: Note, velocity: u8 },
    PolyAftertouch { channel: u8, note: Note, pressure: u8 },
    ControlChange { channel: u8, control: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    ChannelAftertouch { channel: u8, pressure: u8 },
    PitchBend { channel: u8, value: u16 },
    /// A system message, which belongs to no channel.
    System { status: u8 },
}

impl MidiMessage {
    /// Decodes a raw byte frame, rejecting frames that are too short for their status byte.
    /// Running status is not supported.
    pub fn decode(bytes: &[u8]) -> Result<Self, MidiError> {
        let (&status, data) = bytes.split_first().ok_or(MidiError::Empty)?;
        if status < 0x80 {
            return Err(MidiError::MissingStatus(status));
        }

        let expected = message_len(status);
        if bytes.len() < expected {
            return Err(MidiError::Truncated {
                status,
                expected,
                actual: bytes.len(),
            });
        }
        if let Some(&byte) = data[..expected - 1].iter().find(|&&b| b >= 0x80) {
            return Err(MidiError::InvalidData(byte));
        }

        let byte = |idx: usize| data.get(idx).copied().unwrap_or(0);
        Ok(Self {
            status,
            data1: byte(0),
            data2: byte(1),
            data3: byte(2),
        })
    }

    /// The channel of a channel-voice message, or `None` for system messages,
    /// which are global.
    pub fn channel(&self) -> Option<u8> {
        (self.status & 0xf0 != 0xf0).then_some(self.status & 0x0f)
    }

    /// The message type between 0 and 7, from bits 4 to 6 of the status byte.
    pub fn type_code(&self) -> u8 {
        (self.status >> 4) & 0x07
    }

    /// The 14-bit value carried by `data1` (least significant) and `data2` (most significant).
    pub fn data16(&self) -> u16 {
        (self.data1 & 0x7f) as u16 | ((self.data2 & 0x7f) as u16) << 7
    }

    pub fn event(&self) -> MidiEvent {
        let Some(channel) = self.channel() else {
            return MidiEvent::System { status: self.status };
        };
        match self.type_code() {
            0 => MidiEvent::NoteOff {
                channel,
                note: self.data1.into(),
                velocity: self.data2,
            },
            1 => MidiEvent::NoteOn {
                channel,
                note: self.data1.into(),
                velocity: self.data2,
            },
            2 => MidiEvent::PolyAftertouch {
                channel,
                note: self.data1.into(),
                pressure: self.data2,
            },
            3 => MidiEvent::ControlChange {
                channel,
                control: self.data1,
                value: self.data2,
            },
            4 => MidiEvent::ProgramChange {
                channel,
                program: self.data1,
            },
            5 => MidiEvent::ChannelAftertouch {
                channel,
                pressure: self.data1,
            },
            6 => MidiEvent::PitchBend {
                channel,
                value: self.data16(),
            },
            _ => MidiEvent::System { status: self.status },
        }
    }
}

/// Number of bytes, including the status byte, that a message needs.
fn message_len(status: u8) -> usize {
    match status {
        0xc0..=0xdf => 2,
        0xf1 | 0xf3 => 2,
        0xf2 => 3,
        0xf0..=0xff => 1,
        _ => 3,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_decode_note_on() {
        let message = MidiMessage::decode(&[0x91, 0x40, 0x7f]).unwrap();
        assert_eq!(message.type_code(), 1);
        assert_eq!(message.channel(), Some(1));
        assert_eq!(message.data1, 0x40);
        assert_eq!(message.data2, 0x7f);
        assert_eq!(
            message.event(),
            MidiEvent::NoteOn {
                channel: 1,
                note: Note(0x40),
                velocity: 0x7f
            }
        );
    }

    #[test]
    fn test_decode_pitch_bend() {
        let message = MidiMessage::decode(&[0xe0, 0x10, 0x20]).unwrap();
        assert_eq!(message.type_code(), 6);
        assert_eq!(message.data16(), 0x1010);
        assert_eq!(message.event(), MidiEvent::PitchBend { channel: 0, value: 0x1010 });

        let centre = MidiMessage::decode(&[0xe3, 0x00, 0x40]).unwrap();
        assert_eq!(centre.data16(), 8192);
    }

    #[test]
    fn test_decode_two_byte_messages() {
        let message = MidiMessage::decode(&[0xc5, 0x0a]).unwrap();
        assert_eq!(message.event(), MidiEvent::ProgramChange { channel: 5, program: 10 });

        let message = MidiMessage::decode(&[0xdf, 0x33]).unwrap();
        assert_eq!(message.event(), MidiEvent::ChannelAftertouch { channel: 15, pressure: 0x33 });
    }

    #[test]
    fn test_system_messages_are_global() {
        let message = MidiMessage::decode(&[0xf8]).unwrap();
        assert_eq!(message.channel(), None);
        assert_eq!(message.type_code(), 7);
        assert_eq!(message.event(), MidiEvent::System { status: 0xf8 });

        let sysex = MidiMessage::decode(&[0xf0, 0x7e, 0x7f, 0x09, 0x01, 0xf7]).unwrap();
        assert_eq!(sysex.channel(), None);
        assert_eq!(sysex.data3, 0x09);
    }

    #[test]
    fn test_rejects_malformed_frames() {
        assert_eq!(MidiMessage::decode(&[]), Err(MidiError::Empty));
        assert_eq!(MidiMessage::decode(&[0x40, 0x7f]), Err(MidiError::MissingStatus(0x40)));
        assert_eq!(
            MidiMessage::decode(&[0x90, 0x40]),
            Err(MidiError::Truncated {
                status: 0x90,
                expected: 3,
                actual: 2
            })
        );
        assert_eq!(
            MidiMessage::decode(&[0xc0]),
            Err(MidiError::Truncated {
                status: 0xc0,
                expected: 2,
                actual: 1
            })
        );
        assert_eq!(MidiMessage::decode(&[0x90, 0x40, 0x90]), Err(MidiError::InvalidData(0x90)));
    }
}
