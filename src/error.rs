use thiserror::Error;

/// Reasons a raw MIDI frame is rejected by the decoder.
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
pub enum MidiError {
    #[error("empty MIDI frame")]
    Empty,
    #[error("expected a status byte, found data byte {0:#04x}")]
    MissingStatus(u8),
    #[error("expected a data byte, found status byte {0:#04x}")]
    InvalidData(u8),
    #[error("message with status {status:#04x} needs {expected} bytes, got {actual}")]
    Truncated {
        status: u8,
        expected: usize,
        actual: usize,
    },
}

/// Failures while opening the audio output device.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device available")]
    NoOutputDevice,
    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),
    #[error("failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

/// Failures while opening a MIDI input port.
#[derive(Debug, Error)]
pub enum MidiInputError {
    #[error("failed to initialise MIDI input: {0}")]
    Init(#[from] midir::InitError),
    #[error("no MIDI input ports available")]
    NoPorts,
    #[error("MIDI input port {0} does not exist")]
    NoSuchPort(usize),
    #[error("failed to connect to MIDI input port: {0}")]
    Connect(String),
}

/// Failures while rendering audio offline.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to write WAV file: {0}")]
    Wav(#[from] hound::Error),
}
