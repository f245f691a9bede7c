use crate::{note::Note, processor::Processor};
use basedrop::Handle;
use ringbuf_basedrop as ringbuf;
use slotmap::{new_key_type, SlotMap};

mod output;

new_key_type! {
    pub struct ProcessorId;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MixerConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Scale applied by every processor to its output.
    pub global_volume: f32,
    /// Number of commands which can be queued between two audio callbacks.
    pub command_capacity: usize,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            global_volume: 0.8,
            command_capacity: 1024,
        }
    }
}

/// The mixer's view of time and level, as seen by processors during a callback.
#[derive(Clone, Copy, Debug)]
pub struct MixerState {
    sample_rate: u32,
    /// Time of the first frame of the current block, in seconds.
    block_start_time: f64,
    global_volume: f32,
}

impl MixerState {
    pub fn new(sample_rate: u32, global_volume: f32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            block_start_time: 0.0,
            global_volume,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration of a sample in seconds.
    pub fn sample_period(&self) -> f64 {
        (self.sample_rate as f64).recip()
    }

    pub fn block_start_time(&self) -> f64 {
        self.block_start_time
    }

    pub fn global_volume(&self) -> f32 {
        self.global_volume
    }

    fn advance(&mut self, frames: usize) {
        self.block_start_time += frames as f64 / self.sample_rate as f64;
    }
}

/// A request from the control thread, applied by the audio thread at the start of the next block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    KeyOn {
        processor: ProcessorId,
        note: Note,
        velocity: u8,
    },
    KeyOff {
        processor: ProcessorId,
        note: Note,
    },
    PitchBend {
        processor: ProcessorId,
        semitones: f32,
    },
    AllNotesOff {
        processor: ProcessorId,
    },
    AllSoundOff {
        processor: ProcessorId,
    },
    SetGlobalVolume(f32),
}

/// Something commands can be sent to.
pub trait CommandSink {
    /// Queues a command. Returns `false` if it was dropped.
    fn send(&mut self, command: Command) -> bool;
}

impl CommandSink for Vec<Command> {
    fn send(&mut self, command: Command) -> bool {
        self.push(command);
        true
    }
}

/// Collects processors before audio starts.
pub struct Mixer {
    config: MixerConfig,
    processors: SlotMap<ProcessorId, Box<dyn Processor + Send>>,
}

impl Mixer {
    pub fn new(config: MixerConfig) -> Self {
        Self {
            config,
            processors: SlotMap::with_key(),
        }
    }

    pub fn config(&self) -> &MixerConfig {
        &self.config
    }

    /// Adds a processor. Processors are rendered in the order they are registered.
    pub fn register_processor(&mut self, processor: impl Processor + Send + 'static) -> ProcessorId {
        self.processors.insert(Box::new(processor))
    }

    /// Splits the mixer into a control half, which queues commands, and a renderer
    /// which produces audio and must be driven by the audio thread.
    pub fn split(self, handle: &Handle) -> (MixerControl, MixerRenderer) {
        let capacity = self.config.command_capacity.max(1);
        let (tx, rx) = ringbuf::RingBuffer::new(capacity).split(handle);
        let state = MixerState::new(self.config.sample_rate, self.config.global_volume);
        (
            MixerControl {
                commands: Some(tx),
                stream: None,
                sample_rate: state.sample_rate(),
            },
            MixerRenderer {
                state,
                processors: self.processors,
                commands: rx,
            },
        )
    }
}

/// The audio thread's half of the mixer.
pub struct MixerRenderer {
    state: MixerState,
    processors: SlotMap<ProcessorId, Box<dyn Processor + Send>>,
    commands: ringbuf::Consumer<Command>,
}

impl MixerRenderer {
    pub fn state(&self) -> &MixerState {
        &self.state
    }

    /// Fills `output` with interleaved stereo frames.
    pub fn render(&mut self, output: &mut [f32]) {
        while let Some(command) = self.commands.pop() {
            self.apply(command);
        }

        output.fill(0.0);
        for processor in self.processors.values_mut() {
            processor.process_block(&self.state, output);
        }

        self.state.advance(output.len() / 2);
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::KeyOn {
                processor,
                note,
                velocity,
            } => {
                if let Some(processor) = self.processors.get_mut(processor) {
                    processor.key_on(note, velocity);
                }
            }
            Command::KeyOff { processor, note } => {
                if let Some(processor) = self.processors.get_mut(processor) {
                    processor.key_off(note);
                }
            }
            Command::PitchBend { processor, semitones } => {
                if let Some(processor) = self.processors.get_mut(processor) {
                    processor.pitch_bend(semitones);
                }
            }
            Command::AllNotesOff { processor } => {
                if let Some(processor) = self.processors.get_mut(processor) {
                    processor.all_notes_off();
                }
            }
            Command::AllSoundOff { processor } => {
                if let Some(processor) = self.processors.get_mut(processor) {
                    processor.all_sound_off();
                }
            }
            Command::SetGlobalVolume(volume) => {
                self.state.global_volume = volume.max(0.0);
            }
        }
    }
}

/// The control thread's half of the mixer.
///
/// If the audio device could not be opened the mixer is inert and every command is discarded.
pub struct MixerControl {
    commands: Option<ringbuf::Producer<Command>>,
    stream: Option<cpal::Stream>,
    sample_rate: u32,
}

impl MixerControl {
    /// Whether the mixer is connected to an output device.
    pub fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    pub fn is_inert(&self) -> bool {
        self.commands.is_none()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn set_global_volume(&mut self, volume: f32) -> bool {
        self.send(Command::SetGlobalVolume(volume))
    }

    fn inert(mut self) -> Self {
        self.commands = None;
        self.stream = None;
        self
    }
}

impl CommandSink for MixerControl {
    fn send(&mut self, command: Command) -> bool {
        let Some(commands) = self.commands.as_mut() else {
            log::trace!("Mixer is inert, discarding {:?}", command);
            return false;
        };
        match commands.push(command) {
            Ok(()) => true,
            Err(command) => {
                log::warn!("Command queue is full, dropping {:?}", command);
                false
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        processor::TestTone,
        synth::{OscillatorOpts, VoiceOscillator},
    };
    use basedrop::Collector;

    #[test]
    fn test_render_clears_and_advances_clock() {
        let collector = Collector::new();
        let mixer = Mixer::new(MixerConfig::default());
        let (_control, mut renderer) = mixer.split(&collector.handle());

        let mut output = vec![0.7; 2 * 441];
        renderer.render(&mut output);
        assert!(output.iter().all(|&s| s == 0.0));
        assert!((renderer.state().block_start_time() - 0.01).abs() < 1e-12);

        renderer.render(&mut output);
        assert!((renderer.state().block_start_time() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_processors_are_summed() {
        let collector = Collector::new();
        let render = |tones: usize| {
            let mut mixer = Mixer::new(MixerConfig::default());
            for _ in 0..tones {
                mixer.register_processor(TestTone::new(440.0));
            }
            let (_control, mut renderer) = mixer.split(&collector.handle());
            let mut output = vec![0.0; 256];
            renderer.render(&mut output);
            output
        };

        let one = render(1);
        let two = render(2);
        assert!(one.iter().any(|s| s.abs() > 0.1));
        for (a, b) in one.iter().zip(two.iter()) {
            assert!((2.0 * a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_tone_is_continuous_across_blocks() {
        let collector = Collector::new();
        let mut mixer = Mixer::new(MixerConfig::default());
        mixer.register_processor(TestTone::new(440.0));
        let (_control, mut renderer) = mixer.split(&collector.handle());

        let mut whole = vec![0.0; 2 * 200];
        renderer.render(&mut whole);

        let mut mixer = Mixer::new(MixerConfig::default());
        mixer.register_processor(TestTone::new(440.0));
        let (_control, mut renderer) = mixer.split(&collector.handle());
        let mut first = vec![0.0; 2 * 100];
        let mut second = vec![0.0; 2 * 100];
        renderer.render(&mut first);
        renderer.render(&mut second);

        for (a, b) in whole.iter().zip(first.iter().chain(second.iter())) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_commands_reach_processors() {
        let collector = Collector::new();
        let mut mixer = Mixer::new(MixerConfig::default());
        let osc = mixer.register_processor(VoiceOscillator::new(OscillatorOpts::default()));
        let (mut control, mut renderer) = mixer.split(&collector.handle());

        let mut output = vec![0.0; 512];
        renderer.render(&mut output);
        assert!(output.iter().all(|&s| s == 0.0));

        assert!(control.send(Command::KeyOn {
            processor: osc,
            note: Note(57),
            velocity: 127,
        }));
        renderer.render(&mut output);
        assert!(output.iter().any(|s| s.abs() > 0.01));

        // Unknown processors are ignored
        assert!(control.send(Command::KeyOn {
            processor: ProcessorId::default(),
            note: Note(57),
            velocity: 127,
        }));
        renderer.render(&mut output);
    }

    #[test]
    fn test_global_volume_command() {
        let collector = Collector::new();
        let mut mixer = Mixer::new(MixerConfig::default());
        mixer.register_processor(TestTone::new(440.0));
        let (mut control, mut renderer) = mixer.split(&collector.handle());
        assert_eq!(renderer.state().global_volume(), 0.8);

        control.set_global_volume(0.0);
        let mut output = vec![0.0; 128];
        renderer.render(&mut output);
        assert_eq!(renderer.state().global_volume(), 0.0);
        assert!(output.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_full_queue_drops_commands() {
        let collector = Collector::new();
        let mixer = Mixer::new(MixerConfig {
            command_capacity: 2,
            ..Default::default()
        });
        let (mut control, _renderer) = mixer.split(&collector.handle());
        assert!(control.set_global_volume(0.1));
        assert!(control.set_global_volume(0.2));
        assert!(!control.set_global_volume(0.3));
    }

    #[test]
    fn test_inert_control_discards() {
        let collector = Collector::new();
        let mixer = Mixer::new(MixerConfig::default());
        let (control, _renderer) = mixer.split(&collector.handle());
        let mut control = control.inert();
        assert!(control.is_inert());
        assert!(!control.is_running());
        assert!(!control.set_global_volume(0.5));
    }
}
