use crate::{
    midi::{MidiConfig, MidiIngest, MidiMessage, MidiQueue},
    mixer::{Mixer, MixerConfig, MixerControl, MixerRenderer},
    track::{EventRouter, Track},
};
use basedrop::Collector;

#[derive(Clone, Debug, Default)]
pub struct SessionConfig {
    pub mixer: MixerConfig,
    pub midi: MidiConfig,
}

/// Everything the control thread owns: MIDI input, routing, and the mixer's command queue.
pub struct Session {
    mixer: MixerControl,
    ingest: MidiIngest,
    router: EventRouter,
    /// Reused between calls to [`Session::process`] to avoid allocating.
    scratch: Vec<MidiMessage>,
    /// Declared last so it outlives every handle in the fields above.
    collector: Collector,
}

impl Session {
    /// Builds the processors and tracks with `setup`, then opens the audio and MIDI devices.
    ///
    /// Missing devices are logged and leave the session silent rather than failing.
    pub fn open(config: &SessionConfig, setup: impl FnOnce(&mut Mixer) -> Vec<Track>) -> Self {
        let collector = Collector::new();
        let mut mixer = Mixer::new(config.mixer);
        let tracks = setup(&mut mixer);
        let control = mixer.start(&collector.handle());
        let ingest = MidiIngest::open(&config.midi);
        Self::from_parts(collector, control, ingest, EventRouter::new(tracks))
    }

    /// Builds a session without any devices. The caller drives the returned renderer and
    /// feeds MIDI through [`Session::midi_queue`].
    pub fn offline(config: &MixerConfig, setup: impl FnOnce(&mut Mixer) -> Vec<Track>) -> (Self, MixerRenderer) {
        let collector = Collector::new();
        let mut mixer = Mixer::new(*config);
        let tracks = setup(&mut mixer);
        let (control, renderer) = mixer.split(&collector.handle());
        let ingest = MidiIngest::disconnected(MidiQueue::new());
        let session = Self::from_parts(collector, control, ingest, EventRouter::new(tracks));
        (session, renderer)
    }

    pub fn from_parts(collector: Collector, mixer: MixerControl, ingest: MidiIngest, router: EventRouter) -> Self {
        Self {
            mixer,
            ingest,
            router,
            scratch: Vec::with_capacity(256),
            collector,
        }
    }

    /// Routes every MIDI message received since the last call. Call once per control loop
    /// iteration. Returns the number of messages handled.
    pub fn process(&mut self) -> usize {
        self.ingest.drain_into(&mut self.scratch);
        self.router.dispatch_all(&self.scratch, &mut self.mixer);
        self.collector.collect();
        self.scratch.len()
    }

    pub fn mixer(&self) -> &MixerControl {
        &self.mixer
    }

    pub fn mixer_mut(&mut self) -> &mut MixerControl {
        &mut self.mixer
    }

    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut EventRouter {
        &mut self.router
    }

    pub fn midi_queue(&self) -> &MidiQueue {
        self.ingest.queue()
    }

    pub fn is_midi_connected(&self) -> bool {
        self.ingest.is_connected()
    }
}
