use self::voice::WaveShape;
pub use self::{
    envelope::{Envelope, EnvelopeParams, EnvelopeStage},
    oscillators::Waveform,
    voice::Voice,
};
use crate::{
    mixer::MixerState,
    note::Note,
    processor::Processor,
    util::{hz_from_note, lerp},
};

mod envelope;
pub mod oscillators;
mod voice;

/// How each key press is spread over several detuned voices.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnisonOpts {
    /// Number of voices per key press.
    pub count: usize,
    /// Total detune spread in semitones.
    pub depth: f64,
    /// Total start phase spread as a fraction of a cycle.
    pub phase_spread: f64,
    /// Stereo spread, where 1 places the outermost voices hard left and right.
    pub wideness: f32,
}

impl Default for UnisonOpts {
    fn default() -> Self {
        Self {
            count: 9,
            depth: 0.3,
            phase_spread: 0.3,
            wideness: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OscillatorOpts {
    /// Size of the voice pool.
    pub num_voices: usize,
    pub waveform: Waveform,
    /// Duty cycle of the square wave, between 0 and 1.
    pub pulse_width: f64,
    pub unison: UnisonOpts,
    pub envelope: EnvelopeParams,
    /// Seed for the per-voice noise generators.
    pub noise_seed: u32,
}

impl Default for OscillatorOpts {
    fn default() -> Self {
        Self {
            num_voices: 16,
            waveform: Waveform::default(),
            pulse_width: 0.375,
            unison: UnisonOpts::default(),
            envelope: EnvelopeParams::default(),
            noise_seed: 0x2545_f491,
        }
    }
}

/// A polyphonic oscillator with a fixed pool of voices.
pub struct VoiceOscillator {
    voices: Box<[Voice]>,
    params: EnvelopeParams,
    shape: WaveShape,
    unison: UnisonOpts,
    /// Pitch bend in semitones.
    bend: f64,
}

impl VoiceOscillator {
    pub fn new(opts: OscillatorOpts) -> Self {
        let voices = (0..opts.num_voices)
            .map(|i| Voice::new(opts.noise_seed.wrapping_add((i as u32).wrapping_mul(0x9e37_79b9))))
            .collect();
        Self {
            voices,
            params: opts.envelope.clamped(),
            shape: WaveShape {
                waveform: opts.waveform,
                pulse_width: opts.pulse_width.clamp(0.0, 1.0),
            },
            unison: UnisonOpts {
                count: opts.unison.count.max(1),
                ..opts.unison
            },
            bend: 0.0,
        }
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// Number of voices which are not idle.
    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| !v.is_idle()).count()
    }

    pub fn envelope_params(&self) -> &EnvelopeParams {
        &self.params
    }
}

impl Processor for VoiceOscillator {
    fn process_block(&mut self, mixer: &MixerState, output: &mut [f32]) {
        for voice in self.voices.iter_mut() {
            if voice.is_idle() {
                continue;
            }
            voice.process(mixer, &self.params, &self.shape, self.bend, output);
        }
    }

    fn key_on(&mut self, note: Note, velocity: u8) {
        if velocity == 0 {
            return self.key_off(note);
        }

        let UnisonOpts {
            count,
            depth,
            phase_spread,
            wideness,
        } = self.unison;

        // Equal-power compensation, so stacking voices doesn't make the note louder
        let velocity = (velocity.min(127) as f32 / 127.0) / (count as f32).sqrt();

        for i in 0..count {
            let t = if count == 1 {
                0.5
            } else {
                i as f64 / (count - 1) as f64
            };

            // Excess unison voices are dropped when the pool is full
            let Some(voice) = self.voices.iter_mut().find(|v| v.is_idle()) else {
                break;
            };
            voice.trigger(
                note,
                note.0 as f64 + lerp(-depth / 2.0, depth / 2.0, t),
                velocity,
                lerp(-wideness as f64, wideness as f64, t) as f32,
                lerp(-phase_spread / 2.0, phase_spread / 2.0, t),
            );
        }
    }

    fn key_off(&mut self, note: Note) {
        for voice in self.voices.iter_mut() {
            if voice.key() == note && voice.envelope().stage() != EnvelopeStage::Release {
                voice.release();
            }
        }
    }

    fn pitch_bend(&mut self, semitones: f32) {
        let bend = semitones as f64;
        if bend == self.bend {
            return;
        }
        for voice in self.voices.iter_mut().filter(|v| !v.is_idle()) {
            voice.rebase(hz_from_note(voice.actual_note() + self.bend));
        }
        self.bend = bend;
    }

    fn all_notes_off(&mut self) {
        for voice in self.voices.iter_mut() {
            voice.release();
        }
    }

    fn all_sound_off(&mut self) {
        for voice in self.voices.iter_mut() {
            voice.silence();
        }
    }
}
