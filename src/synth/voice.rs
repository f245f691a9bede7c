use super::{
    envelope::{Envelope, EnvelopeParams},
    oscillators::{pan_gains, sawtooth, sine, square, triangle, Noise, Waveform},
};
use crate::{mixer::MixerState, note::Note, util::hz_from_note};

/// One slot of polyphony.
#[derive(Clone, Copy, Debug)]
pub struct Voice {
    /// The key that triggered this voice.
    key: Note,
    /// The note actually played, including any unison detune.
    actual_note: f64,
    /// Velocity between 0 and 1, already scaled for unison.
    velocity: f32,
    /// Stereo position from -1 (left) to 1 (right).
    panning: f32,
    /// Seconds since the voice was triggered.
    phase: f64,
    /// Position within the cycle at which the voice started, between 0 and 1.
    phase_offset: f64,
    noise: Noise,
    envelope: Envelope,
}

/// Waveform settings shared by every voice of an oscillator.
#[derive(Clone, Copy, Debug)]
pub struct WaveShape {
    pub waveform: Waveform,
    pub pulse_width: f64,
}

impl Voice {
    pub fn new(noise_seed: u32) -> Self {
        Self {
            key: Note::default(),
            actual_note: 0.0,
            velocity: 0.0,
            panning: 0.0,
            phase: 0.0,
            phase_offset: 0.0,
            noise: Noise::new(noise_seed),
            envelope: Envelope::new(),
        }
    }

    pub fn key(&self) -> Note {
        self.key
    }

    pub fn actual_note(&self) -> f64 {
        self.actual_note
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn panning(&self) -> f32 {
        self.panning
    }

    pub fn phase_offset(&self) -> f64 {
        self.phase_offset
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn is_idle(&self) -> bool {
        self.envelope.is_idle()
    }

    pub fn trigger(&mut self, key: Note, actual_note: f64, velocity: f32, panning: f32, phase_offset: f64) {
        self.key = key;
        self.actual_note = actual_note;
        self.velocity = velocity;
        self.panning = panning.clamp(-1.0, 1.0);
        self.phase = 0.0;
        self.phase_offset = phase_offset.rem_euclid(1.0);
        self.envelope.trigger();
    }

    pub fn release(&mut self) {
        self.envelope.release();
    }

    pub fn silence(&mut self) {
        self.envelope.silence();
    }

    /// Position within the waveform cycle, between 0 and 1.
    pub fn cycle_position(&self, frequency: f64) -> f64 {
        (frequency * self.phase + self.phase_offset).rem_euclid(1.0)
    }

    /// Folds the elapsed phase into the phase offset, so that a subsequent change of
    /// `frequency` continues from the current point in the cycle.
    pub fn rebase(&mut self, frequency: f64) {
        self.phase_offset = self.cycle_position(frequency);
        self.phase = 0.0;
    }

    /// Adds this voice's output to the interleaved stereo `output`.
    /// Returns `false` once the voice has gone idle.
    pub fn process(
        &mut self,
        mixer: &MixerState,
        params: &EnvelopeParams,
        shape: &WaveShape,
        bend: f64,
        output: &mut [f32],
    ) -> bool {
        let dt = mixer.sample_period();
        let frequency = hz_from_note(self.actual_note + bend);
        // Length of one sample as a fraction of the cycle
        let cycle_dt = frequency * dt;
        let (left_gain, right_gain) = pan_gains(self.panning);
        let global_volume = mixer.global_volume() as f64;

        for frame in output.chunks_exact_mut(2) {
            if self.envelope.is_idle() {
                break;
            }
            self.envelope.tick(dt, params);

            let t = self.cycle_position(frequency);
            let sample = match shape.waveform {
                Waveform::Sine => sine(t),
                Waveform::Square => square(t, cycle_dt, shape.pulse_width),
                Waveform::Triangle => triangle(t),
                Waveform::Sawtooth => sawtooth(t, cycle_dt),
                Waveform::Noise => self.noise.next_sample(),
            };

            // Squared for a perceptually linear loudness curve
            let amp = self.velocity as f64 * self.envelope.volume();
            let sample = (sample * amp * amp * global_volume) as f32;
            frame[0] += sample * left_gain;
            frame[1] += sample * right_gain;

            self.phase += dt;
        }

        !self.envelope.is_idle()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sustained() -> EnvelopeParams {
        EnvelopeParams {
            delay: 0.0,
            attack: 0.0,
            hold: 0.0,
            decay: 0.0,
            sustain: 1.0,
            release: 1.0,
        }
    }

    const SINE: WaveShape = WaveShape {
        waveform: Waveform::Sine,
        pulse_width: 0.5,
    };

    #[test]
    fn test_idle_voice_adds_nothing() {
        let mixer = MixerState::new(44100, 1.0);
        let mut voice = Voice::new(1);
        let mut output = [0.5; 64];
        assert!(!voice.process(&mixer, &sustained(), &SINE, 0.0, &mut output));
        assert!(output.iter().all(|&s| s == 0.5));
    }

    #[test]
    fn test_centered_voice_is_balanced() {
        let mixer = MixerState::new(44100, 1.0);
        let mut voice = Voice::new(1);
        voice.trigger(Note(69), 69.0, 1.0, 0.0, 0.1);
        let mut output = [0.0; 256];
        assert!(voice.process(&mixer, &sustained(), &SINE, 0.0, &mut output));
        for frame in output.chunks_exact(2) {
            assert_eq!(frame[0], frame[1]);
        }
        assert!(output.iter().any(|&s| s.abs() > 0.1));
        // Centered gain is below unity on each side
        assert!(output.iter().all(|&s| s.abs() <= std::f32::consts::FRAC_1_SQRT_2 + 1e-3));
    }

    #[test]
    fn test_phase_advances_in_time() {
        let mixer = MixerState::new(1000, 1.0);
        let mut voice = Voice::new(1);
        voice.trigger(Note(69), 69.0, 1.0, 0.0, 0.25);
        let mut output = [0.0; 200];
        voice.process(&mixer, &sustained(), &SINE, 0.0, &mut output);
        // 100 samples at 1 kHz is 0.1 s, i.e. 44 whole cycles of A4
        assert!((voice.cycle_position(440.0) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_rebase_keeps_cycle_position() {
        let mixer = MixerState::new(44100, 1.0);
        let mut voice = Voice::new(1);
        voice.trigger(Note(60), 60.0, 1.0, 0.0, 0.0);
        let mut output = [0.0; 300];
        voice.process(&mixer, &sustained(), &SINE, 0.0, &mut output);

        let before = voice.cycle_position(hz_from_note(60.0));
        voice.rebase(hz_from_note(60.0));
        assert!((voice.cycle_position(hz_from_note(62.0)) - before).abs() < 1e-9);
    }
}
