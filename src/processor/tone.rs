use super::Processor;
use crate::mixer::MixerState;
use std::f64::consts::PI;

/// A continuous sine tone, timed from the mixer's sample clock.
pub struct TestTone {
    frequency: f64,
    gain: f32,
}

impl TestTone {
    pub fn new(frequency: f64) -> Self {
        Self { frequency, gain: 1.0 }
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }
}

impl Processor for TestTone {
    fn process_block(&mut self, mixer: &MixerState, output: &mut [f32]) {
        let dt = mixer.sample_period();
        let scale = self.gain * mixer.global_volume();
        let mut time = mixer.block_start_time();
        for frame in output.chunks_exact_mut(2) {
            let sample = (2.0 * PI * self.frequency * time).sin() as f32 * scale;
            frame[0] += sample;
            frame[1] += sample;
            time += dt;
        }
    }
}
