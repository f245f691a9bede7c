use crate::util::lerp;

/// Shape of the volume envelope shared by every voice of an oscillator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvelopeParams {
    /// Delay stage length in seconds.
    pub delay: f64,
    /// Attack stage length in seconds.
    pub attack: f64,
    /// Hold stage length in seconds.
    pub hold: f64,
    /// Decay stage length in seconds.
    pub decay: f64,
    /// Sustain level between 0 and 1.
    pub sustain: f64,
    /// Release rate in volume units per second.
    pub release: f64,
}

impl Default for EnvelopeParams {
    fn default() -> Self {
        Self {
            delay: 0.0,
            attack: 0.002,
            hold: 0.0,
            decay: 0.7,
            sustain: 0.0,
            release: 2.0,
        }
    }
}

impl EnvelopeParams {
    /// Returns a copy with negative lengths and rates raised to zero and the sustain level clamped.
    pub fn clamped(self) -> Self {
        Self {
            delay: self.delay.max(0.0),
            attack: self.attack.max(0.0),
            hold: self.hold.max(0.0),
            decay: self.decay.max(0.0),
            sustain: self.sustain.clamp(0.0, 1.0),
            release: self.release.max(0.0),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum EnvelopeStage {
    #[default]
    Idle,
    Delay,
    Attack,
    Hold,
    Decay,
    Sustain,
    Release,
}

/// A delay-attack-hold-decay-sustain-release volume envelope.
#[derive(Clone, Copy, Debug, Default)]
pub struct Envelope {
    /// The current envelope stage.
    stage: EnvelopeStage,
    /// Seconds spent in the current stage.
    stage_time: f64,
    /// The current volume between 0 and 1.
    volume: f64,
}

impl Envelope {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    pub fn stage_time(&self) -> f64 {
        self.stage_time
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn is_idle(&self) -> bool {
        self.stage == EnvelopeStage::Idle
    }

    /// Starts a new envelope cycle from the delay stage.
    pub fn trigger(&mut self) {
        self.stage = EnvelopeStage::Delay;
        self.stage_time = 0.0;
    }

    /// Moves to the release stage, fading out from whatever volume the envelope currently holds.
    /// Has no effect on an idle envelope.
    pub fn release(&mut self) {
        if !self.is_idle() {
            self.stage = EnvelopeStage::Release;
            self.stage_time = 0.0;
        }
    }

    /// Cuts the envelope off immediately.
    pub fn silence(&mut self) {
        self.finish();
    }

    /// Advances the envelope by `dt` seconds.
    ///
    /// Every stage is checked in order, so a single call can pass through any number of
    /// zero-length stages.
    pub fn tick(&mut self, dt: f64, params: &EnvelopeParams) {
        use EnvelopeStage::*;

        if self.stage == Idle {
            self.volume = 0.0;
            return;
        }

        self.stage_time += dt;

        if self.stage == Delay {
            self.volume = 0.0;
            if self.stage_time >= params.delay {
                self.stage_time -= params.delay;
                self.stage = Attack;
            }
        }

        if self.stage == Attack {
            if params.attack == 0.0 {
                self.stage = Hold;
            } else {
                self.volume = f64::min(self.stage_time / params.attack, 1.0);
                if self.stage_time >= params.attack {
                    self.stage_time -= params.attack;
                    self.stage = Hold;
                }
            }
        }

        if self.stage == Hold {
            self.volume = 1.0;
            if self.stage_time >= params.hold {
                self.stage_time -= params.hold;
                self.stage = Decay;
            }
        }

        if self.stage == Decay {
            if params.decay == 0.0 {
                self.stage = Sustain;
            } else {
                self.volume = lerp(1.0, params.sustain, self.stage_time / params.decay);
                if self.stage_time >= params.decay {
                    self.stage_time -= params.decay;
                    self.stage = Sustain;
                }
            }
        }

        if self.stage == Sustain {
            self.volume = params.sustain;
            if params.sustain == 0.0 {
                // Nothing left to sustain
                self.finish();
            }
        }

        if self.stage == Release {
            if params.release == 0.0 {
                self.finish();
            } else {
                self.volume -= params.release * dt;
                if self.volume <= 0.0 {
                    self.finish();
                }
            }
        }
    }

    fn finish(&mut self) {
        self.stage = EnvelopeStage::Idle;
        self.stage_time = 0.0;
        self.volume = 0.0;
    }
}
