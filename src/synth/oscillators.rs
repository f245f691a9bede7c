use std::f64::consts::{FRAC_PI_2, PI};
use std::sync::OnceLock;

/// The oscillator wave form.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Waveform {
    Sine,
    Square,
    Triangle,
    #[default]
    Sawtooth,
    Noise,
}

impl std::str::FromStr for Waveform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sine" => Ok(Waveform::Sine),
            "square" => Ok(Waveform::Square),
            "triangle" | "tri" => Ok(Waveform::Triangle),
            "sawtooth" | "saw" => Ok(Waveform::Sawtooth),
            "noise" => Ok(Waveform::Noise),
            other => Err(format!("unknown waveform `{other}`")),
        }
    }
}

/// `t` is the position within the cycle between 0 and 1.
pub fn sine(t: f64) -> f64 {
    (2.0 * PI * t).sin()
}

/// A pulse wave which is high for the first `pulse_width` of each cycle,
/// band-limited at both of its edges.
pub fn square(t: f64, dt: f64, pulse_width: f64) -> f64 {
    let naive = if t < pulse_width { 1.0 } else { -1.0 };
    let falling = (t - pulse_width).rem_euclid(1.0);
    naive + poly_blep(t, dt) - poly_blep(falling, dt)
}

pub fn triangle(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t - 1.0
    } else {
        1.0 - 4.0 * (t - 0.5)
    }
}

/// A rising ramp, band-limited at its reset.
pub fn sawtooth(t: f64, dt: f64) -> f64 {
    2.0 * t - 1.0 - poly_blep(t, dt)
}

/// Polynomial band-limited step correction for a unit discontinuity at `t == 0`,
/// where `dt` is the length of one sample as a fraction of the cycle.
pub fn poly_blep(t: f64, dt: f64) -> f64 {
    if dt <= 0.0 {
        0.0
    } else if t < dt {
        // Just after the edge
        let t = t / dt;
        2.0 * t - t * t - 1.0
    } else if t > 1.0 - dt {
        // Just before the edge
        let t = (t - 1.0) / dt;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}

/// A xorshift32 pseudo-random generator for white noise.
#[derive(Clone, Copy, Debug)]
pub struct Noise {
    state: u32,
}

impl Noise {
    pub fn new(seed: u32) -> Self {
        // Zero is a fixed point of xorshift
        Self { state: seed.max(1) }
    }

    /// Returns the next sample, roughly between -1 and 1.
    pub fn next_sample(&mut self) -> f64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        (x as i32) as f64 / i32::MAX as f64
    }
}

/// Number of entries in the panning table.
pub const PAN_STEPS: usize = 255;

/// Returns the `(left, right)` equal-power gains for a pan position between -1 (left) and 1 (right).
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let table = pan_table();
    let idx = (((pan.clamp(-1.0, 1.0) + 1.0) * 127.0) as usize).min(PAN_STEPS - 1);
    (table[idx], table[PAN_STEPS - 1 - idx])
}

/// Left channel gains, from fully left at index 0 to fully right at the last index.
/// The right channel reads the same table mirrored.
pub fn pan_table() -> &'static [f32; PAN_STEPS] {
    static PAN_TABLE: OnceLock<[f32; PAN_STEPS]> = OnceLock::new();

    PAN_TABLE.get_or_init(|| {
        core::array::from_fn(|i| {
            let x = i as f64 / (PAN_STEPS - 1) as f64;
            (x * FRAC_PI_2).cos() as f32
        })
    })
}
