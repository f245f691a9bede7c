/// Converts a (possibly fractional) MIDI note value to a frequency in Hz.
pub fn hz_from_note(note: f64) -> f64 {
    440.0 * 2.0f64.powf((note - 69.0) / 12.0)
}

/// Linearly interpolates between `a` and `b`, where `t` of 0 yields `a` and 1 yields `b`.
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Converts a raw 14-bit pitch wheel value into a bend in semitones,
/// where `range_cents` is the bend at either extreme of the wheel.
pub fn semitones_from_pitch_wheel(value: u16, range_cents: f32) -> f32 {
    const MID_POINT: f32 = 8192.0; // No bend

    let cents = ((value.min(0x3fff) as f32 - MID_POINT) / MID_POINT) * range_cents;
    cents / 100.0
}
