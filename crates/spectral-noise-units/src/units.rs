// SPDX-License-Identifier: LGPL-3.0-or-later

//! Unit conversion functions.

use crate::consts::A4_HZ;

/// Convert semitones relative to A4 (440 Hz) into hertz.
///
/// # Examples
/// ```
/// use spectral_noise_units::units::semitones_to_hertz;
///
/// assert_eq!(semitones_to_hertz(12.0), 880.0);
/// ```
#[inline]
pub fn semitones_to_hertz(semitones: f64) -> f64 {
    A4_HZ * (semitones / 12.0).exp2()
}

/// Convert decibels into a linear amplitude gain.
#[inline]
pub fn db_to_gain(db: f64) -> f32 {
    (db * std::f64::consts::LN_10 / 20.0).exp() as f32
}

/// Convert milliseconds into a (fractional) sample count.
#[inline]
pub fn millis_to_samples(sample_rate: u32, ms: f64) -> f64 {
    sample_rate as f64 * ms / 1000.0
}
