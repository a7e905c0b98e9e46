// SPDX-License-Identifier: LGPL-3.0-or-later

//! Sizes, output heights and parameter ranges.

// Transform sizes

/// Smallest accepted block size for colored streams.
pub const MIN_FFT_SIZE: u32 = 1 << 9;

/// Largest accepted block size for colored streams.
pub const MAX_FFT_SIZE: u32 = 1 << 13;

/// Block size used when nothing else is configured.
pub const DEFAULT_FFT_SIZE: u32 = 2048;

/// Maximum size of the shared spectral engine. Twice the largest block size,
/// so that the half-sample rotation `e^{i pi k / N}` is a table entry.
pub const ENGINE_SIZE: usize = 2 * MAX_FFT_SIZE as usize;

/// Generator words reserved ahead of the velvet pulse sequence.
pub const VELVET_RNG_OFFSET: u64 = MAX_FFT_SIZE as u64;

// Output scaling (i16 units per unit sample)

/// Height of a unit gaussian sample.
pub const GAUSSIAN_HEIGHT: f32 = 4096.0;

/// Height of a unit velvet pulse.
pub const VELVET_HEIGHT: f32 = 16384.0;

/// Value written inside a pulse.
pub const PULSE_HEIGHT: i16 = 16384;

// Weight normalization

/// Target `sqrt(sum(w^2))` of the gaussian spectral weights.
pub const GAUSSIAN_WEIGHT_SCALE: f32 = 0.5;

// Frequencies

/// Reference pitch for semitone parameters (A4).
pub const A4_HZ: f64 = 440.0;

// Parameter ranges

/// Spectral tilt exponent range.
pub const ALPHA_MIN: f32 = -4.0;
pub const ALPHA_MAX: f32 = 4.0;

/// Resolution range in semitones relative to A4. The maximum means one
/// stream step per output sample.
pub const RESOLUTION_MIN: f64 = -48.0;
pub const RESOLUTION_MAX: f64 = 96.0;

/// Velvet pulse density range in semitones relative to A4. The maximum means
/// a pulse in every sample.
pub const DENSITY_MIN: f64 = -48.0;
pub const DENSITY_MAX: f64 = 96.0;
pub const DENSITY_DEFAULT: f64 = 33.0;

/// Background volume range (linear gain).
pub const BACK_VOLUME_MIN: f32 = 0.0;
pub const BACK_VOLUME_MAX: f32 = 2.0;

/// Modulation intensity range.
pub const INTENSITY_MIN: f32 = 0.0;
pub const INTENSITY_MAX: f32 = 1.0;

/// Multiply bounds range in dB. Values at or below the minimum mean silence.
pub const BOUND_DB_MIN: f64 = -72.0;
pub const BOUND_DB_MAX: f64 = 24.0;

/// Pulse position range in milliseconds.
pub const PULSE_POSITION_MS_MAX: f64 = 500.0;

/// Pulse duration range in milliseconds.
pub const PULSE_DURATION_MS_MAX: f64 = 200.0;
