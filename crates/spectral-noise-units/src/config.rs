// SPDX-License-Identifier: LGPL-3.0-or-later

//! Persisted settings and per-call parameters.
//!
//! Every parameter struct deserializes with defaults for missing fields and
//! exposes `clamped()` to pull out-of-range values back into the accepted
//! ranges. Renderers clamp on entry, so callers may pass raw host values.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{NoiseError, Result};

/// Block size for colored streams: a power of two in
/// `[MIN_FFT_SIZE, MAX_FFT_SIZE]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct FftSize(u32);

impl FftSize {
    /// Accept `size` only if it already is a valid block size.
    pub fn new(size: u32) -> Result<Self> {
        if size.is_power_of_two() && (MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&size) {
            Ok(Self(size))
        } else {
            Err(NoiseError::InvalidFftSize(size))
        }
    }

    /// Round `size` up to a power of two, then clamp into the accepted range.
    pub fn clamped(size: u32) -> Self {
        let ceil = size.checked_next_power_of_two().unwrap_or(MAX_FFT_SIZE);
        Self(ceil.clamp(MIN_FFT_SIZE, MAX_FFT_SIZE))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Block size as an index type.
    pub fn size(self) -> usize {
        self.0 as usize
    }

    /// Half the block size, the number of output samples per batch.
    pub fn half(self) -> usize {
        self.0 as usize / 2
    }
}

impl Default for FftSize {
    fn default() -> Self {
        Self(DEFAULT_FFT_SIZE)
    }
}

impl From<u32> for FftSize {
    fn from(size: u32) -> Self {
        Self::clamped(size)
    }
}

impl From<FftSize> for u32 {
    fn from(size: FftSize) -> Self {
        size.0
    }
}

/// Settings persisted with each generator instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseSettings {
    /// Negative seeds are shared by all instances; non-negative seeds are
    /// mixed with the instance id.
    pub seed: i32,
    pub fft_size: FftSize,
}

impl NoiseSettings {
    /// Resolve the generator seed for an instance.
    pub fn resolve_seed(&self, instance_id: u32) -> u32 {
        if self.seed < 0 {
            !self.seed as u32
        } else {
            self.seed as u32 ^ instance_id
        }
    }
}

/// Stereo and interpolation switches shared by the stream renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceFlags {
    /// Independent left/right streams when the output has two channels.
    pub stereo: bool,
    /// Linear interpolation between stream steps.
    pub interpolate: bool,
}

/// Parameters of the gaussian noise renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParams {
    /// Spectral tilt: power spectral density falls as `f^-alpha`.
    pub alpha: f32,
    /// Stream step rate in semitones relative to A4.
    pub resolution: f64,
    pub back_volume: f32,
    #[serde(flatten)]
    pub flags: VoiceFlags,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            alpha: 0.0,
            resolution: RESOLUTION_MAX,
            back_volume: 1.0,
            flags: VoiceFlags::default(),
        }
    }
}

impl NoiseParams {
    pub fn clamped(self) -> Self {
        Self {
            alpha: clamp_f32(self.alpha, ALPHA_MIN, ALPHA_MAX, 0.0),
            resolution: clamp_f64(self.resolution, RESOLUTION_MIN, RESOLUTION_MAX, RESOLUTION_MAX),
            back_volume: clamp_f32(self.back_volume, BACK_VOLUME_MIN, BACK_VOLUME_MAX, 1.0),
            flags: self.flags,
        }
    }
}

/// Parameters of the noise multiply renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiplyParams {
    /// Blend between the dry signal (0) and full modulation (1).
    pub intensity: f32,
    pub alpha: f32,
    pub resolution: f64,
    /// Noise magnitude mapped to full gain, in dB.
    pub upper_db: f64,
    /// Noise magnitude mapped to zero gain, in dB.
    pub lower_db: f64,
    /// Use `1 - bound` instead of the signed bound.
    pub invert: bool,
    #[serde(flatten)]
    pub flags: VoiceFlags,
}

impl Default for MultiplyParams {
    fn default() -> Self {
        Self {
            intensity: 1.0,
            alpha: 0.0,
            resolution: RESOLUTION_MAX,
            upper_db: 0.0,
            lower_db: BOUND_DB_MIN,
            invert: false,
            flags: VoiceFlags::default(),
        }
    }
}

impl MultiplyParams {
    pub fn clamped(self) -> Self {
        Self {
            intensity: clamp_f32(self.intensity, INTENSITY_MIN, INTENSITY_MAX, 1.0),
            alpha: clamp_f32(self.alpha, ALPHA_MIN, ALPHA_MAX, 0.0),
            resolution: clamp_f64(self.resolution, RESOLUTION_MIN, RESOLUTION_MAX, RESOLUTION_MAX),
            upper_db: clamp_f64(self.upper_db, BOUND_DB_MIN, BOUND_DB_MAX, 0.0),
            lower_db: clamp_f64(self.lower_db, BOUND_DB_MIN, BOUND_DB_MAX, BOUND_DB_MIN),
            invert: self.invert,
            flags: self.flags,
        }
    }
}

/// Parameters of the velvet noise renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VelvetParams {
    /// Pulse rate in semitones relative to A4.
    pub density: f64,
    pub alpha: f32,
    pub resolution: f64,
    pub back_volume: f32,
    #[serde(flatten)]
    pub flags: VoiceFlags,
}

impl Default for VelvetParams {
    fn default() -> Self {
        Self {
            density: DENSITY_DEFAULT,
            alpha: 0.0,
            resolution: RESOLUTION_MAX,
            back_volume: 1.0,
            flags: VoiceFlags::default(),
        }
    }
}

impl VelvetParams {
    pub fn clamped(self) -> Self {
        Self {
            density: clamp_f64(self.density, DENSITY_MIN, DENSITY_MAX, DENSITY_DEFAULT),
            alpha: clamp_f32(self.alpha, ALPHA_MIN, ALPHA_MAX, 0.0),
            resolution: clamp_f64(self.resolution, RESOLUTION_MIN, RESOLUTION_MAX, RESOLUTION_MAX),
            back_volume: clamp_f32(self.back_volume, BACK_VOLUME_MIN, BACK_VOLUME_MAX, 1.0),
            flags: self.flags,
        }
    }
}

/// Parameters of the pulse renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseParams {
    /// Pulse start relative to the object start, in milliseconds.
    pub position_ms: f64,
    pub duration_ms: f64,
    pub back_volume: f32,
}

impl Default for PulseParams {
    fn default() -> Self {
        Self {
            position_ms: 0.0,
            duration_ms: 0.0,
            back_volume: 1.0,
        }
    }
}

impl PulseParams {
    pub fn clamped(self) -> Self {
        Self {
            position_ms: clamp_f64(self.position_ms, 0.0, PULSE_POSITION_MS_MAX, 0.0),
            duration_ms: clamp_f64(self.duration_ms, 0.0, PULSE_DURATION_MS_MAX, 0.0),
            back_volume: clamp_f32(self.back_volume, BACK_VOLUME_MIN, BACK_VOLUME_MAX, 1.0),
        }
    }
}

// NaN falls back to the default instead of propagating through `clamp`.
fn clamp_f32(v: f32, lo: f32, hi: f32, fallback: f32) -> f32 {
    if v.is_nan() { fallback } else { v.clamp(lo, hi) }
}

fn clamp_f64(v: f64, lo: f64, hi: f64, fallback: f64) -> f64 {
    if v.is_nan() { fallback } else { v.clamp(lo, hi) }
}
