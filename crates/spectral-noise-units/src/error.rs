// SPDX-License-Identifier: LGPL-3.0-or-later

//! Errors reported at the render boundary.
//!
//! The numeric core never fails; these cover caller contract violations only.

use thiserror::Error;

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, NoiseError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoiseError {
    #[error("FFT size {0} is not a power of two in [{min}, {max}]", min = crate::consts::MIN_FFT_SIZE, max = crate::consts::MAX_FFT_SIZE)]
    InvalidFftSize(u32),

    #[error("channel count must be at least 1")]
    ZeroChannels,

    #[error("sample rate must be positive, got {0}")]
    InvalidSampleRate(u32),

    #[error("buffer of {len} samples is not a multiple of {channels} channels")]
    RaggedBuffer { len: usize, channels: usize },

    #[error("buffer length mismatch: expected {expected} samples, got {got}")]
    BufferLength { expected: usize, got: usize },

    #[error("lane {lane} out of range, workspace has {count} lanes")]
    LaneOutOfRange { lane: usize, count: usize },
}
