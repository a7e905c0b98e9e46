// SPDX-License-Identifier: LGPL-3.0-or-later

//! Seekable noise streams.
//!
//! Provides gaussian noise with adjustable spectral tilt and velvet noise.
//! Both are deterministic functions of their seed and absolute position, so a
//! stream built at any position reproduces the samples an earlier stream
//! produced when it reached the same position.

pub mod colored;
pub mod velvet;

pub use colored::ColoredNoise;
pub use velvet::VelvetNoise;

use crate::workspace::Workspace;

/// A stream of samples that reads and advances through a shared workspace.
pub trait NoiseStream {
    /// Sample at the current position.
    fn value(&self, ws: &Workspace) -> f32;

    /// Advance by one sample.
    fn move_next(&mut self, ws: &mut Workspace);
}

/// Twiddle index stride for the rotation `e^{i pi k / fft_size}` in an
/// engine of size `engine_size`.
#[inline]
pub(crate) fn rotation_step(engine_size: usize, fft_size: usize) -> usize {
    engine_size / (2 * fft_size)
}
