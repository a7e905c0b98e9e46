// SPDX-License-Identifier: LGPL-3.0-or-later

//! # spectral-noise-lib
//!
//! Low-level primitives for seekable noise synthesis:
//!
//! - **rng**: Philox 4x32 counter-based generator with O(1) `discard`
//! - **normal**: Box-Muller normal sampler on top of the counter generator
//! - **spectral**: fixed-maximum power-of-two Stockham FFT
//! - **pcm**: float to `i16` conversion with saturation
//!
//! ## Design
//!
//! Nothing in this crate allocates on the per-sample path. Flat buffer loops
//! use runtime SIMD dispatch via the `multiversion` crate, compiled for
//! AVX2+FMA, AVX, SSE4.1 and NEON targets.

pub mod normal;
pub mod pcm;
pub mod rng;
pub mod spectral;

pub use normal::NormalSampler;
pub use rng::Philox4x32;
pub use spectral::SpectralEngine;
