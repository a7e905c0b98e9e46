// SPDX-License-Identifier: LGPL-3.0-or-later

//! # spectral-noise-units
//!
//! Seekable noise streams and the glue that renders them into host audio
//! buffers, built on top of [`spectral_noise_lib`]. It includes:
//!
//! - **Streams**: colored gaussian noise and (colored) velvet noise, both
//!   addressable at any absolute sample position
//! - **Playback**: per-instance state caching so that a host can continue,
//!   rewind or redraw a frame and get identical audio
//! - **Renderers**: noise, noise-multiply modulation, velvet and pulse
//! - **Configuration**: serde-backed parameter structs with range clamping
//!
//! For a fixed seed every stream output is a pure function of the sample
//! position: seeking to `p` and reading yields exactly the samples that
//! stepping from 0 to `p` would.

// Foundational modules
pub mod consts;
pub mod error;
pub mod units;

pub mod config;
pub mod noise;
pub mod playback;
pub mod render;
pub mod workspace;

pub use config::{
    FftSize, MultiplyParams, NoiseParams, NoiseSettings, PulseParams, VelvetParams, VoiceFlags,
};
pub use error::{NoiseError, Result};
pub use noise::{ColoredNoise, NoiseStream, VelvetNoise};
pub use playback::{GaussianState, StateSlot, Timeline, VelvetState};
pub use render::RenderContext;
pub use workspace::Workspace;
