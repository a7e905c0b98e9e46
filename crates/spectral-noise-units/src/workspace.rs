// SPDX-License-Identifier: LGPL-3.0-or-later

//! Caller-owned scratch memory for the colored streams.
//!
//! A [`Workspace`] holds everything a colored stream touches besides its own
//! state: the transform buffers, the spectral weight table and one overlap
//! lane per concurrently running stream. It is sized once for the largest
//! block size, so constructing and advancing streams never allocates.
//!
//! Layout (in elements, `M = MAX_FFT_SIZE`):
//!
//! | region   | type        | length           |
//! |----------|-------------|------------------|
//! | spectrum | `Complex32` | `2 * M`          |
//! | weights  | `f32`       | `M / 2`          |
//! | lanes    | `f32`       | `lane_count * M` |

use num_complex::Complex32;
use once_cell::sync::Lazy;
use spectral_noise_lib::SpectralEngine;
use tracing::{debug, trace};

use crate::config::FftSize;
use crate::consts::{ENGINE_SIZE, MAX_FFT_SIZE};
use crate::error::{NoiseError, Result};

static ENGINE: Lazy<SpectralEngine> = Lazy::new(|| SpectralEngine::new(ENGINE_SIZE));

/// Process-wide spectral engine sized for twice the largest block.
pub fn engine() -> &'static SpectralEngine {
    &ENGINE
}

const MAX: usize = MAX_FFT_SIZE as usize;

/// Bounds-checked `(offset, len)` view into the lane storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    offset: usize,
    len: usize,
}

impl Region {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.len
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WeightKey {
    fft_size: u32,
    alpha_bits: u32,
    scale_bits: u32,
}

/// Mutable borrows handed to a stream for one batch.
pub(crate) struct Scratch<'a> {
    pub engine: &'static SpectralEngine,
    pub src: &'a mut [Complex32],
    pub spare: &'a mut [Complex32],
    pub weights: &'a [f32],
    pub lane: &'a mut [f32],
}

/// Scratch arena shared by the colored streams of one render call.
#[derive(Clone)]
pub struct Workspace {
    engine: &'static SpectralEngine,
    spectrum: Vec<Complex32>,
    weights: Vec<f32>,
    weight_key: Option<WeightKey>,
    lanes: Vec<f32>,
    lane_count: usize,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("lane_count", &self.lane_count)
            .field("weight_key", &self.weight_key)
            .finish_non_exhaustive()
    }
}

impl Workspace {
    /// Allocate a workspace with `lane_count` overlap lanes.
    ///
    /// Stereo rendering of colored streams needs two lanes.
    pub fn new(lane_count: usize) -> Self {
        debug!(
            lane_count,
            bytes = Self::required_bytes(lane_count),
            "allocating noise workspace"
        );
        Self {
            engine: engine(),
            spectrum: vec![Complex32::default(); 2 * MAX],
            weights: vec![0.0; MAX / 2],
            weight_key: None,
            lanes: vec![0.0; lane_count * MAX],
            lane_count,
        }
    }

    /// Bytes of scratch memory a workspace with `lane_count` lanes occupies.
    pub fn required_bytes(lane_count: usize) -> usize {
        2 * MAX * std::mem::size_of::<Complex32>()
            + MAX / 2 * std::mem::size_of::<f32>()
            + lane_count * MAX * std::mem::size_of::<f32>()
    }

    pub fn lane_count(&self) -> usize {
        self.lane_count
    }

    pub fn engine(&self) -> &'static SpectralEngine {
        self.engine
    }

    /// Region of `len` elements at the start of lane `lane`.
    pub fn lane_region(&self, lane: usize, len: usize) -> Result<Region> {
        if lane >= self.lane_count {
            return Err(NoiseError::LaneOutOfRange {
                lane,
                count: self.lane_count,
            });
        }
        Ok(Region {
            offset: lane * MAX,
            len: len.min(MAX),
        })
    }

    pub fn lane(&self, region: Region) -> &[f32] {
        &self.lanes[region.range()]
    }

    pub(crate) fn lane_mut(&mut self, region: Region) -> &mut [f32] {
        &mut self.lanes[region.range()]
    }

    /// Current weight table for block size `fft_size`.
    pub fn weights(&self, fft_size: FftSize) -> &[f32] {
        &self.weights[..fft_size.half()]
    }

    /// Fill the weight table with `(i + 0.5)^(-alpha/2)` for `i < N/2`,
    /// normalized so that `sqrt(sum(w^2)) == scale`.
    ///
    /// Streams sharing a workspace with equal parameters reuse the table.
    pub(crate) fn prepare_weights(&mut self, fft_size: FftSize, alpha: f32, scale: f32) {
        let key = WeightKey {
            fft_size: fft_size.get(),
            alpha_bits: alpha.to_bits(),
            scale_bits: scale.to_bits(),
        };
        if self.weight_key == Some(key) {
            return;
        }
        trace!(fft_size = key.fft_size, alpha, scale, "recomputing weight table");

        let weights = &mut self.weights[..fft_size.half()];
        let mut power = 0.0f32;
        for (i, w) in weights.iter_mut().enumerate() {
            let r = (0.5 + i as f32).powf(-alpha / 2.0);
            *w = r;
            power += r * r;
        }

        let norm = scale / power.sqrt();
        for w in weights.iter_mut() {
            *w *= norm;
        }
        self.weight_key = Some(key);
    }

    pub(crate) fn scratch(&mut self, fft_size: usize, region: Region) -> Scratch<'_> {
        let (src, spare) = self.spectrum.split_at_mut(MAX);
        Scratch {
            engine: self.engine,
            src: &mut src[..fft_size],
            spare: &mut spare[..fft_size],
            weights: &self.weights[..fft_size / 2],
            lane: &mut self.lanes[region.range()],
        }
    }
}
