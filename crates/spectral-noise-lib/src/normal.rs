// SPDX-License-Identifier: LGPL-3.0-or-later

//! Seekable standard normal sampler.
//!
//! Box-Muller over pairs of [`Philox4x32`] words. Each pair of words yields
//! two samples: the cosine branch is returned first and the sine branch is
//! cached for the next call. Skipping whole pairs therefore maps onto a
//! constant-time [`Philox4x32::discard`].

use std::f64::consts::TAU;

use crate::rng::{DEFAULT_SEED, Philox4x32};

const INV_2_POW_32: f64 = 1.0 / 4_294_967_296.0;

/// Normal(0, 1) sampler with O(1) seeking.
#[derive(Debug, Clone)]
pub struct NormalSampler {
    core: Philox4x32,
    cached: Option<f32>,
}

impl Default for NormalSampler {
    fn default() -> Self {
        Self::new(0)
    }
}

impl NormalSampler {
    /// Create a sampler. The generator key is `seed ^ DEFAULT_SEED`.
    pub fn new(seed: u32) -> Self {
        Self {
            core: Philox4x32::new(seed ^ DEFAULT_SEED),
            cached: None,
        }
    }

    /// Draw the next sample.
    pub fn sample(&mut self) -> f32 {
        if let Some(v) = self.cached.take() {
            return v;
        }

        let a = self.core.next_u32() as f64 * INV_2_POW_32 * TAU;
        let b = self.core.next_u32() as f64 * INV_2_POW_32;
        debug_assert!(b < 1.0);
        let r = (-2.0 * (1.0 - b).ln()).sqrt();

        self.cached = Some((r * a.sin()) as f32);
        (r * a.cos()) as f32
    }

    /// Skip `n` samples. After the call, `sample()` returns what the
    /// `(n + 1)`-th call would have returned.
    pub fn discard(&mut self, mut n: u64) {
        if n == 0 {
            return;
        }
        if self.cached.take().is_some() {
            n -= 1;
        }
        self.core.discard(n & !1);
        if n & 1 != 0 {
            self.sample();
        }
    }
}
