// SPDX-License-Identifier: LGPL-3.0-or-later

//! Seekable gaussian noise with a `1/f^alpha` power spectrum.
//!
//! White noise (`alpha == 0`) is one normal draw per position. Colored noise
//! is synthesized in blocks of `N` samples: `N/2` complex gaussian
//! coefficients are weighted by `(i + 0.5)^(-alpha/2)`, mirrored into a
//! conjugate-symmetric spectrum, inverse transformed, rotated by half a bin
//! and glued onto the previous block with a square-root Hann crossfade. A new
//! block is synthesized every `N/2` samples, and block `k` always consumes
//! sampler draws `[k*N, (k+1)*N)`, so any position can be reconstructed from
//! two blocks.

use num_complex::Complex32;
use spectral_noise_lib::NormalSampler;

use crate::config::FftSize;
use crate::consts::GAUSSIAN_WEIGHT_SCALE;
use crate::error::Result;
use crate::workspace::{Region, Workspace};

use super::rotation_step;

/// Gaussian noise stream addressable at any sample position.
#[derive(Debug, Clone)]
pub struct ColoredNoise {
    alpha: f32,
    fft_size: FftSize,
    pos: u64,
    sampler: NormalSampler,
    /// Current value of the white stream.
    current: f32,
    /// Overlap lane of the colored stream.
    lane: Option<Region>,
}

impl ColoredNoise {
    /// Build the stream positioned at sample `pos`, using lane `lane` of the
    /// workspace when colored.
    pub fn new(
        ws: &mut Workspace,
        alpha: f32,
        fft_size: FftSize,
        seed: u32,
        pos: u64,
        lane: usize,
    ) -> Result<Self> {
        let mut sampler = NormalSampler::new(seed);

        if alpha == 0.0 {
            sampler.discard(pos);
            let current = sampler.sample();
            return Ok(Self {
                alpha,
                fft_size,
                pos,
                sampler,
                current,
                lane: None,
            });
        }

        let region = ws.lane_region(lane, fft_size.size())?;
        ws.prepare_weights(fft_size, alpha, GAUSSIAN_WEIGHT_SCALE);
        ws.lane_mut(region)[fft_size.half()..].fill(0.0);
        // Positions wrap modulo 2^64 like the cached state they come from.
        sampler.discard(pos.wrapping_mul(2) & !(fft_size.get() as u64 - 1));

        let mut stream = Self {
            alpha,
            fft_size,
            pos,
            sampler,
            current: 0.0,
            lane: Some(region),
        };
        stream.batch(ws);
        stream.batch(ws);
        Ok(stream)
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn fft_size(&self) -> FftSize {
        self.fft_size
    }

    /// Absolute sample position of [`Self::value`].
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Sample at the current position.
    #[inline]
    pub fn value(&self, ws: &Workspace) -> f32 {
        match self.lane {
            None => self.current,
            Some(region) => ws.lane(region)[self.index()],
        }
    }

    /// Advance by one sample.
    #[inline]
    pub fn move_next(&mut self, ws: &mut Workspace) {
        self.pos = self.pos.wrapping_add(1);
        match self.lane {
            None => self.current = self.sampler.sample(),
            Some(_) => {
                if self.index() == 0 {
                    self.batch(ws);
                }
            }
        }
    }

    #[inline]
    fn index(&self) -> usize {
        (self.pos & (self.fft_size.half() as u64 - 1)) as usize
    }

    fn batch(&mut self, ws: &mut Workspace) {
        let Some(region) = self.lane else {
            return;
        };
        let n = self.fft_size.size();
        let h = n / 2;

        let scratch = ws.scratch(n, region);
        let engine = scratch.engine;
        let weights = scratch.weights;
        let lane = scratch.lane;

        for i in 0..h {
            let re = weights[i] * self.sampler.sample();
            let im = weights[i] * self.sampler.sample();
            let c = Complex32::new(re, im);
            scratch.src[i] = c;
            scratch.src[n - 1 - i] = c.conj();
        }

        let (p, _) = engine.inverse(scratch.src, scratch.spare, n);

        let step = rotation_step(engine.max_size(), n);
        for i in 0..h {
            let j = i + h;
            // q = e^{i pi i / N}; sin and cos of the same angle form the
            // square-root Hann pair.
            let q = engine.twiddle(i * step);
            lane[i] = q.im * (q.re * p[i].re - q.im * p[i].im) + lane[j];
            lane[j] = q.re * (-q.im * p[j].re - q.re * p[j].im);
        }
    }
}

impl super::NoiseStream for ColoredNoise {
    fn value(&self, ws: &Workspace) -> f32 {
        ColoredNoise::value(self, ws)
    }

    fn move_next(&mut self, ws: &mut Workspace) {
        ColoredNoise::move_next(self, ws)
    }
}
