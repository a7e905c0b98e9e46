// SPDX-License-Identifier: LGPL-3.0-or-later

//! Seekable velvet noise.
//!
//! The timeline is cut into periods of `period` samples. Period `n` carries
//! exactly one pulse of amplitude `+1` or `-1`, decoded from generator word
//! `VELVET_RNG_OFFSET + n`. Because the pulse of a period depends only on its
//! index, the uncolored stream needs nothing but the generator positioned at
//! the current period.
//!
//! The colored stream filters windows of `N` samples: the window starting at
//! sample `S` collects the pulses in `[S, S + N)`, shapes their spectrum with
//! the `(i + 0.5)^(-alpha/2)` weights and crossfades with a Hann window. Output
//! samples `[B, B + N/2)` are the head of the window at `B` plus the tail of
//! the window at `B - N/2`. Window starts are mapped onto the period lattice
//! in closed form, so seeking never replays the generator.

use num_complex::Complex32;
use spectral_noise_lib::rng::DEFAULT_SEED;
use spectral_noise_lib::Philox4x32;

use crate::config::FftSize;
use crate::consts::VELVET_RNG_OFFSET;
use crate::error::Result;
use crate::workspace::{Region, Workspace};

use super::rotation_step;

/// Decode a generator word into `(offset, amplitude)` for a period of
/// `period` samples.
#[inline]
pub fn parse_pulse(word: u32, period: u32) -> (u32, f32) {
    let offset = ((period as u64 * (word & 0x7FFF_FFFF) as u64) >> 31) as u32;
    let amplitude = if word & 0x8000_0000 != 0 { -1.0 } else { 1.0 };
    (offset, amplitude)
}

/// Velvet noise stream addressable by sample position and period index.
#[derive(Debug, Clone)]
pub struct VelvetNoise {
    period: u32,
    alpha: f32,
    fft_size: FftSize,
    key: u32,
    pos: u64,
    count_period: u64,
    pos_period: u32,
    /// Positioned after the word of the current period (uncolored only).
    rng: Philox4x32,
    pulse_offset: u32,
    pulse_amplitude: f32,
    lane: Option<Region>,
}

/// Position of a sample on the period lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LatticePoint {
    count: u64,
    phase: u32,
}

impl VelvetNoise {
    /// Build the stream at sample `pos`, inside period `count_period` at the
    /// fractional offset `phase_period`.
    ///
    /// A `period` of zero is treated as 1.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ws: &mut Workspace,
        period: u32,
        alpha: f32,
        fft_size: FftSize,
        seed: u32,
        pos: u64,
        count_period: u64,
        phase_period: f64,
        lane: usize,
    ) -> Result<Self> {
        let period = period.max(1);
        // NaN saturates to 0 in the cast.
        let pos_period = (phase_period * period as f64)
            .round()
            .clamp(0.0, (period - 1) as f64) as u32;
        let key = seed ^ DEFAULT_SEED;

        let mut stream = Self {
            period,
            alpha,
            fft_size,
            key,
            pos,
            count_period,
            pos_period,
            rng: Philox4x32::new(key),
            pulse_offset: 0,
            pulse_amplitude: 0.0,
            lane: None,
        };

        if alpha == 0.0 {
            stream
                .rng
                .discard(VELVET_RNG_OFFSET.wrapping_add(count_period));
            stream.set_next();
            return Ok(stream);
        }

        let region = ws.lane_region(lane, fft_size.size())?;
        let n = fft_size.size();
        ws.prepare_weights(fft_size, alpha, 1.0 / (2.0 * n as f32).sqrt());
        ws.lane_mut(region)[n / 2..].fill(0.0);
        stream.lane = Some(region);

        let h = n as u64 / 2;
        let residue = pos & (h - 1);
        let previous = stream.lattice_back(residue + h);
        let current = stream.lattice_back(residue);
        stream.batch(ws, previous);
        stream.batch(ws, current);
        Ok(stream)
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Index of the period containing the current sample.
    pub fn count_period(&self) -> u64 {
        self.count_period
    }

    /// Offset of the current sample inside its period, in samples.
    pub fn pos_period(&self) -> u32 {
        self.pos_period
    }

    /// Offset of the current sample inside its period, as a fraction.
    pub fn phase_period(&self) -> f64 {
        self.pos_period as f64 / self.period as f64
    }

    #[inline]
    pub fn value(&self, ws: &Workspace) -> f32 {
        match self.lane {
            None => {
                if self.pos_period == self.pulse_offset {
                    self.pulse_amplitude
                } else {
                    0.0
                }
            }
            Some(region) => ws.lane(region)[self.index()],
        }
    }

    #[inline]
    pub fn move_next(&mut self, ws: &mut Workspace) {
        self.pos = self.pos.wrapping_add(1);
        self.pos_period += 1;
        if self.pos_period == self.period {
            self.pos_period = 0;
            self.count_period = self.count_period.wrapping_add(1);
        }

        match self.lane {
            None => {
                if self.pos_period == 0 {
                    self.set_next();
                }
            }
            Some(_) => {
                if self.index() == 0 {
                    let here = LatticePoint {
                        count: self.count_period,
                        phase: self.pos_period,
                    };
                    self.batch(ws, here);
                }
            }
        }
    }

    #[inline]
    fn index(&self) -> usize {
        (self.pos & (self.fft_size.half() as u64 - 1)) as usize
    }

    fn set_next(&mut self) {
        (self.pulse_offset, self.pulse_amplitude) = parse_pulse(self.rng.next_u32(), self.period);
    }

    /// Lattice point `distance` samples before the current one.
    fn lattice_back(&self, distance: u64) -> LatticePoint {
        let phase = self.pos_period as u64;
        let period = self.period as u64;
        if distance <= phase {
            return LatticePoint {
                count: self.count_period,
                phase: (phase - distance) as u32,
            };
        }
        let l = distance - phase + period - 1;
        LatticePoint {
            count: self.count_period.wrapping_sub(l / period),
            phase: ((period - 1) - l % period) as u32,
        }
    }

    /// Synthesize the window starting at lattice point `start` into the lane.
    fn batch(&mut self, ws: &mut Workspace, start: LatticePoint) {
        let Some(region) = self.lane else {
            return;
        };
        let n = self.fft_size.size();
        let h = n / 2;
        let period = self.period;

        let mut rng = Philox4x32::new(self.key);
        rng.discard(VELVET_RNG_OFFSET.wrapping_add(start.count));

        let scratch = ws.scratch(n, region);
        let engine = scratch.engine;
        let weights = scratch.weights;
        let lane = scratch.lane;
        let step = rotation_step(engine.max_size(), n);

        // Pulses of the window, tilted by half a bin.
        scratch.src.fill(Complex32::default());
        let (mut offset, mut amplitude) = parse_pulse(rng.next_u32(), period);
        let mut phase = start.phase;
        for (i, c) in scratch.src.iter_mut().enumerate() {
            if phase == offset {
                *c = engine.twiddle(i * step) * amplitude;
            }
            phase += 1;
            if phase == period {
                phase = 0;
                (offset, amplitude) = parse_pulse(rng.next_u32(), period);
            }
        }

        let (spectrum, spare) = engine.inverse(scratch.src, scratch.spare, n);

        // Shape and mirror. The conjugate undoes the direction of the first
        // transform.
        for i in 0..h {
            let v = spectrum[i] * weights[i];
            spectrum[i] = v.conj();
            spectrum[n - 1 - i] = v;
        }

        let (p, _) = engine.inverse(spectrum, spare, n);

        for i in 0..h {
            let j = i + h;
            let q = engine.twiddle(i * step);
            let hann = q.im * q.im;
            lane[i] = hann * (q.re * p[i].re - q.im * p[i].im) + lane[j];
            lane[j] = (1.0 - hann) * (-q.im * p[j].re - q.re * p[j].im);
        }
    }
}

impl super::NoiseStream for VelvetNoise {
    fn value(&self, ws: &Workspace) -> f32 {
        VelvetNoise::value(self, ws)
    }

    fn move_next(&mut self, ws: &mut Workspace) {
        VelvetNoise::move_next(self, ws)
    }
}
