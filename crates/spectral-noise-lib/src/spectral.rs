// SPDX-License-Identifier: LGPL-3.0-or-later

//! Power-of-two complex FFT with a fixed maximum size.
//!
//! A Stockham radix-2 transform: every pass reads from one buffer and writes
//! to the other, so no bit-reversal permutation is ever needed. The engine
//! owns a single twiddle table computed for its maximum size; smaller sizes
//! stride into the same table.
//!
//! Both directions are unnormalized, so `inverse(forward(x)) == N * x`.

use multiversion::multiversion;
use num_complex::Complex32;

/// Forward and inverse FFT over caller-provided buffers.
///
/// # Examples
/// ```
/// use num_complex::Complex32;
/// use spectral_noise_lib::spectral::SpectralEngine;
///
/// let engine = SpectralEngine::new(64);
/// let mut src = vec![Complex32::new(1.0, 0.0); 8];
/// let mut scratch = vec![Complex32::default(); 8];
/// let (out, _) = engine.forward(&mut src, &mut scratch, 8);
/// assert_eq!(out[0], Complex32::new(8.0, 0.0));
/// ```
#[derive(Debug, Clone)]
pub struct SpectralEngine {
    max_size: usize,
    max_bits: u32,
    /// `e^{2 pi i n / max_size}` for `n < max_size / 2`.
    twiddles: Vec<Complex32>,
}

impl SpectralEngine {
    /// Create an engine for sizes up to `max_size`, rounded up to a power of
    /// two of at least 4.
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(4).next_power_of_two();
        let quarter = max_size / 4;

        let mut twiddles = vec![Complex32::default(); max_size / 2];
        // Single precision throughout: tables must match existing renders bit for bit.
        for n in 0..quarter {
            let (im, re) = (std::f32::consts::TAU * n as f32 / max_size as f32).sin_cos();
            twiddles[n] = Complex32::new(re, im);
            // Second quarter turn is the first rotated by i.
            twiddles[n + quarter] = Complex32::new(-im, re);
        }

        Self {
            max_size,
            max_bits: max_size.trailing_zeros(),
            twiddles,
        }
    }

    /// Largest supported transform size.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Whether `n` is a power of two no larger than [`Self::max_size`].
    pub fn is_size_valid(&self, n: usize) -> bool {
        n.is_power_of_two() && n <= self.max_size
    }

    /// Twiddle `e^{2 pi i k / max_size}` for `k < max_size / 2`.
    #[inline]
    pub fn twiddle(&self, k: usize) -> Complex32 {
        self.twiddles[k]
    }

    /// Forward transform of `src[..n]` using `scratch[..n]` as the second
    /// buffer. Returns `(result, spare)`; either may alias `src`.
    pub fn forward<'a>(
        &self,
        src: &'a mut [Complex32],
        scratch: &'a mut [Complex32],
        n: usize,
    ) -> (&'a mut [Complex32], &'a mut [Complex32]) {
        self.transform(src, scratch, n, true)
    }

    /// Inverse transform, see [`Self::forward`].
    pub fn inverse<'a>(
        &self,
        src: &'a mut [Complex32],
        scratch: &'a mut [Complex32],
        n: usize,
    ) -> (&'a mut [Complex32], &'a mut [Complex32]) {
        self.transform(src, scratch, n, false)
    }

    fn transform<'a>(
        &self,
        src: &'a mut [Complex32],
        scratch: &'a mut [Complex32],
        n: usize,
        conjugate: bool,
    ) -> (&'a mut [Complex32], &'a mut [Complex32]) {
        if !self.is_size_valid(n) || src.len() < n || scratch.len() < n {
            return (src, scratch);
        }

        let mut s = src;
        let mut d = scratch;
        let mut b = 1;
        while b < n {
            let shift = self.max_bits - 1 - b.trailing_zeros();
            stockham_pass(&mut d[..n], &s[..n], &self.twiddles, b, shift, conjugate);
            std::mem::swap(&mut s, &mut d);
            b <<= 1;
        }
        (s, d)
    }
}

/// One radix-2 pass of span `b`.
#[multiversion(targets("x86_64+avx2+fma", "x86_64+avx", "x86_64+sse4.1", "aarch64+neon",))]
fn stockham_pass(
    dst: &mut [Complex32],
    src: &[Complex32],
    twiddles: &[Complex32],
    b: usize,
    shift: u32,
    conjugate: bool,
) {
    let half = src.len() / 2;
    for k in 0..half {
        let m = k & (b - 1);
        let d0 = ((k ^ m) << 1) | m;
        let mut w = twiddles[m << shift];
        if conjugate {
            w = w.conj();
        }
        let a = src[k];
        let t = w * src[k + half];
        dst[d0] = a + t;
        dst[d0 | b] = a - t;
    }
}
