// SPDX-License-Identifier: LGPL-3.0-or-later
//
// Reference tests: compare the strided Stockham engine against `rustfft`
// with identical random inputs.

use num_complex::Complex32;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rustfft::FftPlanner;
use spectral_noise_lib::SpectralEngine;

const MAX_SIZE: usize = 16384;

fn gen_signal(seed: u64, len: usize) -> Vec<Complex32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..len)
        .map(|_| {
            Complex32::new(
                rng.random::<f32>() * 2.0 - 1.0,
                rng.random::<f32>() * 2.0 - 1.0,
            )
        })
        .collect()
}

fn max_error(a: &[Complex32], b: &[Complex32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).norm())
        .fold(0.0, f32::max)
}

fn rms(x: &[Complex32]) -> f32 {
    (x.iter().map(|c| c.norm_sqr()).sum::<f32>() / x.len() as f32).sqrt()
}

#[test]
fn forward_matches_rustfft() {
    let engine = SpectralEngine::new(MAX_SIZE);
    let mut planner = FftPlanner::<f32>::new();

    for bits in 1..=13 {
        let n = 1 << bits;
        let input = gen_signal(1000 + bits as u64, n);

        let mut src = input.clone();
        let mut scratch = vec![Complex32::default(); n];
        let (ours, _) = engine.forward(&mut src, &mut scratch, n);

        let mut reference = input.clone();
        planner.plan_fft_forward(n).process(&mut reference);

        let err = max_error(ours, &reference) / rms(&reference);
        assert!(err < 1e-4, "n = {n}: relative error {err}");
    }
}

#[test]
fn inverse_matches_rustfft() {
    let engine = SpectralEngine::new(MAX_SIZE);
    let mut planner = FftPlanner::<f32>::new();

    for bits in 1..=13 {
        let n = 1 << bits;
        let input = gen_signal(2000 + bits as u64, n);

        let mut src = input.clone();
        let mut scratch = vec![Complex32::default(); n];
        let (ours, _) = engine.inverse(&mut src, &mut scratch, n);

        let mut reference = input.clone();
        planner.plan_fft_inverse(n).process(&mut reference);

        let err = max_error(ours, &reference) / rms(&reference);
        assert!(err < 1e-4, "n = {n}: relative error {err}");
    }
}

#[test]
fn sub_maximum_sizes_use_strided_twiddles() {
    // The same size must give the same answer regardless of the engine maximum.
    let small = SpectralEngine::new(512);
    let large = SpectralEngine::new(MAX_SIZE);
    let n = 512;
    let input = gen_signal(7, n);

    let mut a = input.clone();
    let mut sa = vec![Complex32::default(); n];
    let (ra, _) = small.forward(&mut a, &mut sa, n);

    let mut b = input.clone();
    let mut sb = vec![Complex32::default(); n];
    let (rb, _) = large.forward(&mut b, &mut sb, n);

    assert!(max_error(ra, rb) / rms(rb) < 1e-5);
}
