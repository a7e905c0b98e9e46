// SPDX-License-Identifier: LGPL-3.0-or-later

//! Noise multiply: modulate an existing signal by gaussian noise.

use spectral_noise_lib::pcm::to_i16;

use crate::config::{MultiplyParams, NoiseSettings};
use crate::consts::BOUND_DB_MIN;
use crate::error::Result;
use crate::playback::{GaussianState, StateSlot};
use crate::units::{db_to_gain, semitones_to_hertz};
use crate::workspace::Workspace;

use super::noise::gaussian_voices;
use super::{RenderContext, Stepper, check_lanes, corrected_delta, run_voices, spread};

/// Mapping from a noise sample to a signal gain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Modulation {
    intensity: f32,
    lower: f32,
    range: f32,
    invert: bool,
}

impl Modulation {
    pub fn new(params: &MultiplyParams) -> Self {
        let gain = |db: f64| {
            if db <= BOUND_DB_MIN {
                0.0
            } else {
                db_to_gain(db)
            }
        };
        let upper = gain(params.upper_db);
        let lower = gain(params.lower_db);
        Self {
            intensity: params.intensity,
            lower,
            range: (upper - lower).max(0.0),
            invert: params.invert,
        }
    }

    /// Map `|noise|` from `[lower, upper]` onto `[0, 1]`, signed by the noise
    /// unless inverted. An empty range becomes a gate at `lower`.
    pub fn bound(&self, noise: f32) -> f32 {
        let magnitude = noise.abs();
        let r = if self.range <= 0.0 {
            if magnitude <= self.lower { 0.0 } else { 1.0 }
        } else {
            ((magnitude - self.lower) / self.range).clamp(0.0, 1.0)
        };
        if self.invert {
            1.0 - r
        } else if noise >= 0.0 {
            r
        } else {
            -r
        }
    }

    /// Gain applied to the signal for one noise sample.
    #[inline]
    pub fn gain(&self, noise: f32) -> f32 {
        (1.0 - self.intensity) + self.intensity * self.bound(noise)
    }
}

/// Multiply the interleaved `signal` by gaussian noise in place.
pub fn render_multiply(
    ws: &mut Workspace,
    slot: &mut StateSlot<GaussianState>,
    ctx: &RenderContext,
    settings: &NoiseSettings,
    params: &MultiplyParams,
    signal: &mut [i16],
) -> Result<()> {
    let params = params.clamped();
    let frames = ctx.frames(signal.len())?;
    let modulation = Modulation::new(&params);

    check_lanes(ws, params.alpha, ctx.is_stereo(params.flags))?;

    let hertz = semitones_to_hertz(params.resolution);
    let seed = settings.resolve_seed(ctx.instance_id);
    let (delta_phase, state) = slot.reconcile(hertz, ctx.sample_rate, &ctx.timeline);

    let mut stepper = Stepper::new(
        state.phase,
        corrected_delta(delta_phase, params.resolution),
        params.flags.interpolate,
    );
    let mut voices = gaussian_voices(
        ws,
        params.alpha,
        settings.fft_size,
        seed,
        state.pos,
        ctx.is_stereo(params.flags),
    )?;

    let channels = ctx.channels;
    run_voices(ws, &mut voices, &mut stepper, frames, |frame, values| {
        let row = &mut signal[frame * channels..(frame + 1) * channels];
        spread(row, values, |s, noise| {
            *s = to_i16(*s as f32, modulation.gain(noise));
        });
    });

    let mut end = GaussianState {
        pos: voices[0].stream.pos(),
        phase: stepper.phase(),
    };
    end.rewind_one();
    slot.store(end);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_bound_ramp() {
        let m = Modulation::new(&MultiplyParams {
            upper_db: 0.0,
            lower_db: BOUND_DB_MIN,
            ..Default::default()
        });
        assert_eq!(m.bound(0.0), 0.0);
        assert_eq!(m.bound(2.0), 1.0);
        assert_eq!(m.bound(-2.0), -1.0);
        assert_approx_eq!(f32, m.bound(0.5), 0.5, ulps = 2);
        assert_approx_eq!(f32, m.bound(-0.25), -0.25, ulps = 2);
    }

    #[test]
    fn test_bound_gate_and_invert() {
        let gate = Modulation::new(&MultiplyParams {
            upper_db: -20.0,
            lower_db: -6.0,
            ..Default::default()
        });
        // upper below lower collapses to a gate at lower (about 0.5).
        assert_eq!(gate.bound(0.4), 0.0);
        assert_eq!(gate.bound(0.6), 1.0);
        assert_eq!(gate.bound(-0.6), -1.0);

        let inv = Modulation::new(&MultiplyParams {
            invert: true,
            ..Default::default()
        });
        assert_approx_eq!(f32, inv.bound(0.25), 0.75, ulps = 2);
        assert_approx_eq!(f32, inv.bound(-0.25), 0.75, ulps = 2);
    }

    #[test]
    fn test_gain_intensity() {
        let dry = Modulation::new(&MultiplyParams {
            intensity: 0.0,
            ..Default::default()
        });
        assert_eq!(dry.gain(-0.7), 1.0);

        let half = Modulation::new(&MultiplyParams {
            intensity: 0.5,
            ..Default::default()
        });
        assert_approx_eq!(f32, half.gain(1.0), 1.0, ulps = 2);
        assert_approx_eq!(f32, half.gain(-1.0), 0.0, ulps = 2);
    }

    #[test]
    fn test_zero_intensity_leaves_signal() {
        let mut ws = Workspace::new(1);
        let mut slot = StateSlot::new();
        let params = MultiplyParams {
            intensity: 0.0,
            ..Default::default()
        };
        let original: Vec<i16> = (0..64).map(|i| (i * 100 - 3200) as i16).collect();
        let mut signal = original.clone();
        render_multiply(
            &mut ws,
            &mut slot,
            &RenderContext::default(),
            &NoiseSettings::default(),
            &params,
            &mut signal,
        )
        .unwrap();
        assert_eq!(signal, original);
    }

    #[test]
    fn test_full_intensity_never_amplifies() {
        let mut ws = Workspace::new(2);
        let mut slot = StateSlot::new();
        let params = MultiplyParams {
            alpha: 0.5,
            flags: crate::config::VoiceFlags {
                stereo: true,
                interpolate: true,
            },
            ..Default::default()
        };
        let original = vec![10_000i16; 2 * 1024];
        let mut signal = original.clone();
        render_multiply(
            &mut ws,
            &mut slot,
            &RenderContext::default(),
            &NoiseSettings::default(),
            &params,
            &mut signal,
        )
        .unwrap();
        assert!(signal.iter().all(|s| s.abs() <= 10_000));
        assert!(signal.iter().any(|&s| s != 10_000));
        assert!(signal.chunks(2).any(|f| f[0] != f[1]));
    }
}
