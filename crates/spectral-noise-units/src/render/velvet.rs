// SPDX-License-Identifier: LGPL-3.0-or-later

//! Velvet noise renderer.

use spectral_noise_lib::pcm::to_i16;

use crate::config::{NoiseSettings, VelvetParams};
use crate::consts::{DENSITY_MAX, VELVET_HEIGHT};
use crate::error::Result;
use crate::noise::VelvetNoise;
use crate::playback::{StateSlot, VelvetState};
use crate::units::semitones_to_hertz;
use crate::workspace::Workspace;

use super::{
    RenderContext, Stepper, Voice, apply_back_volume, check_background, check_lanes,
    corrected_delta, run_voices, spread,
};

/// Pulse period in stream steps for a pulse rate of `density` semitones.
///
/// `delta` is the corrected stream step per output sample, so the period
/// stays fixed in output time when the resolution changes.
pub fn velvet_period(delta: f64, sample_rate: u32, density: f64) -> u32 {
    if density >= DENSITY_MAX {
        return 1;
    }
    let taps_hertz = semitones_to_hertz(density);
    let period = (delta * sample_rate as f64 / taps_hertz).round();
    if period.is_finite() && period >= 1.0 {
        period.min(u32::MAX as f64) as u32
    } else {
        1
    }
}

/// Render velvet noise into the interleaved buffer `out`.
pub fn render_velvet(
    ws: &mut Workspace,
    slot: &mut StateSlot<VelvetState>,
    ctx: &RenderContext,
    settings: &NoiseSettings,
    params: &VelvetParams,
    out: &mut [i16],
    background: Option<&mut [i16]>,
) -> Result<()> {
    let params = params.clamped();
    let frames = ctx.frames(out.len())?;
    check_background(out.len(), background.as_deref())?;

    check_lanes(ws, params.alpha, ctx.is_stereo(params.flags))?;

    let hertz = semitones_to_hertz(params.resolution);
    let seed = settings.resolve_seed(ctx.instance_id);
    let (delta_phase, state) = slot.reconcile(hertz, ctx.sample_rate, &ctx.timeline);

    let delta = corrected_delta(delta_phase, params.resolution);
    let period = velvet_period(delta, ctx.sample_rate, params.density);
    let mut stepper = Stepper::new(state.phase, delta, params.flags.interpolate);

    let build = |ws: &mut Workspace, seed: u32, lane: usize| {
        VelvetNoise::new(
            ws,
            period,
            params.alpha,
            settings.fft_size,
            seed,
            state.pos,
            state.count_period,
            state.phase_period,
            lane,
        )
    };
    let left = build(ws, seed, 0)?;
    let right = if ctx.is_stereo(params.flags) {
        Some(build(ws, !seed, 1)?)
    } else {
        None
    };
    let mut voices = Vec::with_capacity(2);
    voices.push(Voice::new(left, ws));
    if let Some(right) = right {
        voices.push(Voice::new(right, ws));
    }

    let channels = ctx.channels;
    run_voices(ws, &mut voices, &mut stepper, frames, |frame, values| {
        let row = &mut out[frame * channels..(frame + 1) * channels];
        spread(row, values, |s, v| *s = to_i16(v, VELVET_HEIGHT));
    });

    let last = &voices[0].stream;
    let mut end = VelvetState {
        pos: last.pos(),
        phase: stepper.phase(),
        count_period: last.count_period(),
        phase_period: last.phase_period(),
    };
    end.rewind_one(period);
    slot.store(end);

    apply_back_volume(background, params.back_volume);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VoiceFlags;

    #[test]
    fn test_velvet_period() {
        assert_eq!(velvet_period(1.0, 48_000, DENSITY_MAX), 1);
        // 440 Hz taps at 44.1 kHz.
        assert_eq!(velvet_period(1.0, 44_100, 0.0), 100);
        assert_eq!(velvet_period(0.5, 44_100, 0.0), 50);
        // Faster than one pulse per step clamps to 1.
        assert_eq!(velvet_period(0.001, 48_000, 60.0), 1);
    }

    #[test]
    fn test_sparse_output() {
        let mut ws = Workspace::new(1);
        let mut slot = StateSlot::new();
        let params = VelvetParams {
            density: 0.0,
            ..Default::default()
        };
        let ctx = RenderContext {
            sample_rate: 44_100,
            channels: 1,
            ..Default::default()
        };
        let mut out = vec![0i16; 1000];
        render_velvet(
            &mut ws,
            &mut slot,
            &ctx,
            &NoiseSettings::default(),
            &params,
            &mut out,
            None,
        )
        .unwrap();
        let pulses = out.iter().filter(|&&s| s != 0).count();
        // Period 100: one pulse in each of the 10 full periods, give or take
        // the shifted start.
        assert!((9..=11).contains(&pulses), "pulses = {pulses}");
        assert!(out.iter().all(|&s| s == 0 || s.abs() == VELVET_HEIGHT as i16));
    }

    #[test]
    fn test_state_tracks_period() {
        let mut ws = Workspace::new(1);
        let mut slot = StateSlot::new();
        let params = VelvetParams {
            density: 0.0,
            ..Default::default()
        };
        let ctx = RenderContext {
            sample_rate: 44_100,
            channels: 1,
            ..Default::default()
        };
        let mut out = vec![0i16; 250];
        render_velvet(
            &mut ws,
            &mut slot,
            &ctx,
            &NoiseSettings::default(),
            &params,
            &mut out,
            None,
        )
        .unwrap();
        let end = slot.cache().unwrap().curr;
        // Stream ends at sample 251, stored one step back.
        assert_eq!(end.pos, 250);
        assert_eq!(end.count_period, 2);
        assert!((end.phase_period - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_colored_stereo() {
        let mut ws = Workspace::new(2);
        let mut slot = StateSlot::new();
        let params = VelvetParams {
            alpha: 1.0,
            flags: VoiceFlags {
                stereo: true,
                interpolate: false,
            },
            ..Default::default()
        };
        let mut out = vec![0i16; 2 * 2048];
        render_velvet(
            &mut ws,
            &mut slot,
            &RenderContext::default(),
            &NoiseSettings::default(),
            &params,
            &mut out,
            None,
        )
        .unwrap();
        assert!(out.chunks(2).any(|f| f[0] != f[1]));
    }
}
