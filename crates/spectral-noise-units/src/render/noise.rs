// SPDX-License-Identifier: LGPL-3.0-or-later

//! Gaussian noise renderer.

use spectral_noise_lib::pcm::to_i16;

use crate::config::{FftSize, NoiseParams, NoiseSettings};
use crate::consts::GAUSSIAN_HEIGHT;
use crate::error::Result;
use crate::noise::ColoredNoise;
use crate::playback::{GaussianState, StateSlot};
use crate::units::semitones_to_hertz;
use crate::workspace::Workspace;

use super::{
    RenderContext, Stepper, Voice, apply_back_volume, check_background, check_lanes,
    corrected_delta, run_voices, spread,
};

/// Build one voice, or two with seeds `seed` and `!seed` on lanes 0 and 1.
pub(super) fn gaussian_voices(
    ws: &mut Workspace,
    alpha: f32,
    fft_size: FftSize,
    seed: u32,
    pos: u64,
    stereo: bool,
) -> Result<Vec<Voice<ColoredNoise>>> {
    let left = ColoredNoise::new(ws, alpha, fft_size, seed, pos, 0)?;
    let right = if stereo {
        Some(ColoredNoise::new(ws, alpha, fft_size, !seed, pos, 1)?)
    } else {
        None
    };

    let mut voices = Vec::with_capacity(2);
    voices.push(Voice::new(left, ws));
    if let Some(right) = right {
        voices.push(Voice::new(right, ws));
    }
    Ok(voices)
}

/// Render gaussian noise into the interleaved buffer `out`.
///
/// `background` is the host's already mixed audio of the same length; it is
/// scaled by the background volume.
pub fn render_noise(
    ws: &mut Workspace,
    slot: &mut StateSlot<GaussianState>,
    ctx: &RenderContext,
    settings: &NoiseSettings,
    params: &NoiseParams,
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
        let row = &mut out[frame * channels..(frame + 1) * channels];
        spread(row, values, |s, v| *s = to_i16(v, GAUSSIAN_HEIGHT));
    });

    let mut end = GaussianState {
        pos: voices[0].stream.pos(),
        phase: stepper.phase(),
    };
    end.rewind_one();
    slot.store(end);

    apply_back_volume(background, params.back_volume);
    Ok(())
}
