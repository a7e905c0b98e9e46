// SPDX-License-Identifier: LGPL-3.0-or-later

//! Deterministic pulse: a constant block at a fixed time inside the object.

use std::ops::Range;

use spectral_noise_lib::pcm::scale_i16;

use crate::config::PulseParams;
use crate::consts::PULSE_HEIGHT;
use crate::error::Result;
use crate::units::millis_to_samples;

use super::{RenderContext, check_background};

/// Pulse bounds in frames relative to the start of the current buffer.
///
/// With backwards playback `end` lies before `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseRange {
    pub start: i64,
    pub end: i64,
}

impl PulseRange {
    /// Frames of a buffer of `frames` frames covered by the pulse, or `None`
    /// when the pulse misses the buffer.
    pub fn clip(&self, frames: usize) -> Option<Range<usize>> {
        let lo = self.start.min(self.end).max(0);
        let hi = self.start.max(self.end).min(frames as i64);
        if hi <= 0 || frames as i64 <= lo || hi <= lo {
            None
        } else {
            Some(lo as usize..hi as usize)
        }
    }
}

/// Locate the pulse relative to the buffer rendered at `ctx.timeline`.
pub fn pulse_range(ctx: &RenderContext, params: &PulseParams) -> PulseRange {
    let params = params.clamped();
    let rate = ctx.sample_rate;
    let pos = millis_to_samples(rate, params.position_ms);
    let dur = millis_to_samples(rate, params.duration_ms);

    let timeline = &ctx.timeline;
    let speed = timeline.speed().unwrap_or(1.0);
    let rate_fps = &timeline.frame_rate;
    let buffer_start =
        timeline.frame() * rate as f64 * rate_fps.den as f64 / rate_fps.num.max(1) as f64;

    let duration = ((dur / speed.abs()) as i64).max(1);
    let start = ((pos - buffer_start) / speed) as i64;
    let end = if speed >= 0.0 {
        start + duration
    } else {
        start - duration
    };
    PulseRange { start, end }
}

/// Render the pulse into the interleaved buffer `out`.
///
/// When a background buffer is given and `back_volume != 1`, it is scaled
/// inside the pulse range only.
pub fn render_pulse(
    ctx: &RenderContext,
    params: &PulseParams,
    out: &mut [i16],
    background: Option<&mut [i16]>,
) -> Result<()> {
    let frames = ctx.frames(out.len())?;
    check_background(out.len(), background.as_deref())?;

    let Some(range) = pulse_range(ctx, params).clip(frames) else {
        out.fill(0);
        return Ok(());
    };
    let (lo, hi) = (range.start * ctx.channels, range.end * ctx.channels);
    out[..lo].fill(0);
    out[lo..hi].fill(PULSE_HEIGHT);
    out[hi..].fill(0);

    let volume = params.clamped().back_volume;
    if volume != 1.0 {
        if let Some(back) = background {
            scale_i16(&mut back[lo..hi], volume);
        }
    }
    Ok(())
}
