// SPDX-License-Identifier: LGPL-3.0-or-later

//! Playback position tracking across render calls.
//!
//! Hosts render audio one timeline frame at a time and may jump, play
//! backwards or re-render the frame they just produced. Each generator
//! instance keeps a [`StateSlot`] holding the stream position reached by the
//! last call (`curr`), the position that call started from (`prev`) and the
//! timeline position of that call. [`StateSlot::reconcile`] decides where the
//! next call starts:
//!
//! - at the head of the timeline, or when the timeline moved against the
//!   playback direction, from the default state;
//! - when the timeline moved forward, from `curr`;
//! - when the same frame is rendered again, from `prev`, so the redraw is
//!   identical.

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Stream position state persisted between render calls.
pub trait PlaybackState: Copy + Default {
    fn is_default(&self) -> bool;

    /// Replace a phase outside `(0, 1)` or a non-finite phase with 0.
    fn normalize(self) -> Self;
}

fn normalize_phase(phase: f64) -> f64 {
    if phase.is_finite() && 0.0 < phase && phase < 1.0 {
        phase
    } else {
        0.0
    }
}

/// Position of a gaussian stream: sample index plus fractional step phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GaussianState {
    pub pos: u64,
    pub phase: f64,
}

impl GaussianState {
    /// Step back one sample. Renderers read one sample ahead for
    /// interpolation, so the stored state points at the last sample used.
    pub fn rewind_one(&mut self) {
        self.pos = self.pos.wrapping_sub(1);
    }
}

impl PlaybackState for GaussianState {
    fn is_default(&self) -> bool {
        self.pos == 0 && self.phase == 0.0
    }

    fn normalize(self) -> Self {
        Self {
            pos: self.pos,
            phase: normalize_phase(self.phase),
        }
    }
}

/// Position of a velvet stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VelvetState {
    pub pos: u64,
    pub phase: f64,
    pub count_period: u64,
    /// Offset inside the current period as a fraction of the period.
    pub phase_period: f64,
}

impl VelvetState {
    /// Step back one sample, borrowing from `count_period` when the offset
    /// inside the period underflows.
    pub fn rewind_one(&mut self, period: u32) {
        self.pos = self.pos.wrapping_sub(1);
        self.phase_period -= 1.0 / period.max(1) as f64;
        if self.phase_period < 0.0 {
            let borrow = self.phase_period.floor();
            self.count_period = self.count_period.wrapping_add_signed(borrow as i64);
            self.phase_period -= borrow;
        }
    }
}

impl PlaybackState for VelvetState {
    fn is_default(&self) -> bool {
        self.pos == 0 && self.phase == 0.0 && self.count_period == 0 && self.phase_period == 0.0
    }

    fn normalize(self) -> Self {
        Self {
            phase: normalize_phase(self.phase),
            phase_period: normalize_phase(self.phase_period),
            ..self
        }
    }
}

/// Frame rate as a fraction, frames per second = `num / den`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl Default for FrameRate {
    fn default() -> Self {
        Self { num: 30, den: 1 }
    }
}

impl FrameRate {
    /// Duration of one frame in seconds.
    pub fn frame_seconds(&self) -> f64 {
        self.den as f64 / self.num.max(1) as f64
    }
}

/// Where on the host timeline the current render call sits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// Position of the rendered frame relative to the object start, in
    /// thousandths of a frame.
    pub milliframe: i64,
    /// Playback speed multiplier while the host plays at a non-default rate.
    /// Negative values play backwards; `None` and `Some(0.0)` mean normal
    /// playback.
    pub speed: Option<f64>,
    /// Length of the object in frames.
    pub frame_count: i64,
    pub frame_rate: FrameRate,
}

impl Timeline {
    /// Effective playback speed, `None` for normal playback.
    pub fn speed(&self) -> Option<f64> {
        self.speed.filter(|s| *s != 0.0)
    }

    /// Frame index as a fraction.
    pub fn frame(&self) -> f64 {
        0.001 * self.milliframe as f64
    }

    /// Whether the timeline is played forwards.
    pub fn is_forward(&self) -> bool {
        self.speed().is_none_or(|s| s >= 0.0)
    }

    /// Whether the frame before this one (in playback order) lies outside
    /// the object, so no previous render can be continued.
    pub fn is_head(&self) -> bool {
        match self.speed() {
            None => self.milliframe == 0,
            Some(s) => {
                let frame = self.frame();
                if s >= 0.0 {
                    frame - s < 0.0
                } else {
                    frame - s >= self.frame_count as f64
                }
            }
        }
    }

    /// Stream steps per output sample for a stream running at `hertz`.
    pub fn delta_phase(&self, hertz: f64, sample_rate: u32) -> f64 {
        let delta = hertz / sample_rate as f64;
        match self.speed() {
            Some(s) => delta * s.abs(),
            None => delta,
        }
    }
}

/// Cached states of one generator instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateCache<S> {
    pub curr: S,
    pub prev: S,
    pub prev_milliframe: i64,
}

/// Lazily created, host-owned cache slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateSlot<S> {
    cache: Option<StateCache<S>>,
}

impl<S> Default for StateSlot<S> {
    fn default() -> Self {
        Self { cache: None }
    }
}

impl<S: PlaybackState> StateSlot<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a previous render call stored its state here.
    pub fn exists(&self) -> bool {
        self.cache.is_some()
    }

    pub fn cache(&self) -> Option<&StateCache<S>> {
        self.cache.as_ref()
    }

    /// Forget all cached state.
    pub fn clear(&mut self) {
        self.cache = None;
    }

    /// Resolve the state a render call at `timeline` starts from, and record
    /// the call. Returns `(delta_phase, state)`.
    pub fn reconcile(&mut self, hertz: f64, sample_rate: u32, timeline: &Timeline) -> (f64, S) {
        let delta_phase = timeline.delta_phase(hertz, sample_rate);
        let curr_milliframe = timeline.milliframe;
        let is_head = timeline.is_head();

        let mut state = S::default();
        if let Some(cache) = &self.cache {
            if !is_head {
                let advanced = if timeline.is_forward() {
                    curr_milliframe >= cache.prev_milliframe
                } else {
                    curr_milliframe <= cache.prev_milliframe
                };
                if advanced {
                    state = cache.curr;
                } else {
                    trace!(
                        curr_milliframe,
                        prev_milliframe = cache.prev_milliframe,
                        "timeline moved against playback, resetting noise state"
                    );
                }
            }

            if !state.is_default() && curr_milliframe == cache.prev_milliframe {
                trace!(curr_milliframe, "re-rendering frame, rewinding noise state");
                state = cache.prev;
            }
        }

        let state = state.normalize();
        self.cache = Some(StateCache {
            curr: state,
            prev: state,
            prev_milliframe: curr_milliframe,
        });
        (delta_phase, state)
    }

    /// Record the state reached at the end of a render call.
    pub fn store(&mut self, state: S) {
        if let Some(cache) = &mut self.cache {
            cache.curr = state;
        }
    }
}
