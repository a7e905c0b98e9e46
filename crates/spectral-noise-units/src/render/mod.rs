// SPDX-License-Identifier: LGPL-3.0-or-later

//! Render calls: one host audio buffer per call.
//!
//! Each renderer resolves its starting position from the instance's
//! [`StateSlot`](crate::playback::StateSlot), runs one stream per voice at the
//! requested step rate, writes interleaved `i16` samples and stores the final
//! position back into the slot.
//!
//! A voice reads one sample ahead: it keeps the previous stream value and
//! advances the stream whenever the fractional step phase wraps. With
//! interpolation enabled the output blends the two by the phase.

mod multiply;
mod noise;
mod pulse;
mod velvet;

pub use multiply::{Modulation, render_multiply};
pub use noise::render_noise;
pub use pulse::{PulseRange, pulse_range, render_pulse};
pub use velvet::{render_velvet, velvet_period};

use serde::{Deserialize, Serialize};
use spectral_noise_lib::pcm::scale_i16;

use crate::config::VoiceFlags;
use crate::consts::RESOLUTION_MAX;
use crate::error::{NoiseError, Result};
use crate::noise::NoiseStream;
use crate::playback::Timeline;
use crate::workspace::Workspace;

/// Host-side facts about one render call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderContext {
    pub sample_rate: u32,
    pub channels: usize,
    /// Identifies the generator instance; mixed into non-negative seeds.
    pub instance_id: u32,
    pub timeline: Timeline,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 2,
            instance_id: 0,
            timeline: Timeline::default(),
        }
    }
}

impl RenderContext {
    /// Number of frames in an interleaved buffer of `len` samples.
    pub fn frames(&self, len: usize) -> Result<usize> {
        if self.channels == 0 {
            return Err(NoiseError::ZeroChannels);
        }
        if self.sample_rate == 0 {
            return Err(NoiseError::InvalidSampleRate(self.sample_rate));
        }
        if len % self.channels != 0 {
            return Err(NoiseError::RaggedBuffer {
                len,
                channels: self.channels,
            });
        }
        Ok(len / self.channels)
    }

    /// Whether two independent voices are rendered.
    pub fn is_stereo(&self, flags: VoiceFlags) -> bool {
        flags.stereo && self.channels == 2
    }
}

/// Stream steps per output sample after resolution handling: exactly one at
/// the maximum resolution, otherwise at most one.
pub(crate) fn corrected_delta(delta_phase: f64, resolution: f64) -> f64 {
    if resolution >= RESOLUTION_MAX {
        1.0
    } else {
        delta_phase.min(1.0)
    }
}

pub(crate) fn check_background(len: usize, background: Option<&[i16]>) -> Result<()> {
    match background {
        Some(back) if back.len() != len => Err(NoiseError::BufferLength {
            expected: len,
            got: back.len(),
        }),
        _ => Ok(()),
    }
}

/// Fail before any state is touched when a colored render needs more lanes
/// than the workspace has.
pub(crate) fn check_lanes(ws: &Workspace, alpha: f32, stereo: bool) -> Result<()> {
    if alpha == 0.0 {
        return Ok(());
    }
    let needed = if stereo { 2 } else { 1 };
    if ws.lane_count() < needed {
        return Err(NoiseError::LaneOutOfRange {
            lane: needed - 1,
            count: ws.lane_count(),
        });
    }
    Ok(())
}

pub(crate) fn apply_back_volume(background: Option<&mut [i16]>, volume: f32) {
    if volume == 1.0 {
        return;
    }
    if let Some(back) = background {
        scale_i16(back, volume);
    }
}

/// Fractional step clock shared by all voices of a call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Stepper {
    phase: f64,
    delta: f64,
    interpolate: bool,
}

impl Stepper {
    pub fn new(phase: f64, delta: f64, interpolate: bool) -> Self {
        Self {
            phase,
            delta,
            interpolate,
        }
    }

    /// Advance the phase; true when the voices must advance.
    #[inline]
    pub fn step(&mut self) -> bool {
        self.phase += self.delta;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
            true
        } else {
            false
        }
    }

    /// Blend weight of the current stream value.
    #[inline]
    pub fn weight(&self) -> f32 {
        if self.interpolate {
            self.phase as f32
        } else {
            0.0
        }
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }
}

/// A stream together with the value it produced one step earlier.
#[derive(Debug, Clone)]
pub(crate) struct Voice<S> {
    pub stream: S,
    prev: f32,
}

impl<S: NoiseStream> Voice<S> {
    pub fn new(mut stream: S, ws: &mut Workspace) -> Self {
        let prev = stream.value(ws);
        stream.move_next(ws);
        Self { stream, prev }
    }

    #[inline]
    fn advance(&mut self, ws: &mut Workspace) {
        self.prev = self.stream.value(ws);
        self.stream.move_next(ws);
    }

    #[inline]
    fn sample(&self, ws: &Workspace, t: f32) -> f32 {
        (1.0 - t) * self.prev + t * self.stream.value(ws)
    }
}

/// Run `voices` for `frames` output frames, passing each frame's voice
/// outputs to `emit`.
pub(crate) fn run_voices<S: NoiseStream>(
    ws: &mut Workspace,
    voices: &mut [Voice<S>],
    stepper: &mut Stepper,
    frames: usize,
    mut emit: impl FnMut(usize, &[f32]),
) {
    let mut values = [0.0f32; 2];
    let count = voices.len().min(values.len());
    for frame in 0..frames {
        if stepper.step() {
            for voice in voices.iter_mut() {
                voice.advance(ws);
            }
        }
        let t = stepper.weight();
        for (v, voice) in values.iter_mut().zip(voices.iter()) {
            *v = voice.sample(ws, t);
        }
        emit(frame, &values[..count]);
    }
}

/// Write one frame: per-channel values for two voices, otherwise the single
/// voice duplicated into every channel.
#[inline]
pub(crate) fn spread<T>(row: &mut [T], values: &[f32], mut write: impl FnMut(&mut T, f32)) {
    if values.len() == 2 && row.len() == 2 {
        write(&mut row[0], values[0]);
        write(&mut row[1], values[1]);
    } else if let Some(&v) = values.first() {
        for sample in row.iter_mut() {
            write(sample, v);
        }
    }
}
