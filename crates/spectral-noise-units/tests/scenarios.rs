// SPDX-License-Identifier: LGPL-3.0-or-later
//
// Host playback scenarios: render consecutive timeline frames through the
// public render calls and check that continuation, redraw and seeking all
// agree with the position-pure streams.

use spectral_noise_units::config::{MultiplyParams, NoiseParams, NoiseSettings, VelvetParams};
use spectral_noise_units::playback::{FrameRate, GaussianState, StateSlot, Timeline, VelvetState};
use spectral_noise_units::render::{
    RenderContext, render_multiply, render_noise, render_velvet,
};
use spectral_noise_units::{FftSize, VoiceFlags, Workspace};

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

const RATE: u32 = 48_000;
/// Samples per frame at 30 fps.
const FRAME_LEN: usize = 1600;

fn ctx(milliframe: i64, channels: usize, instance_id: u32) -> RenderContext {
    RenderContext {
        sample_rate: RATE,
        channels,
        instance_id,
        timeline: Timeline {
            milliframe,
            speed: None,
            frame_count: 1000,
            frame_rate: FrameRate { num: 30, den: 1 },
        },
    }
}

fn pink_stereo() -> NoiseParams {
    NoiseParams {
        alpha: 1.0,
        flags: VoiceFlags {
            stereo: true,
            interpolate: false,
        },
        ..Default::default()
    }
}

fn noise_frame(
    ws: &mut Workspace,
    slot: &mut StateSlot<GaussianState>,
    settings: &NoiseSettings,
    params: &NoiseParams,
    ctx: &RenderContext,
    frames: usize,
) -> Vec<i16> {
    let mut out = vec![0i16; frames * ctx.channels];
    render_noise(ws, slot, ctx, settings, params, &mut out, None).unwrap();
    out
}

#[test]
fn redraw_of_a_frame_is_identical() {
    let mut ws = Workspace::new(2);
    let mut slot = StateSlot::new();
    let settings = NoiseSettings {
        seed: 11,
        fft_size: FftSize::new(1024).unwrap(),
    };
    let params = pink_stereo();

    let _frame0 = noise_frame(&mut ws, &mut slot, &settings, &params, &ctx(0, 2, 0), FRAME_LEN);
    let frame1 = noise_frame(&mut ws, &mut slot, &settings, &params, &ctx(1000, 2, 0), FRAME_LEN);
    let again = noise_frame(&mut ws, &mut slot, &settings, &params, &ctx(1000, 2, 0), FRAME_LEN);
    assert_eq!(frame1, again);

    // Playback continues normally after the redraw.
    let frame2 = noise_frame(&mut ws, &mut slot, &settings, &params, &ctx(2000, 2, 0), FRAME_LEN);
    assert_ne!(frame1, frame2);
}

#[test]
fn consecutive_frames_match_one_long_render() {
    let settings = NoiseSettings {
        seed: -4,
        fft_size: FftSize::new(512).unwrap(),
    };
    let params = pink_stereo();

    let mut ws = Workspace::new(2);
    let mut slot = StateSlot::new();
    let mut pieces = Vec::new();
    for frame in 0..3 {
        pieces.extend(noise_frame(
            &mut ws,
            &mut slot,
            &settings,
            &params,
            &ctx(frame * 1000, 2, 0),
            FRAME_LEN,
        ));
    }

    let mut slot = StateSlot::new();
    let whole = noise_frame(&mut ws, &mut slot, &settings, &params, &ctx(0, 2, 0), 3 * FRAME_LEN);
    assert_eq!(pieces, whole);
}

#[test]
fn jump_back_to_head_restarts() {
    let settings = NoiseSettings::default();
    let params = NoiseParams::default();
    let mut ws = Workspace::new(1);
    let mut slot = StateSlot::new();

    let first = noise_frame(&mut ws, &mut slot, &settings, &params, &ctx(0, 1, 0), FRAME_LEN);
    noise_frame(&mut ws, &mut slot, &settings, &params, &ctx(1000, 1, 0), FRAME_LEN);
    noise_frame(&mut ws, &mut slot, &settings, &params, &ctx(2000, 1, 0), FRAME_LEN);
    let restart = noise_frame(&mut ws, &mut slot, &settings, &params, &ctx(0, 1, 0), FRAME_LEN);
    assert_eq!(first, restart);
}

#[test]
fn non_negative_seeds_differ_per_instance() {
    let params = NoiseParams::default();
    let mut ws = Workspace::new(1);

    let render = |ws: &mut Workspace, seed: i32, instance_id: u32| {
        let settings = NoiseSettings {
            seed,
            ..Default::default()
        };
        let mut slot = StateSlot::new();
        noise_frame(ws, &mut slot, &settings, &params, &ctx(0, 1, instance_id), 512)
    };

    let a = render(&mut ws, 5, 1);
    let b = render(&mut ws, 5, 2);
    assert_ne!(a, b);

    let c = render(&mut ws, -5, 1);
    let d = render(&mut ws, -5, 2);
    assert_eq!(c, d);
}

#[test]
fn velvet_redraw_and_sparsity() {
    let mut ws = Workspace::new(1);
    let mut slot = StateSlot::<VelvetState>::new();
    let settings = NoiseSettings::default();
    // 440 Hz taps at 48 kHz: period 109.
    let params = VelvetParams {
        density: 0.0,
        ..Default::default()
    };

    let render = |ws: &mut Workspace, slot: &mut StateSlot<VelvetState>, milliframe: i64| {
        let mut out = vec![0i16; FRAME_LEN];
        render_velvet(ws, slot, &ctx(milliframe, 1, 0), &settings, &params, &mut out, None)
            .unwrap();
        out
    };

    let frame0 = render(&mut ws, &mut slot, 0);
    let frame1 = render(&mut ws, &mut slot, 1000);
    let again = render(&mut ws, &mut slot, 1000);
    assert_eq!(frame1, again);

    for frame in [&frame0, &frame1] {
        let pulses = frame.iter().filter(|&&s| s != 0).count();
        assert!((13..=16).contains(&pulses), "pulses = {pulses}");
    }

    // The pulse train continues across the frame boundary: gaps between
    // pulses never exceed two periods.
    let joined: Vec<usize> = frame0
        .iter()
        .chain(frame1.iter())
        .enumerate()
        .filter(|(_, s)| **s != 0)
        .map(|(i, _)| i)
        .collect();
    assert!(joined.windows(2).all(|w| w[1] - w[0] < 2 * 109));
}

#[test]
fn multiply_follows_noise_envelope() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5EED);
    let signal: Vec<i16> = (0..2 * FRAME_LEN)
        .map(|_| rng.random_range(-20_000..20_000))
        .collect();

    let mut ws = Workspace::new(2);
    let mut slot = StateSlot::new();
    let params = MultiplyParams {
        intensity: 1.0,
        ..Default::default()
    };
    let mut modulated = signal.clone();
    render_multiply(
        &mut ws,
        &mut slot,
        &ctx(0, 2, 0),
        &NoiseSettings::default(),
        &params,
        &mut modulated,
    )
    .unwrap();

    // Full intensity between -72 dB and 0 dB bounds: |gain| <= 1.
    assert!(
        signal
            .iter()
            .zip(&modulated)
            .all(|(s, m)| m.unsigned_abs() <= s.unsigned_abs() + 1)
    );
    assert_ne!(signal, modulated);
}

#[test]
fn settings_parse_from_json() {
    let settings: NoiseSettings = serde_json::from_str(r#"{"seed":-3,"fft_size":3000}"#).unwrap();
    assert_eq!(settings.seed, -3);
    assert_eq!(settings.fft_size.get(), 4096);

    let settings: NoiseSettings = serde_json::from_str("{}").unwrap();
    assert_eq!(settings, NoiseSettings::default());

    let params: NoiseParams =
        serde_json::from_str(r#"{"alpha":9.5,"stereo":true,"back_volume":0.25}"#).unwrap();
    assert!(params.flags.stereo);
    assert!(!params.flags.interpolate);
    assert_eq!(params.clamped().alpha, 4.0);
    assert_eq!(params.back_volume, 0.25);

    let json = serde_json::to_string(&settings).unwrap();
    assert_eq!(json, r#"{"seed":0,"fft_size":2048}"#);
}
