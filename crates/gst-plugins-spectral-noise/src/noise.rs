// SPDX-License-Identifier: LGPL-3.0-or-later

//! GStreamer source element wrapping the [`spectral_noise_units::render`]
//! calls.
//!
//! Every buffer the element pushes is one timeline frame of
//! `samplesperbuffer` samples. The frame counter feeds the per-instance
//! [`StateSlot`]s exactly like a host editor rendering consecutive frames.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use gstreamer::glib;
use gstreamer::prelude::*;
use gstreamer::subclass::prelude::*;
use gstreamer_base::subclass::prelude::*;
use once_cell::sync::Lazy;

use spectral_noise_units::config::{
    FftSize, NoiseParams, NoiseSettings, PulseParams, VelvetParams, VoiceFlags,
};
use spectral_noise_units::consts::{
    ALPHA_MAX, ALPHA_MIN, DEFAULT_FFT_SIZE, DENSITY_DEFAULT, DENSITY_MAX, DENSITY_MIN,
    MAX_FFT_SIZE, MIN_FFT_SIZE, PULSE_DURATION_MS_MAX, PULSE_POSITION_MS_MAX, RESOLUTION_MAX,
    RESOLUTION_MIN,
};
use spectral_noise_units::playback::{FrameRate, GaussianState, StateSlot, Timeline, VelvetState};
use spectral_noise_units::render::{RenderContext, render_noise, render_pulse, render_velvet};
use spectral_noise_units::{NoiseError, Workspace};

use crate::base;

/// Default generator kind (0 = noise, 1 = velvet, 2 = pulse).
const DEFAULT_KIND: i32 = 0;
/// Default samples per buffer: one 30 fps frame at 48 kHz.
const DEFAULT_SAMPLES_PER_BUFFER: u32 = 1600;

// -- GObject property names --

const PROP_KIND: &str = "kind";
const PROP_ALPHA: &str = "alpha";
const PROP_RESOLUTION: &str = "resolution";
const PROP_DENSITY: &str = "density";
const PROP_SEED: &str = "seed";
const PROP_FFT_SIZE: &str = "fft-size";
const PROP_STEREO: &str = "stereo";
const PROP_INTERPOLATE: &str = "interpolate";
const PROP_PULSE_POSITION: &str = "pulse-position";
const PROP_PULSE_DURATION: &str = "pulse-duration";
const PROP_SAMPLES_PER_BUFFER: &str = "samplesperbuffer";

/// Instance ids mixed into non-negative seeds.
static NEXT_INSTANCE_ID: AtomicU32 = AtomicU32::new(0);

static CAT: Lazy<gstreamer::DebugCategory> = Lazy::new(|| {
    gstreamer::DebugCategory::new(
        "spectral-noise",
        gstreamer::DebugColorFlags::empty(),
        Some("Spectral noise source"),
    )
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Noise,
    Velvet,
    Pulse,
}

impl Kind {
    fn from_i32(raw: i32) -> Self {
        match raw {
            1 => Kind::Velvet,
            2 => Kind::Pulse,
            _ => Kind::Noise,
        }
    }

    fn to_i32(self) -> i32 {
        match self {
            Kind::Noise => 0,
            Kind::Velvet => 1,
            Kind::Pulse => 2,
        }
    }
}

// -- State --

/// Per-stream processing state, created on caps negotiation.
struct State {
    info: gstreamer_audio::AudioInfo,
    workspace: Workspace,
    gaussian: StateSlot<GaussianState>,
    velvet: StateSlot<VelvetState>,
    pcm: Vec<i16>,
    frame: i64,
    sample_offset: u64,
}

impl State {
    fn new(info: &gstreamer_audio::AudioInfo) -> Self {
        Self {
            info: info.clone(),
            workspace: Workspace::new(2),
            gaussian: StateSlot::new(),
            velvet: StateSlot::new(),
            pcm: Vec::new(),
            frame: 0,
            sample_offset: 0,
        }
    }
}

/// Snapshot of user-facing parameters.
#[derive(Debug, Clone)]
struct ElementParams {
    kind: Kind,
    settings: NoiseSettings,
    alpha: f32,
    resolution: f64,
    density: f64,
    flags: VoiceFlags,
    pulse_position_ms: f64,
    pulse_duration_ms: f64,
    samples_per_buffer: u32,
}

impl Default for ElementParams {
    fn default() -> Self {
        Self {
            kind: Kind::from_i32(DEFAULT_KIND),
            settings: NoiseSettings::default(),
            alpha: 0.0,
            resolution: RESOLUTION_MAX,
            density: DENSITY_DEFAULT,
            flags: VoiceFlags::default(),
            pulse_position_ms: 0.0,
            pulse_duration_ms: 0.0,
            samples_per_buffer: DEFAULT_SAMPLES_PER_BUFFER,
        }
    }
}

impl ElementParams {
    fn noise(&self) -> NoiseParams {
        NoiseParams {
            alpha: self.alpha,
            resolution: self.resolution,
            back_volume: 1.0,
            flags: self.flags,
        }
    }

    fn velvet(&self) -> VelvetParams {
        VelvetParams {
            density: self.density,
            alpha: self.alpha,
            resolution: self.resolution,
            back_volume: 1.0,
            flags: self.flags,
        }
    }

    fn pulse(&self) -> PulseParams {
        PulseParams {
            position_ms: self.pulse_position_ms,
            duration_ms: self.pulse_duration_ms,
            back_volume: 1.0,
        }
    }
}

// -- Element definition --

/// GStreamer spectral noise source element.
pub struct SpectralNoiseSrc {
    instance_id: u32,
    inner: Mutex<SpectralNoiseSrcInner>,
}

impl Default for SpectralNoiseSrc {
    fn default() -> Self {
        Self {
            instance_id: NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed),
            inner: Mutex::default(),
        }
    }
}

#[derive(Default)]
struct SpectralNoiseSrcInner {
    params: ElementParams,
    state: Option<State>,
}

#[glib::object_subclass]
impl ObjectSubclass for SpectralNoiseSrc {
    const NAME: &'static str = "SpectralNoiseSrc";
    type Type = super::SpectralNoiseSrc;
    type ParentType = gstreamer_base::BaseSrc;
}

impl ObjectImpl for SpectralNoiseSrc {
    fn properties() -> &'static [glib::ParamSpec] {
        static PROPERTIES: Lazy<Vec<glib::ParamSpec>> = Lazy::new(|| {
            vec![
                glib::ParamSpecInt::builder(PROP_KIND)
                    .nick("Kind")
                    .blurb("Generator: 0=noise, 1=velvet, 2=pulse")
                    .minimum(0)
                    .maximum(2)
                    .default_value(DEFAULT_KIND)
                    .mutable_playing()
                    .build(),
                glib::ParamSpecFloat::builder(PROP_ALPHA)
                    .nick("Alpha")
                    .blurb("Spectral tilt, power falls as f^-alpha")
                    .minimum(ALPHA_MIN)
                    .maximum(ALPHA_MAX)
                    .default_value(0.0)
                    .mutable_playing()
                    .build(),
                glib::ParamSpecDouble::builder(PROP_RESOLUTION)
                    .nick("Resolution")
                    .blurb("Stream step rate in semitones relative to A4")
                    .minimum(RESOLUTION_MIN)
                    .maximum(RESOLUTION_MAX)
                    .default_value(RESOLUTION_MAX)
                    .mutable_playing()
                    .build(),
                glib::ParamSpecDouble::builder(PROP_DENSITY)
                    .nick("Density")
                    .blurb("Velvet pulse rate in semitones relative to A4")
                    .minimum(DENSITY_MIN)
                    .maximum(DENSITY_MAX)
                    .default_value(DENSITY_DEFAULT)
                    .mutable_playing()
                    .build(),
                glib::ParamSpecInt::builder(PROP_SEED)
                    .nick("Seed")
                    .blurb("Negative seeds are shared by all instances")
                    .default_value(0)
                    .mutable_ready()
                    .build(),
                glib::ParamSpecUInt::builder(PROP_FFT_SIZE)
                    .nick("FFT Size")
                    .blurb("Block size of colored streams, rounded up to a power of two")
                    .minimum(MIN_FFT_SIZE)
                    .maximum(MAX_FFT_SIZE)
                    .default_value(DEFAULT_FFT_SIZE)
                    .mutable_ready()
                    .build(),
                glib::ParamSpecBoolean::builder(PROP_STEREO)
                    .nick("Stereo")
                    .blurb("Independent left and right streams on two-channel output")
                    .default_value(false)
                    .mutable_playing()
                    .build(),
                glib::ParamSpecBoolean::builder(PROP_INTERPOLATE)
                    .nick("Interpolate")
                    .blurb("Linear interpolation between stream steps")
                    .default_value(false)
                    .mutable_playing()
                    .build(),
                glib::ParamSpecDouble::builder(PROP_PULSE_POSITION)
                    .nick("Pulse Position")
                    .blurb("Pulse start in milliseconds")
                    .minimum(0.0)
                    .maximum(PULSE_POSITION_MS_MAX)
                    .default_value(0.0)
                    .mutable_playing()
                    .build(),
                glib::ParamSpecDouble::builder(PROP_PULSE_DURATION)
                    .nick("Pulse Duration")
                    .blurb("Pulse length in milliseconds")
                    .minimum(0.0)
                    .maximum(PULSE_DURATION_MS_MAX)
                    .default_value(0.0)
                    .mutable_playing()
                    .build(),
                glib::ParamSpecUInt::builder(PROP_SAMPLES_PER_BUFFER)
                    .nick("Samples Per Buffer")
                    .blurb("Number of samples per output buffer (one frame)")
                    .minimum(1)
                    .maximum(65536)
                    .default_value(DEFAULT_SAMPLES_PER_BUFFER)
                    .mutable_ready()
                    .build(),
            ]
        });
        PROPERTIES.as_ref()
    }

    fn set_property(&self, _id: usize, value: &glib::Value, pspec: &glib::ParamSpec) {
        let mut inner = self.inner.lock().expect("mutex poisoned");
        let params = &mut inner.params;
        match pspec.name() {
            PROP_KIND => params.kind = Kind::from_i32(value.get().expect("type checked")),
            PROP_ALPHA => params.alpha = value.get().expect("type checked"),
            PROP_RESOLUTION => params.resolution = value.get().expect("type checked"),
            PROP_DENSITY => params.density = value.get().expect("type checked"),
            PROP_SEED => params.settings.seed = value.get().expect("type checked"),
            PROP_FFT_SIZE => {
                let size: u32 = value.get().expect("type checked");
                params.settings.fft_size = FftSize::clamped(size);
            }
            PROP_STEREO => params.flags.stereo = value.get().expect("type checked"),
            PROP_INTERPOLATE => params.flags.interpolate = value.get().expect("type checked"),
            PROP_PULSE_POSITION => params.pulse_position_ms = value.get().expect("type checked"),
            PROP_PULSE_DURATION => params.pulse_duration_ms = value.get().expect("type checked"),
            PROP_SAMPLES_PER_BUFFER => {
                params.samples_per_buffer = value.get().expect("type checked");
            }
            _ => {}
        }
    }

    fn property(&self, _id: usize, pspec: &glib::ParamSpec) -> glib::Value {
        let inner = self.inner.lock().expect("mutex poisoned");
        let params = &inner.params;
        match pspec.name() {
            PROP_KIND => params.kind.to_i32().to_value(),
            PROP_ALPHA => params.alpha.to_value(),
            PROP_RESOLUTION => params.resolution.to_value(),
            PROP_DENSITY => params.density.to_value(),
            PROP_SEED => params.settings.seed.to_value(),
            PROP_FFT_SIZE => params.settings.fft_size.get().to_value(),
            PROP_STEREO => params.flags.stereo.to_value(),
            PROP_INTERPOLATE => params.flags.interpolate.to_value(),
            PROP_PULSE_POSITION => params.pulse_position_ms.to_value(),
            PROP_PULSE_DURATION => params.pulse_duration_ms.to_value(),
            PROP_SAMPLES_PER_BUFFER => params.samples_per_buffer.to_value(),
            _ => unimplemented!(),
        }
    }
}

impl GstObjectImpl for SpectralNoiseSrc {}

impl ElementImpl for SpectralNoiseSrc {
    fn metadata() -> Option<&'static gstreamer::subclass::ElementMetadata> {
        static ELEMENT_METADATA: Lazy<gstreamer::subclass::ElementMetadata> = Lazy::new(|| {
            gstreamer::subclass::ElementMetadata::new(
                "Spectral Noise",
                "Source/Audio",
                "Seekable colored gaussian, velvet and pulse noise",
                "Spectral Noise developers",
            )
        });
        Some(&*ELEMENT_METADATA)
    }

    fn pad_templates() -> &'static [gstreamer::PadTemplate] {
        static PAD_TEMPLATES: Lazy<Vec<gstreamer::PadTemplate>> =
            Lazy::new(base::s16_src_pad_templates);
        PAD_TEMPLATES.as_ref()
    }
}

impl SpectralNoiseSrc {
    fn render_error(&self, err: NoiseError) -> gstreamer::FlowError {
        gstreamer::element_error!(
            self.obj(),
            gstreamer::CoreError::Failed,
            ["Render failed: {}", err]
        );
        gstreamer::FlowError::Error
    }
}

impl BaseSrcImpl for SpectralNoiseSrc {
    fn set_caps(&self, caps: &gstreamer::Caps) -> Result<(), gstreamer::LoggableError> {
        let info = gstreamer_audio::AudioInfo::from_caps(caps).map_err(|_| {
            gstreamer::loggable_error!(CAT, "Failed to parse audio caps")
        })?;

        let mut inner = self
            .inner
            .lock()
            .map_err(|_| gstreamer::loggable_error!(CAT, "Mutex poisoned in set_caps"))?;

        gstreamer::debug!(
            CAT,
            imp = self,
            "negotiated {} Hz, {} channels, instance {}",
            info.rate(),
            info.channels(),
            self.instance_id
        );
        inner.state = Some(State::new(&info));
        Ok(())
    }

    fn fixate(&self, mut caps: gstreamer::Caps) -> gstreamer::Caps {
        caps.truncate();
        {
            let caps = caps.make_mut();
            if let Some(s) = caps.structure_mut(0) {
                s.fixate_field_nearest_int("rate", 48000);
                s.fixate_field_nearest_int("channels", 2);
            }
        }
        self.parent_fixate(caps)
    }

    fn is_seekable(&self) -> bool {
        false
    }

    fn create(
        &self,
        _offset: u64,
        _buffer: Option<&mut gstreamer::BufferRef>,
        _length: u32,
    ) -> Result<gstreamer_base::subclass::base_src::CreateSuccess, gstreamer::FlowError> {
        let mut inner = self.inner.lock().map_err(|_| {
            gstreamer::element_error!(self.obj(), gstreamer::CoreError::Failed, ["Mutex poisoned"]);
            gstreamer::FlowError::Error
        })?;

        let inner = &mut *inner;
        let params = &inner.params;
        let samples_per_buffer = params.samples_per_buffer as usize;

        let Some(state) = inner.state.as_mut() else {
            gstreamer::element_error!(
                self.obj(),
                gstreamer::CoreError::Negotiation,
                ["Not negotiated yet"]
            );
            return Err(gstreamer::FlowError::NotNegotiated);
        };

        let channels = state.info.channels() as usize;
        let rate = state.info.rate();
        let ctx = RenderContext {
            sample_rate: rate,
            channels,
            instance_id: self.instance_id,
            timeline: Timeline {
                milliframe: state.frame.saturating_mul(1000),
                speed: None,
                frame_count: i64::MAX,
                frame_rate: FrameRate {
                    num: rate,
                    den: params.samples_per_buffer,
                },
            },
        };

        state.pcm.resize(samples_per_buffer * channels, 0);
        let rendered = match params.kind {
            Kind::Noise => render_noise(
                &mut state.workspace,
                &mut state.gaussian,
                &ctx,
                &params.settings,
                &params.noise(),
                &mut state.pcm,
                None,
            ),
            Kind::Velvet => render_velvet(
                &mut state.workspace,
                &mut state.velvet,
                &ctx,
                &params.settings,
                &params.velvet(),
                &mut state.pcm,
                None,
            ),
            Kind::Pulse => render_pulse(&ctx, &params.pulse(), &mut state.pcm, None),
        };
        rendered.map_err(|err| self.render_error(err))?;

        let byte_size = state.pcm.len() * std::mem::size_of::<i16>();
        let mut buffer = gstreamer::Buffer::with_size(byte_size).map_err(|_| {
            gstreamer::element_error!(
                self.obj(),
                gstreamer::CoreError::Failed,
                ["Failed to allocate buffer"]
            );
            gstreamer::FlowError::Error
        })?;

        {
            let buffer_ref = buffer.get_mut().ok_or_else(|| {
                gstreamer::element_error!(
                    self.obj(),
                    gstreamer::CoreError::Failed,
                    ["Failed to get mutable buffer"]
                );
                gstreamer::FlowError::Error
            })?;

            let pts = state
                .sample_offset
                .mul_div_floor(*gstreamer::ClockTime::SECOND, rate as u64);
            if let Some(pts) = pts {
                buffer_ref.set_pts(gstreamer::ClockTime::from_nseconds(pts));
            }

            let duration = (samples_per_buffer as u64)
                .mul_div_floor(*gstreamer::ClockTime::SECOND, rate as u64);
            if let Some(dur) = duration {
                buffer_ref.set_duration(gstreamer::ClockTime::from_nseconds(dur));
            }

            buffer_ref.set_offset(state.sample_offset);
            let next_offset = state.sample_offset + samples_per_buffer as u64;
            buffer_ref.set_offset_end(next_offset);

            let mut map = buffer_ref.map_writable().map_err(|_| {
                gstreamer::element_error!(
                    self.obj(),
                    gstreamer::CoreError::Failed,
                    ["Failed to map buffer writable"]
                );
                gstreamer::FlowError::Error
            })?;

            for (bytes, sample) in map.chunks_exact_mut(2).zip(&state.pcm) {
                bytes.copy_from_slice(&sample.to_ne_bytes());
            }

            state.sample_offset = next_offset;
            state.frame += 1;
        }

        Ok(gstreamer_base::subclass::base_src::CreateSuccess::NewBuffer(buffer))
    }

    fn stop(&self) -> Result<(), gstreamer::ErrorMessage> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| gstreamer::error_msg!(gstreamer::CoreError::Failed, ["Mutex poisoned"]))?;
        inner.state = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use gstreamer::prelude::*;

    fn init() {
        use std::sync::Once;
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            gstreamer::init().expect("Failed to initialize GStreamer");
            crate::plugin_register_static().expect("Failed to register spectralnoise plugin");
        });
    }

    fn make_noise() -> gstreamer::Element {
        init();
        gstreamer::ElementFactory::make("spectral-noise")
            .build()
            .expect("failed to create spectral-noise")
    }

    #[test]
    fn property_defaults() {
        let elem = make_noise();
        assert_eq!(elem.property::<i32>("kind"), 0);
        assert_eq!(elem.property::<f32>("alpha"), 0.0);
        assert_eq!(elem.property::<f64>("resolution"), 96.0);
        assert_eq!(elem.property::<f64>("density"), 33.0);
        assert_eq!(elem.property::<i32>("seed"), 0);
        assert_eq!(elem.property::<u32>("fft-size"), 2048);
        assert!(!elem.property::<bool>("stereo"));
        assert!(!elem.property::<bool>("interpolate"));
        assert_eq!(elem.property::<u32>("samplesperbuffer"), 1600);
    }

    #[test]
    fn property_set_get_roundtrip() {
        let elem = make_noise();
        elem.set_property("kind", 1i32);
        elem.set_property("alpha", 1.5f32);
        elem.set_property("seed", -7i32);
        elem.set_property("stereo", true);
        elem.set_property("pulse-duration", 20.0f64);

        assert_eq!(elem.property::<i32>("kind"), 1);
        assert_eq!(elem.property::<f32>("alpha"), 1.5);
        assert_eq!(elem.property::<i32>("seed"), -7);
        assert!(elem.property::<bool>("stereo"));
        assert_eq!(elem.property::<f64>("pulse-duration"), 20.0);
    }

    #[test]
    fn fft_size_rounds_up() {
        let elem = make_noise();
        elem.set_property("fft-size", 3000u32);
        assert_eq!(elem.property::<u32>("fft-size"), 4096);
    }

    #[test]
    fn kind_roundtrip() {
        for raw in 0..3 {
            assert_eq!(super::Kind::from_i32(raw).to_i32(), raw);
        }
        assert_eq!(super::Kind::from_i32(99), super::Kind::Noise);
    }

    #[test]
    fn instances_get_distinct_ids() {
        let a = super::SpectralNoiseSrc::default();
        let b = super::SpectralNoiseSrc::default();
        assert_ne!(a.instance_id, b.instance_id);
    }

    fn run_pipeline(kind: i32, channels: i32) {
        init();
        let pipeline = gstreamer::Pipeline::new();
        let noise = make_noise();
        noise.set_property("kind", kind);
        noise.set_property("alpha", 1.0f32);
        noise.set_property("stereo", true);

        let capsfilter = gstreamer::ElementFactory::make("capsfilter")
            .property(
                "caps",
                gstreamer_audio::AudioCapsBuilder::new_interleaved()
                    .format(gstreamer_audio::AUDIO_FORMAT_S16)
                    .rate(48000)
                    .channels(channels)
                    .build(),
            )
            .build()
            .expect("capsfilter");
        let sink = gstreamer::ElementFactory::make("fakesink")
            .property("num-buffers", 5i32)
            .build()
            .expect("fakesink");

        pipeline
            .add_many([&noise, &capsfilter, &sink])
            .expect("add elements");
        gstreamer::Element::link_many([&noise, &capsfilter, &sink]).expect("link elements");

        pipeline
            .set_state(gstreamer::State::Playing)
            .expect("set playing");

        let bus = pipeline.bus().expect("bus");
        for msg in bus.iter_timed(gstreamer::ClockTime::from_seconds(5)) {
            match msg.view() {
                gstreamer::MessageView::Eos(..) => break,
                gstreamer::MessageView::Error(err) => {
                    panic!("Pipeline error: {} ({:?})", err.error(), err.debug());
                }
                _ => {}
            }
        }

        pipeline
            .set_state(gstreamer::State::Null)
            .expect("set null");
    }

    #[test]
    fn pipeline_produces_noise() {
        run_pipeline(0, 2);
    }

    #[test]
    fn pipeline_produces_velvet() {
        run_pipeline(1, 1);
    }

    #[test]
    fn pipeline_produces_pulse() {
        run_pipeline(2, 2);
    }
}
