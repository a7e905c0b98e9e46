// SPDX-License-Identifier: LGPL-3.0-or-later

//! Shared helpers for the spectral noise elements.
//!
//! The renderers produce interleaved `i16` audio, so the elements negotiate
//! native-endian S16 caps.

use once_cell::sync::Lazy;

/// Interleaved S16 caps produced by the noise source.
pub static S16_INTERLEAVED_CAPS: Lazy<gstreamer::Caps> = Lazy::new(|| {
    gstreamer_audio::AudioCapsBuilder::new_interleaved()
        .format(gstreamer_audio::AUDIO_FORMAT_S16)
        .build()
});

/// Create the always-present src pad template of a source element.
pub fn s16_src_pad_templates() -> Vec<gstreamer::PadTemplate> {
    let src = gstreamer::PadTemplate::new(
        "src",
        gstreamer::PadDirection::Src,
        gstreamer::PadPresence::Always,
        &S16_INTERLEAVED_CAPS,
    )
    .expect("failed to create src pad template");
    vec![src]
}
