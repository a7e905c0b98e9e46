// SPDX-License-Identifier: LGPL-3.0-or-later

//! GStreamer source element rendering seekable spectral noise.
//!
//! | Element          | Description                                        |
//! |------------------|----------------------------------------------------|
//! | `spectral-noise` | Colored gaussian, velvet or pulse source (S16)      |
//!
//! Each output buffer is treated as one timeline frame, so the element drives
//! the same frame-by-frame playback state a host editor would.

use gstreamer::glib;
use gstreamer::prelude::*;

mod base;
mod noise;

glib::wrapper! {
    /// Public GLib type for the spectral noise source element.
    pub struct SpectralNoiseSrc(ObjectSubclass<noise::SpectralNoiseSrc>)
        @extends gstreamer_base::BaseSrc,
                 gstreamer::Element, gstreamer::Object;
}

/// GStreamer plugin entry point.
fn plugin_init(plugin: &gstreamer::Plugin) -> Result<(), glib::BoolError> {
    gstreamer::Element::register(
        Some(plugin),
        "spectral-noise",
        gstreamer::Rank::NONE,
        SpectralNoiseSrc::static_type(),
    )
}

gstreamer::plugin_define!(
    spectralnoise,
    env!("CARGO_PKG_DESCRIPTION"),
    plugin_init,
    concat!(env!("CARGO_PKG_VERSION")),
    "LGPL-3.0-or-later",
    env!("CARGO_PKG_NAME"),
    env!("CARGO_PKG_NAME"),
    env!("CARGO_PKG_REPOSITORY"),
    "2026-10-16"
);
