//! Screen capture seams
//!
//! The capture provider itself lives outside this crate (browser, portal,
//! native API). This module defines what the recorder needs from it and
//! how support is detected up front.

pub mod support;
pub mod traits;

pub use support::{assess, DeviceClass, Support, UnsupportedReason};
pub use traits::{
    CaptureError, CaptureProvider, CaptureRequest, MediaStream, Probe, SharedStream,
    StreamEndNotifier, TrackInfo, TrackKind,
};
