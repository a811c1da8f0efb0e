//! Capability probing
//!
//! Decides once per recorder whether screen capture can work at all.

use super::traits::{CaptureProvider, Probe};
use serde::{Deserialize, Serialize};

/// User-agent tokens of device classes that cannot capture screens.
///
/// Heuristic only; the list is likely stale and is consulted only when the
/// provider cannot probe itself.
const MOBILE_TOKENS: &[&str] = &[
    "android",
    "webos",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "iemobile",
    "opera mini",
];

/// Coarse class of the device the recorder runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Desktop,
    Mobile,
    #[default]
    Unknown,
}

impl DeviceClass {
    /// Classify a user-agent string
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_ascii_lowercase();
        if ua.is_empty() {
            DeviceClass::Unknown
        } else if MOBILE_TOKENS.iter().any(|token| ua.contains(token)) {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }

    pub fn is_known_incompatible(&self) -> bool {
        matches!(self, DeviceClass::Mobile)
    }
}

/// Why capture is unavailable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "reason", content = "detail")]
pub enum UnsupportedReason {
    MissingProvider,
    ProbeFailed(String),
    IncompatibleDevice,
}

/// Outcome of the one-time capability check
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum Support {
    #[default]
    Supported,
    Unsupported { reason: UnsupportedReason },
}

impl Support {
    pub fn is_supported(&self) -> bool {
        matches!(self, Support::Supported)
    }
}

/// Probe the provider first; use the device class only when the probe
/// cannot answer.
pub fn assess(provider: Option<&dyn CaptureProvider>, device: DeviceClass) -> Support {
    let Some(provider) = provider else {
        return Support::Unsupported {
            reason: UnsupportedReason::MissingProvider,
        };
    };

    match provider.probe() {
        Probe::Available => Support::Supported,
        Probe::Unavailable(detail) => Support::Unsupported {
            reason: UnsupportedReason::ProbeFailed(detail),
        },
        Probe::Unknown if device.is_known_incompatible() => Support::Unsupported {
            reason: UnsupportedReason::IncompatibleDevice,
        },
        Probe::Unknown => Support::Supported,
    }
}
