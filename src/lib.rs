//! Screen Recorder - capture a screen, count down, record, download.
//!
//! The crate implements the recording session state machine. The capture
//! provider, the encoder, the UI and the download surface are external
//! collaborators plugged in through the traits in [`capture`], [`encoder`]
//! and [`download`].

pub mod capture;
pub mod download;
pub mod encoder;
pub mod recorder;
pub mod utils;

pub use recorder::{Platform, Recorder, RecorderHandle, SessionConfig, UiUpdate};
pub use utils::error::{RecorderError, RecorderResult};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging for hosts that do not install their own
/// subscriber. Honors `RUST_LOG`.
pub fn init_tracing() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "screen_recorder=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    tracing::info!("Screen Recorder v{}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
