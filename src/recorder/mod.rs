//! Recording session module
//!
//! This module implements the recording lifecycle:
//! - `Phase` and `SessionConfig` describing where a session is and how it runs
//! - `Session`, the per-start owner of stream, encoder and segments
//! - `Recorder`, the single-threaded state machine driving sessions

pub mod coordinator;
pub mod events;
pub mod session;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{Platform, Recorder, RecorderHandle};
pub use events::{Notice, PreviewSource, UiUpdate};
pub use session::Session;
pub use state::{Artifact, Phase, SessionConfig, SessionSnapshot};
