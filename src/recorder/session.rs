//! A single recording session
//!
//! One `Session` exists per start(). It exclusively owns the capture
//! stream, the encoder and the accumulated segments; dropping it releases
//! all of them.

use crate::capture::SharedStream;
use crate::encoder::{ContainerFormat, Encoder, EncoderError, EncoderSink};
use super::state::Artifact;
use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use uuid::Uuid;

pub struct Session {
    /// Unique id for log correlation
    pub id: Uuid,

    /// Events tagged with another generation belong to a superseded session
    pub generation: u64,

    /// When start() was invoked
    pub started_at: DateTime<Utc>,

    stream: Option<SharedStream>,
    encoder: Option<Box<dyn Encoder>>,
    stop_requested: bool,
    chunks: Vec<Vec<u8>>,
    countdown: Option<JoinHandle<()>>,
}

impl Session {
    pub fn new(generation: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            generation,
            started_at: Utc::now(),
            stream: None,
            encoder: None,
            stop_requested: false,
            chunks: Vec::new(),
            countdown: None,
        }
    }

    pub fn attach_stream(&mut self, stream: SharedStream) {
        // Never hold two streams
        self.release_stream();
        tracing::debug!("Session {} holds stream {}", self.id, stream.id());
        self.stream = Some(stream);
    }

    pub fn stream(&self) -> Option<&SharedStream> {
        self.stream.as_ref()
    }

    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    /// Stop every track of the held stream. Returns false if nothing was held.
    pub fn release_stream(&mut self) -> bool {
        match self.stream.take() {
            Some(stream) => {
                stream.stop_all_tracks();
                tracing::debug!("Session {} released stream {}", self.id, stream.id());
                true
            }
            None => false,
        }
    }

    pub fn set_countdown(&mut self, timer: JoinHandle<()>) {
        self.cancel_countdown();
        self.countdown = Some(timer);
    }

    pub fn cancel_countdown(&mut self) {
        if let Some(timer) = self.countdown.take() {
            timer.abort();
        }
    }

    /// Hand the held stream to `encoder` and keep the encoder running
    pub fn start_encoder(
        &mut self,
        mut encoder: Box<dyn Encoder>,
        sink: EncoderSink,
    ) -> Result<(), EncoderError> {
        let stream = self
            .stream
            .clone()
            .ok_or_else(|| EncoderError::StartFailed("no capture stream held".to_string()))?;

        encoder.start(stream, sink)?;
        self.encoder = Some(encoder);
        self.stop_requested = false;
        Ok(())
    }

    /// Ask a running encoder to finalize; repeated calls are ignored
    pub fn stop_encoder(&mut self) {
        if self.stop_requested {
            return;
        }
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.stop();
            self.stop_requested = true;
        }
    }

    /// The encoder reported it is done
    pub fn encoder_finished(&mut self) {
        self.encoder = None;
        self.stop_requested = false;
    }

    /// Append a segment. Empty segments are dropped.
    pub fn push_chunk(&mut self, data: Vec<u8>) -> bool {
        if data.is_empty() {
            return false;
        }
        self.chunks.push(data);
        true
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Assemble everything received so far into the final artifact
    pub fn assemble(&mut self, format: ContainerFormat) -> Artifact {
        let chunks = std::mem::take(&mut self.chunks);
        Artifact::assemble(&chunks, format)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel_countdown();
        self.stop_encoder();
        self.release_stream();
    }
}
