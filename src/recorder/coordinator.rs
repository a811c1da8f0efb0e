//! Recording coordinator
//!
//! Owns the recording session and drives its lifecycle. Every transition
//! goes through `Recorder::dispatch`, fed by two queues: user intents from
//! `RecorderHandle`s and callbacks from the capture provider, the encoder
//! and the countdown timer.

use super::events::{Intent, Notice, PreviewSource, SessionEvent, UiUpdate};
use super::session::Session;
use super::state::{Artifact, Phase, SessionConfig, SessionSnapshot};
use crate::capture::{
    assess, CaptureProvider, CaptureRequest, DeviceClass, SharedStream, StreamEndNotifier, Support,
};
use crate::download::{DownloadOffer, DownloadReceipt, DownloadSurface};
use crate::encoder::{EncoderFactory, EncoderSink};
use crate::utils::error::{ErrorResponse, RecorderError, RecorderResult};
use chrono::Utc;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Label shown on the start control when capture cannot work
const UNSUPPORTED_LABEL: &str = "Screen recording not supported";

const UNSUPPORTED_NOTICE: &str =
    "Screen recording is not supported on this device/browser. Please use a desktop browser.";

/// External collaborators the recorder works with
#[derive(Clone)]
pub struct Platform {
    /// `None` when the environment exposes no capture facility at all
    pub capture: Option<Arc<dyn CaptureProvider>>,
    pub encoders: Arc<dyn EncoderFactory>,
    pub downloads: Arc<dyn DownloadSurface>,
    pub device: DeviceClass,
}

enum Message {
    Intent(Intent),
    Event(SessionEvent),
}

/// The recording state machine
pub struct Recorder {
    config: SessionConfig,
    platform: Platform,

    /// Decided once, when the recorder is created
    support: Support,

    /// Mirrors `phase` for synchronous reads from handles
    shared_phase: Arc<RwLock<Phase>>,
    phase: Phase,

    /// The active session, if any
    session: Option<Session>,
    last_session_id: Option<Uuid>,
    next_generation: u64,

    /// Outlives the session that produced it until the next start()
    artifact: Option<Artifact>,

    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    intents_rx: mpsc::UnboundedReceiver<Intent>,
    ui_tx: broadcast::Sender<UiUpdate>,
}

/// Cloneable handle the UI layer uses to forward intents
#[derive(Clone)]
pub struct RecorderHandle {
    intents: mpsc::UnboundedSender<Intent>,
    phase: Arc<RwLock<Phase>>,
    ui_tx: broadcast::Sender<UiUpdate>,
}

impl Recorder {
    /// Create a recorder and its handle. Nothing runs until `run` is polled.
    pub fn new(config: SessionConfig, platform: Platform) -> (Self, RecorderHandle) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (intents_tx, intents_rx) = mpsc::unbounded_channel();
        let (ui_tx, _) = broadcast::channel(100);
        let shared_phase = Arc::new(RwLock::new(Phase::Idle));

        let support = assess(platform.capture.as_deref(), platform.device);

        let handle = RecorderHandle {
            intents: intents_tx,
            phase: Arc::clone(&shared_phase),
            ui_tx: ui_tx.clone(),
        };

        let recorder = Self {
            config,
            platform,
            support,
            shared_phase,
            phase: Phase::Idle,
            session: None,
            last_session_id: None,
            next_generation: 0,
            artifact: None,
            events_tx,
            events_rx,
            intents_rx,
            ui_tx,
        };

        (recorder, handle)
    }

    /// Spawn the recorder loop on the current runtime.
    ///
    /// The returned receiver is subscribed before the loop starts, so it
    /// sees the initial control state.
    pub fn spawn(
        config: SessionConfig,
        platform: Platform,
    ) -> (RecorderHandle, broadcast::Receiver<UiUpdate>, JoinHandle<()>) {
        let (recorder, handle) = Self::new(config, platform);
        let updates = handle.subscribe();
        let task = tokio::spawn(recorder.run());
        (handle, updates, task)
    }

    /// Run until every handle has been dropped
    pub async fn run(mut self) {
        self.initialize();

        loop {
            let message = tokio::select! {
                biased;
                Some(event) = self.events_rx.recv() => Message::Event(event),
                intent = self.intents_rx.recv() => match intent {
                    Some(intent) => Message::Intent(intent),
                    None => break,
                },
            };
            self.dispatch(message);
        }

        if let Some(session) = self.session.take() {
            tracing::info!("Recorder shutting down, discarding session {}", session.id);
        }
        tracing::debug!("Recorder loop finished");
    }

    /// Publish the initial control state ("page load")
    fn initialize(&mut self) {
        match &self.support {
            Support::Supported => {
                self.emit(UiUpdate::StartEnabled(true));
                self.emit(UiUpdate::StopEnabled(false));
                self.emit(UiUpdate::DownloadEnabled(false));
            }
            Support::Unsupported { reason } => {
                tracing::warn!(
                    "Screen recording not supported on this device ({:?}). Please use a desktop browser.",
                    reason
                );
                let error = RecorderError::CapabilityUnsupported(UNSUPPORTED_NOTICE.to_string());
                self.emit(UiUpdate::StartEnabled(false));
                self.emit(UiUpdate::StartLabel(UNSUPPORTED_LABEL.to_string()));
                self.emit(UiUpdate::StopEnabled(false));
                self.emit(UiUpdate::DownloadEnabled(false));
                self.notify(&error, false);
            }
        }
    }

    fn dispatch(&mut self, message: Message) {
        match message {
            Message::Intent(Intent::Start) => self.start(),
            Message::Intent(Intent::Stop) => self.stop(),
            Message::Intent(Intent::Download { reply }) => {
                let _ = reply.send(self.download());
            }
            Message::Intent(Intent::Snapshot { reply }) => {
                let _ = reply.send(self.snapshot());
            }
            Message::Event(event) => self.handle_event(event),
        }
    }

    fn start(&mut self) {
        if !self.support.is_supported() {
            tracing::debug!("Ignoring start: screen recording is not supported");
            return;
        }
        let Some(capture) = self.platform.capture.clone() else {
            return;
        };

        let was_counting = self.phase == Phase::Countdown;
        if let Some(previous) = self.session.take() {
            tracing::info!("Discarding session {} ({:?})", previous.id, self.phase);
        }
        if let Some(artifact) = self.artifact.take() {
            tracing::debug!("Discarding artifact {} ({} bytes)", artifact.id, artifact.len());
            self.emit(UiUpdate::DownloadEnabled(false));
        }
        if was_counting {
            self.emit(UiUpdate::CountdownHidden);
        }

        self.next_generation += 1;
        let session = Session::new(self.next_generation);
        tracing::info!("Starting session {}", session.id);
        self.last_session_id = Some(session.id);

        let generation = session.generation;
        self.session = Some(session);

        self.emit(UiUpdate::StartEnabled(false));
        self.emit(UiUpdate::StopEnabled(false));
        self.set_phase(Phase::Acquiring);

        let request = CaptureRequest::new(self.config.capture_audio);
        let ended = StreamEndNotifier::new(generation, self.events_tx.clone());
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = capture.request_capture(request, ended).await;
            if let Err(mpsc::error::SendError(SessionEvent::Acquired {
                result: Ok(stream),
                ..
            })) = tx.send(SessionEvent::Acquired { generation, result })
            {
                // Recorder is gone; nobody else will release this stream
                stream.stop_all_tracks();
            }
        });
    }

    fn stop(&mut self) {
        if self.phase != Phase::Recording {
            tracing::debug!("Ignoring stop in phase {:?}", self.phase);
            return;
        }
        self.finish_recording();
    }

    /// Signal the encoder to finalize and release the stream
    fn finish_recording(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        tracing::info!(
            "Stopping session {} after {} chunks",
            session.id,
            session.chunk_count()
        );
        session.stop_encoder();
        session.release_stream();

        self.emit(UiUpdate::StartEnabled(true));
        self.emit(UiUpdate::StopEnabled(false));
        self.set_phase(Phase::Finalizing);
    }

    fn download(&mut self) -> RecorderResult<Option<DownloadReceipt>> {
        let Some(artifact) = self.artifact.as_ref() else {
            tracing::debug!("Nothing to download");
            return Ok(None);
        };

        let offer = DownloadOffer::for_artifact(artifact, &self.config.file_prefix, Utc::now());
        match self.platform.downloads.save(&offer) {
            Ok(receipt) => {
                tracing::info!("Offered {} ({} bytes)", receipt.file_name, receipt.size);
                Ok(Some(receipt))
            }
            Err(e) => {
                tracing::error!("Failed to save {}: {}", offer.file_name, e);
                let error = RecorderError::from(e);
                self.notify(&error, true);
                Err(error)
            }
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            support: self.support.clone(),
            session_id: self
                .session
                .as_ref()
                .map(|s| s.id)
                .or(self.last_session_id),
            chunk_count: self.session.as_ref().map_or(0, |s| s.chunk_count()),
            stream_open: self.session.as_ref().is_some_and(|s| s.has_stream()),
            artifact_len: self.artifact.as_ref().map(|a| a.len()),
        }
    }

    fn handle_event(&mut self, event: SessionEvent) {
        let current = self.session.as_ref().map(|s| s.generation);
        if current != Some(event.generation()) {
            match event {
                SessionEvent::Acquired {
                    result: Ok(stream), ..
                } => {
                    tracing::debug!("Releasing stream {} from a superseded start", stream.id());
                    stream.stop_all_tracks();
                }
                other => tracing::debug!("Ignoring stale event {:?}", other),
            }
            return;
        }

        match event {
            SessionEvent::Acquired { result, .. } => match result {
                Ok(stream) => self.on_stream_granted(stream),
                Err(e) => self.abort(RecorderError::from(e)),
            },
            SessionEvent::Tick { count, .. } => {
                if self.phase == Phase::Countdown {
                    self.emit(UiUpdate::Countdown(count));
                }
            }
            SessionEvent::CountdownElapsed { .. } => {
                if self.phase == Phase::Countdown {
                    self.begin_recording();
                }
            }
            SessionEvent::Chunk { data, .. } => self.on_chunk(data),
            SessionEvent::EncoderStopped { .. } => self.on_encoder_stopped(),
            SessionEvent::EncoderFailed { error, .. } => {
                if matches!(self.phase, Phase::Recording | Phase::Finalizing) {
                    self.abort(RecorderError::from(error));
                }
            }
            SessionEvent::StreamEnded { .. } => self.on_stream_ended(),
        }
    }

    fn on_stream_granted(&mut self, stream: SharedStream) {
        let Some(session) = self.session.as_mut() else {
            stream.stop_all_tracks();
            return;
        };
        if self.phase != Phase::Acquiring {
            tracing::debug!("Unexpected stream grant in phase {:?}", self.phase);
            stream.stop_all_tracks();
            return;
        }

        let generation = session.generation;
        session.attach_stream(stream);
        self.set_phase(Phase::Countdown);

        let from = self.config.countdown_from;
        if from == 0 {
            self.begin_recording();
            return;
        }

        self.emit(UiUpdate::Countdown(from));
        let timer = self.spawn_countdown(generation);
        if let Some(session) = self.session.as_mut() {
            session.set_countdown(timer);
        }
    }

    /// Schedule the remaining ticks (from-1 ... 1) and the final elapse
    fn spawn_countdown(&self, generation: u64) -> JoinHandle<()> {
        let tx = self.events_tx.clone();
        let from = self.config.countdown_from;
        let interval = self.config.tick_interval();

        tokio::spawn(async move {
            for count in (1..from).rev() {
                tokio::time::sleep(interval).await;
                if tx.send(SessionEvent::Tick { generation, count }).is_err() {
                    return;
                }
            }
            tokio::time::sleep(interval).await;
            let _ = tx.send(SessionEvent::CountdownElapsed { generation });
        })
    }

    fn begin_recording(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.cancel_countdown();

        let encoder = match self.platform.encoders.create(self.config.format) {
            Ok(encoder) => encoder,
            Err(e) => return self.abort(RecorderError::from(e)),
        };

        let Some(session) = self.session.as_mut() else {
            return;
        };
        let sink = EncoderSink::new(session.generation, self.events_tx.clone());
        if let Err(e) = session.start_encoder(encoder, sink) {
            return self.abort(RecorderError::from(e));
        }

        let stream_id = session
            .stream()
            .map(|s| s.id().to_string())
            .unwrap_or_default();
        tracing::info!("Session {} recording stream {}", session.id, stream_id);

        if self.config.countdown_from > 0 {
            self.emit(UiUpdate::CountdownHidden);
        }
        self.emit(UiUpdate::Preview(PreviewSource::Stream { stream_id }));
        self.emit(UiUpdate::StopEnabled(true));
        self.set_phase(Phase::Recording);
    }

    fn on_chunk(&mut self, data: Vec<u8>) {
        if !matches!(self.phase, Phase::Recording | Phase::Finalizing) {
            tracing::debug!("Dropping chunk received in phase {:?}", self.phase);
            return;
        }
        if let Some(session) = self.session.as_mut() {
            if !session.push_chunk(data) {
                tracing::trace!("Dropped empty chunk");
            }
        }
    }

    fn on_encoder_stopped(&mut self) {
        match self.phase {
            Phase::Finalizing => {}
            Phase::Recording => {
                // Encoder ended on its own; treat as a stop
                tracing::info!("Encoder stopped without a stop request");
                if let Some(session) = self.session.as_mut() {
                    session.encoder_finished();
                }
                self.finish_recording();
            }
            other => {
                tracing::debug!("Ignoring encoder stop in phase {:?}", other);
                return;
            }
        }

        let Some(mut session) = self.session.take() else {
            return;
        };
        session.encoder_finished();
        let artifact = session.assemble(self.config.format);
        tracing::info!(
            "Session {} finalized: {} bytes ({})",
            session.id,
            artifact.len(),
            artifact.format.mime_type()
        );
        drop(session);

        let url = artifact.object_url();
        self.artifact = Some(artifact);

        self.emit(UiUpdate::Preview(PreviewSource::Artifact {
            url,
            controls: true,
        }));
        self.emit(UiUpdate::DownloadEnabled(true));
        self.set_phase(Phase::Stopped);
    }

    fn on_stream_ended(&mut self) {
        match self.phase {
            Phase::Countdown => self.abort(RecorderError::MidSessionAbort(
                "capture stream ended before recording started".to_string(),
            )),
            Phase::Recording => {
                tracing::info!("Capture stream ended, finalizing recording");
                self.finish_recording();
            }
            other => tracing::debug!("Ignoring stream end in phase {:?}", other),
        }
    }

    /// Drop the session, put controls back to idle and tell the user
    fn abort(&mut self, error: RecorderError) {
        let was_counting = self.phase == Phase::Countdown;
        if let Some(session) = self.session.take() {
            tracing::warn!("Session {} aborted: {}", session.id, error);
        }

        if was_counting {
            self.emit(UiUpdate::CountdownHidden);
        }
        self.emit(UiUpdate::StartEnabled(true));
        self.emit(UiUpdate::StopEnabled(false));
        self.notify(&error, true);
        self.set_phase(Phase::Aborted);
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase == phase {
            return;
        }
        tracing::debug!("Phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
        *self.shared_phase.write() = phase;
        self.emit(UiUpdate::PhaseChanged(phase));
    }

    fn notify(&self, error: &RecorderError, blocking: bool) {
        self.emit(UiUpdate::Notice(Notice {
            blocking,
            error: ErrorResponse::from(error),
        }));
    }

    fn emit(&self, update: UiUpdate) {
        let _ = self.ui_tx.send(update);
    }
}

impl RecorderHandle {
    /// Begin a new session, discarding any previous one
    pub fn start(&self) -> RecorderResult<()> {
        self.send(Intent::Start)
    }

    /// Stop the running recording
    pub fn stop(&self) -> RecorderResult<()> {
        self.send(Intent::Stop)
    }

    /// Offer the last artifact for download. `Ok(None)` if there is none.
    pub async fn download(&self) -> RecorderResult<Option<DownloadReceipt>> {
        let (reply, rx) = oneshot::channel();
        self.send(Intent::Download { reply })?;
        rx.await.map_err(|_| RecorderError::Closed)?
    }

    /// State after every intent sent so far has been handled
    pub async fn snapshot(&self) -> RecorderResult<SessionSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(Intent::Snapshot { reply })?;
        rx.await.map_err(|_| RecorderError::Closed)
    }

    /// Last published phase
    pub fn phase(&self) -> Phase {
        *self.phase.read()
    }

    /// Subscribe to UI updates
    pub fn subscribe(&self) -> broadcast::Receiver<UiUpdate> {
        self.ui_tx.subscribe()
    }

    fn send(&self, intent: Intent) -> RecorderResult<()> {
        self.intents.send(intent).map_err(|_| RecorderError::Closed)
    }
}
