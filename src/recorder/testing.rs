//! Fake collaborators for tests

use super::coordinator::Platform;
use super::events::UiUpdate;
use crate::capture::{
    CaptureError, CaptureProvider, CaptureRequest, DeviceClass, MediaStream, Probe, SharedStream,
    StreamEndNotifier, TrackInfo, TrackKind,
};
use crate::download::{DownloadError, DownloadOffer, DownloadReceipt, DownloadSurface};
use crate::encoder::{ContainerFormat, Encoder, EncoderError, EncoderFactory, EncoderSink};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

#[derive(Debug)]
pub struct FakeStream {
    id: String,
    audio: bool,
    stopped: AtomicBool,
    stop_calls: AtomicUsize,
}

impl FakeStream {
    pub fn new(id: &str, audio: bool) -> Self {
        Self {
            id: id.to_string(),
            audio,
            stopped: AtomicBool::new(false),
            stop_calls: AtomicUsize::new(0),
        }
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

impl MediaStream for FakeStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn tracks(&self) -> Vec<TrackInfo> {
        let live = !self.stopped.load(Ordering::SeqCst);
        let mut tracks = vec![TrackInfo {
            kind: TrackKind::Video,
            label: "screen".to_string(),
            live,
        }];
        if self.audio {
            tracks.push(TrackInfo {
                kind: TrackKind::Audio,
                label: "tab audio".to_string(),
                live,
            });
        }
        tracks
    }

    fn stop_all_tracks(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            self.stop_calls.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// How the fake provider answers one request
pub enum Outcome {
    Grant,
    Deny(CaptureError),
    /// Prompt never answered
    Hang,
    /// Granted after a delay
    Delayed(Duration),
}

pub struct FakeCapture {
    probe: Probe,
    outcomes: Mutex<VecDeque<Outcome>>,
    streams: Mutex<Vec<Arc<FakeStream>>>,
    notifiers: Mutex<Vec<StreamEndNotifier>>,
    requests: Mutex<Vec<CaptureRequest>>,
}

impl FakeCapture {
    pub fn new() -> Self {
        Self {
            probe: Probe::Unknown,
            outcomes: Mutex::new(VecDeque::new()),
            streams: Mutex::new(Vec::new()),
            notifiers: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_probe(mut self, probe: Probe) -> Self {
        self.probe = probe;
        self
    }

    /// Queue an answer; requests without a queued answer are granted
    pub fn push_outcome(&self, outcome: Outcome) {
        self.outcomes.lock().push_back(outcome);
    }

    /// Streams handed out so far, in request order
    pub fn streams(&self) -> Vec<Arc<FakeStream>> {
        self.streams.lock().clone()
    }

    pub fn live_streams(&self) -> usize {
        self.streams.lock().iter().filter(|s| s.is_live()).count()
    }

    pub fn requests(&self) -> Vec<CaptureRequest> {
        self.requests.lock().clone()
    }

    /// Simulate the user ending the share of request `index`
    pub fn end_stream(&self, index: usize) {
        self.streams.lock()[index].stop_all_tracks();
        self.notifiers.lock()[index].ended();
    }
}

#[async_trait]
impl CaptureProvider for FakeCapture {
    fn probe(&self) -> Probe {
        self.probe.clone()
    }

    async fn request_capture(
        &self,
        request: CaptureRequest,
        ended: StreamEndNotifier,
    ) -> Result<SharedStream, CaptureError> {
        let outcome = self.outcomes.lock().pop_front().unwrap_or(Outcome::Grant);
        let stream = {
            let mut requests = self.requests.lock();
            requests.push(request);
            Arc::new(FakeStream::new(&format!("stream-{}", requests.len()), request.audio))
        };

        match outcome {
            Outcome::Deny(e) => return Err(e),
            Outcome::Hang => std::future::pending::<()>().await,
            Outcome::Delayed(delay) => tokio::time::sleep(delay).await,
            Outcome::Grant => {}
        }

        self.streams.lock().push(Arc::clone(&stream));
        self.notifiers.lock().push(ended);
        Ok(stream)
    }
}

/// Test-side control of one created encoder
pub struct EncoderControl {
    sink: Mutex<Option<EncoderSink>>,
    stream_id: Mutex<Option<String>>,
    stop_requested: AtomicBool,
    defer_stopped: bool,
    tail: Vec<Vec<u8>>,
}

impl EncoderControl {
    /// Deliver a segment as the encoder would
    pub fn emit(&self, data: &[u8]) {
        if let Some(sink) = self.sink.lock().as_ref() {
            sink.chunk(data.to_vec());
        }
    }

    /// Deliver the deferred "stopped" notification
    pub fn finish(&self) {
        if let Some(sink) = self.sink.lock().as_ref() {
            sink.stopped();
        }
    }

    pub fn fail(&self, message: &str) {
        if let Some(sink) = self.sink.lock().as_ref() {
            sink.failed(EncoderError::Failed(message.to_string()));
        }
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    pub fn stream_id(&self) -> Option<String> {
        self.stream_id.lock().clone()
    }
}

struct FakeEncoder {
    control: Arc<EncoderControl>,
}

impl Encoder for FakeEncoder {
    fn start(&mut self, stream: SharedStream, sink: EncoderSink) -> Result<(), EncoderError> {
        *self.control.stream_id.lock() = Some(stream.id().to_string());
        *self.control.sink.lock() = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        self.control.stop_requested.store(true, Ordering::SeqCst);
        if let Some(sink) = self.control.sink.lock().as_ref() {
            // In-flight segments arrive after the stop request
            for chunk in &self.control.tail {
                sink.chunk(chunk.clone());
            }
            if !self.control.defer_stopped {
                sink.stopped();
            }
        }
    }
}

pub struct FakeEncoders {
    created: Mutex<Vec<Arc<EncoderControl>>>,
    fail_create: AtomicBool,
    defer_stopped: AtomicBool,
    tail: Mutex<Vec<Vec<u8>>>,
}

impl FakeEncoders {
    pub fn new() -> Self {
        Self {
            created: Mutex::new(Vec::new()),
            fail_create: AtomicBool::new(false),
            defer_stopped: AtomicBool::new(false),
            tail: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_create(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }

    /// Encoders created from now on wait for `EncoderControl::finish`
    pub fn defer_stopped(&self) {
        self.defer_stopped.store(true, Ordering::SeqCst);
    }

    /// Segments every new encoder flushes when asked to stop
    pub fn set_tail(&self, tail: &[&[u8]]) {
        *self.tail.lock() = tail.iter().map(|c| c.to_vec()).collect();
    }

    pub fn created(&self) -> Vec<Arc<EncoderControl>> {
        self.created.lock().clone()
    }

    pub fn last(&self) -> Arc<EncoderControl> {
        self.created
            .lock()
            .last()
            .cloned()
            .expect("no encoder created")
    }
}

impl EncoderFactory for FakeEncoders {
    fn create(&self, format: ContainerFormat) -> Result<Box<dyn Encoder>, EncoderError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(EncoderError::UnsupportedFormat(format.mime_type().to_string()));
        }
        let control = Arc::new(EncoderControl {
            sink: Mutex::new(None),
            stream_id: Mutex::new(None),
            stop_requested: AtomicBool::new(false),
            defer_stopped: self.defer_stopped.load(Ordering::SeqCst),
            tail: self.tail.lock().clone(),
        });
        self.created.lock().push(Arc::clone(&control));
        Ok(Box::new(FakeEncoder { control }))
    }
}

pub struct FakeDownloads {
    offers: Mutex<Vec<DownloadOffer>>,
    fail: AtomicBool,
}

impl FakeDownloads {
    pub fn new() -> Self {
        Self {
            offers: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn offers(&self) -> Vec<DownloadOffer> {
        self.offers.lock().clone()
    }
}

impl DownloadSurface for FakeDownloads {
    fn save(&self, offer: &DownloadOffer) -> Result<DownloadReceipt, DownloadError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DownloadError::Rejected("quota exceeded".to_string()));
        }
        self.offers.lock().push(offer.clone());
        Ok(DownloadReceipt {
            file_name: offer.file_name.clone(),
            href: format!("blob:test/{}", offer.file_name),
            size: offer.bytes.len(),
        })
    }
}

/// Fakes wired into a `Platform`
pub struct Rig {
    pub capture: Arc<FakeCapture>,
    pub encoders: Arc<FakeEncoders>,
    pub downloads: Arc<FakeDownloads>,
}

impl Rig {
    pub fn new() -> Self {
        Self {
            capture: Arc::new(FakeCapture::new()),
            encoders: Arc::new(FakeEncoders::new()),
            downloads: Arc::new(FakeDownloads::new()),
        }
    }

    pub fn platform(&self) -> Platform {
        Platform {
            capture: Some(Arc::clone(&self.capture) as Arc<dyn CaptureProvider>),
            encoders: Arc::clone(&self.encoders) as Arc<dyn EncoderFactory>,
            downloads: Arc::clone(&self.downloads) as Arc<dyn DownloadSurface>,
            device: DeviceClass::Desktop,
        }
    }
}

/// Collect updates until one matches `pred`; fails after a minute of
/// (virtual) time.
pub async fn wait_for<F>(updates: &mut broadcast::Receiver<UiUpdate>, pred: F) -> Vec<UiUpdate>
where
    F: Fn(&UiUpdate) -> bool,
{
    let mut seen = Vec::new();
    let result = tokio::time::timeout(Duration::from_secs(60), async {
        loop {
            match updates.recv().await {
                Ok(update) => {
                    let done = pred(&update);
                    seen.push(update);
                    if done {
                        return;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    })
    .await;
    assert!(result.is_ok(), "timed out waiting for UI update, saw {:?}", seen);
    seen
}
