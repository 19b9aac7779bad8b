//! In-memory collaborators for driving a ConferenceClient in tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use rvoip_conference_core::{
    CameraStreamParameters, ChannelConfiguration, ChannelEventSink, ChannelSignal,
    ConferenceChannel, ConferenceClient, ConferenceClientConfig, ConferenceError,
    ConferenceInfo, ConferenceObserver, ConferenceResult, ConnectionStats,
    CustomizedStreamParameters, LocalStream, MediaFactory, MediaSource, Participant, RemoteStream,
    ScreenStreamParameters, SignalingChannel, SignalingObserver, Stream, SubscribeOptions,
    SubscribeTarget, VideoRenderer,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Shared, ordered record of everything observers and continuations saw
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().iter().filter(|e| e.as_str() == entry).count()
    }
}

// ===== SIGNALING =====

pub struct MockSignaling {
    snapshot: Mutex<Value>,
    connect_error: Mutex<Option<ConferenceError>>,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    observers: Mutex<Vec<Weak<dyn SignalingObserver>>>,
    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
    pub sent: Mutex<Vec<(String, String)>>,
}

impl MockSignaling {
    pub fn new(snapshot: Value) -> Arc<Self> {
        Arc::new(Self {
            snapshot: Mutex::new(snapshot),
            connect_error: Mutex::new(None),
            gate: Mutex::new(None),
            observers: Mutex::new(Vec::new()),
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        })
    }

    /// Hold the next connect until the returned sender fires
    pub fn hold_connect(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.gate.lock() = Some(rx);
        tx
    }

    pub fn fail_connect(&self, error: ConferenceError) {
        *self.connect_error.lock() = Some(error);
    }

    pub fn set_snapshot(&self, snapshot: Value) {
        *self.snapshot.lock() = snapshot;
    }

    /// Deliver a pushed event to every live observer
    pub fn emit(&self, event: impl Fn(&dyn SignalingObserver)) {
        let observers: Vec<_> = self.observers.lock().iter().filter_map(Weak::upgrade).collect();
        for observer in observers {
            event(observer.as_ref());
        }
    }
}

#[async_trait]
impl SignalingChannel for MockSignaling {
    async fn connect(&self, _token: &str) -> ConferenceResult<Value> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if let Some(error) = self.connect_error.lock().take() {
            return Err(error);
        }
        Ok(self.snapshot.lock().clone())
    }

    async fn disconnect(&self) -> ConferenceResult<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send_custom_message(&self, message: &str, receiver: &str) -> ConferenceResult<()> {
        self.sent.lock().push((message.to_owned(), receiver.to_owned()));
        Ok(())
    }

    fn add_observer(&self, observer: Weak<dyn SignalingObserver>) {
        let mut observers = self.observers.lock();
        if !observers.iter().any(|o| o.ptr_eq(&observer)) {
            observers.push(observer);
        }
    }
}

// ===== CHANNELS =====

pub struct MockChannel {
    pub config: ChannelConfiguration,
    events: Weak<dyn ChannelEventSink>,
    next_id: String,
    session_id: Mutex<Option<String>>,
    pub calls: Mutex<Vec<String>>,
    pub signals: Mutex<Vec<ChannelSignal>>,
    pub stream_errors: Mutex<Vec<String>>,
}

impl MockChannel {
    fn record(&self, call: &str) -> ConferenceResult<()> {
        self.calls.lock().push(call.to_owned());
        Ok(())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn report_failure(&self, stream_id: &str, error: ConferenceError) {
        if let Some(events) = self.events.upgrade() {
            events.on_stream_failed(stream_id, error);
        }
    }
}

#[async_trait]
impl ConferenceChannel for MockChannel {
    fn session_id(&self) -> Option<String> {
        self.session_id.lock().clone()
    }

    async fn publish(&self, stream: Arc<LocalStream>) -> ConferenceResult<String> {
        self.calls.lock().push("publish".to_owned());
        *self.session_id.lock() = Some(self.next_id.clone());
        if let Some(events) = self.events.upgrade() {
            events.on_stream_id(&self.next_id, stream.id());
        }
        Ok(self.next_id.clone())
    }

    async fn subscribe(
        &self,
        target: SubscribeTarget,
        _options: SubscribeOptions,
    ) -> ConferenceResult<String> {
        let variant = match &target {
            SubscribeTarget::Camera(_) => "camera",
            SubscribeTarget::Screen(_) => "screen",
            SubscribeTarget::Mixed(_) => "mixed",
        };
        self.calls.lock().push(format!("subscribe:{variant}"));
        *self.session_id.lock() = Some(self.next_id.clone());
        if let Some(events) = self.events.upgrade() {
            events.on_subscription_id(&self.next_id, target.stream().id());
        }
        Ok(self.next_id.clone())
    }

    async fn unpublish(&self, _session_id: &str) -> ConferenceResult<()> {
        self.record("unpublish")
    }

    async fn unsubscribe(&self, _session_id: &str) -> ConferenceResult<()> {
        self.record("unsubscribe")
    }

    async fn pause_audio(&self) -> ConferenceResult<()> {
        self.record("pause_audio")
    }

    async fn pause_video(&self) -> ConferenceResult<()> {
        self.record("pause_video")
    }

    async fn pause_audio_video(&self) -> ConferenceResult<()> {
        self.record("pause_audio_video")
    }

    async fn play_audio(&self) -> ConferenceResult<()> {
        self.record("play_audio")
    }

    async fn play_video(&self) -> ConferenceResult<()> {
        self.record("play_video")
    }

    async fn play_audio_video(&self) -> ConferenceResult<()> {
        self.record("play_audio_video")
    }

    async fn connection_stats(&self) -> ConferenceResult<ConnectionStats> {
        self.calls.lock().push("connection_stats".to_owned());
        let mut stats = ConnectionStats::new();
        stats.audio_packets_sent = 42;
        Ok(stats)
    }

    fn on_signaling_message(&self, signal: ChannelSignal) {
        self.signals.lock().push(signal);
    }

    fn on_stream_error(&self, message: &str) {
        self.stream_errors.lock().push(message.to_owned());
    }
}

// ===== MEDIA =====

pub struct MockMedia {
    pub audio: bool,
    pub video: bool,
}

impl MediaSource for MockMedia {
    fn has_audio(&self) -> bool {
        self.audio
    }
    fn has_video(&self) -> bool {
        self.video
    }
    fn set_audio_enabled(&self, _enabled: bool) {}
    fn set_video_enabled(&self, _enabled: bool) {}
    fn add_video_sink(&self, _renderer: Arc<dyn VideoRenderer>) {}
    fn remove_video_sink(&self, _renderer: &Arc<dyn VideoRenderer>) {}
}

#[derive(Default)]
pub struct MockFactory {
    pub channels: Mutex<Vec<Arc<MockChannel>>>,
}

impl MockFactory {
    pub fn channel(&self, index: usize) -> Arc<MockChannel> {
        self.channels.lock()[index].clone()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.lock().len()
    }
}

impl MediaFactory for MockFactory {
    fn create_camera_source(
        &self,
        params: &CameraStreamParameters,
    ) -> ConferenceResult<Arc<dyn MediaSource>> {
        Ok(Arc::new(MockMedia {
            audio: params.audio_enabled,
            video: params.video_enabled,
        }))
    }

    fn create_screen_source(
        &self,
        params: &ScreenStreamParameters,
    ) -> ConferenceResult<Arc<dyn MediaSource>> {
        Ok(Arc::new(MockMedia {
            audio: params.audio_enabled,
            video: true,
        }))
    }

    fn create_customized_source(
        &self,
        params: &CustomizedStreamParameters,
    ) -> ConferenceResult<Arc<dyn MediaSource>> {
        Ok(Arc::new(MockMedia {
            audio: params.audio_enabled,
            video: params.video_enabled,
        }))
    }

    fn create_channel(
        &self,
        config: ChannelConfiguration,
        events: Weak<dyn ChannelEventSink>,
    ) -> Arc<dyn ConferenceChannel> {
        let mut channels = self.channels.lock();
        let channel = Arc::new(MockChannel {
            config,
            events,
            next_id: format!("session-{}", channels.len() + 1),
            session_id: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            signals: Mutex::new(Vec::new()),
            stream_errors: Mutex::new(Vec::new()),
        });
        channels.push(channel.clone());
        channel
    }
}

// ===== OBSERVER =====

pub struct RecordingObserver {
    log: EventLog,
}

impl RecordingObserver {
    pub fn new(log: EventLog) -> Arc<Self> {
        Arc::new(Self { log })
    }
}

#[async_trait]
impl ConferenceObserver for RecordingObserver {
    async fn on_participant_joined(&self, participant: Arc<Participant>) {
        self.log.push(format!("participant_joined:{}", participant.id()));
    }

    async fn on_stream_added(&self, stream: Arc<RemoteStream>) {
        self.log.push(format!("stream_added:{}", stream.id()));
    }

    async fn on_stream_error(&self, stream_id: String, _error: ConferenceError) {
        self.log.push(format!("stream_error:{stream_id}"));
    }

    async fn on_message_received(&self, from: String, message: String) {
        self.log.push(format!("message:{from}:{message}"));
    }

    async fn on_server_disconnected(&self) {
        self.log.push("server_disconnected");
    }
}

// ===== FIXTURES =====

pub fn participant(id: &str, user: &str) -> Value {
    json!({ "id": id, "user": user, "role": "presenter" })
}

pub fn camera_stream(id: &str, owner: &str) -> Value {
    json!({
        "id": id,
        "type": "forward",
        "info": { "owner": owner, "attributes": { "a": "1", "b": "2" } },
        "media": {
            "audio": { "source": "mic", "format": { "codec": "opus", "sampleRate": 48000, "channelNum": 2 } },
            "video": { "source": "camera", "format": { "codec": "vp8" } }
        }
    })
}

pub fn mixed_stream(id: &str) -> Value {
    json!({
        "id": id,
        "type": "mixed",
        "info": { "label": "common" },
        "media": {
            "audio": { "format": { "codec": "opus" } },
            "video": { "format": { "codec": "h264", "profile": "CB" } }
        }
    })
}

/// Join response: the local participant plus one remote participant
/// publishing one camera stream
pub fn room_snapshot() -> Value {
    json!({
        "id": "me",
        "user": "alice",
        "role": "presenter",
        "room": {
            "participants": [ participant("me", "alice"), participant("p1", "bob") ],
            "streams": [ camera_stream("s1", "p1") ]
        }
    })
}

/// Continuation that forwards its result into a oneshot receiver
pub fn capture<T: Send + 'static>() -> (
    impl FnOnce(ConferenceResult<T>) + Send + 'static,
    oneshot::Receiver<ConferenceResult<T>>,
) {
    let (tx, rx) = oneshot::channel();
    (
        move |result| {
            let _ = tx.send(result);
        },
        rx,
    )
}

pub struct Harness {
    pub client: Arc<ConferenceClient>,
    pub signaling: Arc<MockSignaling>,
    pub factory: Arc<MockFactory>,
    pub log: EventLog,
}

impl Harness {
    pub fn new(snapshot: Value) -> Self {
        init_tracing();
        let signaling = MockSignaling::new(snapshot);
        let factory = Arc::new(MockFactory::default());
        let client = ConferenceClient::new(
            ConferenceClientConfig::default(),
            signaling.clone(),
            factory.clone(),
        );
        let log = EventLog::default();
        client.add_observer(RecordingObserver::new(log.clone()));
        Self {
            client,
            signaling,
            factory,
            log,
        }
    }

    /// Harness already joined to [`room_snapshot`]
    pub async fn joined() -> Self {
        let harness = Self::new(room_snapshot());
        harness.join().await.expect("join failed");
        harness
    }

    pub async fn join(&self) -> ConferenceResult<Arc<ConferenceInfo>> {
        let (on_done, rx) = capture();
        self.client.join("dG9rZW4=", on_done);
        rx.await.expect("join continuation dropped")
    }

    pub async fn flush(&self) {
        self.client.event_queue().flush().await;
    }
}
