//! Local and remote streams
//!
//! Both kinds share a [`StreamCore`] header: id, source tags, ended flag, the
//! stream's own observers and the media attached to it. What differs is the
//! variant payload:
//!
//! - [`LocalStream`] carries the capture parameters it was created from
//!   ([`LocalStreamKind`]).
//! - [`RemoteStream`] carries the signaling metadata parsed from the server:
//!   origin, capabilities, active settings and attributes ([`RemoteStreamKind`]).
//!
//! Behaviour that depends on the variant matches on the tag rather than on
//! overridden methods.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::dispatch::EventQueue;
use crate::error::{ConferenceError, ConferenceResult};
use crate::events::StreamObserver;
use crate::media::{PublicationSettings, Resolution, SubscriptionCapabilities};
use crate::observer::ObserverRegistry;
use crate::transport::{MediaFactory, MediaSource, VideoRenderer};

/// Where a stream's audio comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AudioSourceInfo {
    #[default]
    Unknown,
    Mic,
    ScreenCast,
    File,
    Mixed,
}

impl AudioSourceInfo {
    /// Map a wire source name; unrecognized names map to `Unknown`
    pub fn from_wire(name: &str) -> Self {
        match name {
            "mic" => Self::Mic,
            "screen-cast" => Self::ScreenCast,
            "raw-file" | "encoded-file" => Self::File,
            "mcu" => Self::Mixed,
            _ => Self::Unknown,
        }
    }
}

/// Where a stream's video comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VideoSourceInfo {
    #[default]
    Unknown,
    Camera,
    ScreenCast,
    File,
    Mixed,
}

impl VideoSourceInfo {
    pub fn from_wire(name: &str) -> Self {
        match name {
            "camera" => Self::Camera,
            "screen-cast" => Self::ScreenCast,
            "raw-file" | "encoded-file" => Self::File,
            "mcu" => Self::Mixed,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StreamSourceInfo {
    pub audio: AudioSourceInfo,
    pub video: VideoSourceInfo,
}

impl StreamSourceInfo {
    pub fn new(audio: AudioSourceInfo, video: VideoSourceInfo) -> Self {
        Self { audio, video }
    }
}

/// Fields common to every stream
pub struct StreamCore {
    id: String,
    source: StreamSourceInfo,
    ended: AtomicBool,
    observers: ObserverRegistry<dyn StreamObserver>,
    media: RwLock<Option<Arc<dyn MediaSource>>>,
    renderer: Mutex<Option<Arc<dyn VideoRenderer>>>,
}

impl StreamCore {
    fn new(
        id: impl Into<String>,
        source: StreamSourceInfo,
        media: Option<Arc<dyn MediaSource>>,
    ) -> Self {
        Self {
            id: id.into(),
            source,
            ended: AtomicBool::new(false),
            observers: ObserverRegistry::new(),
            media: RwLock::new(media),
            renderer: Mutex::new(None),
        }
    }

    fn media_source(&self) -> Option<Arc<dyn MediaSource>> {
        self.media.read().clone()
    }

    fn trigger_on_ended(&self, queue: &EventQueue) {
        self.ended.store(true, Ordering::SeqCst);
        for observer in self.observers.snapshot() {
            queue.post(async move { observer.on_ended().await });
        }
    }
}

impl std::fmt::Debug for StreamCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamCore")
            .field("id", &self.id)
            .field("source", &self.source)
            .field("ended", &self.ended.load(Ordering::SeqCst))
            .field("observers", &self.observers)
            .field("has_media", &self.media.read().is_some())
            .finish()
    }
}

/// Behaviour shared by local and remote streams
pub trait Stream {
    fn core(&self) -> &StreamCore;

    /// Whether frames of this stream can be handed to a renderer
    fn renderable(&self) -> bool {
        true
    }

    fn id(&self) -> &str {
        &self.core().id
    }

    fn source(&self) -> StreamSourceInfo {
        self.core().source
    }

    fn ended(&self) -> bool {
        self.core().ended.load(Ordering::SeqCst)
    }

    fn add_observer(&self, observer: Arc<dyn StreamObserver>) {
        self.core().observers.add(observer);
    }

    fn remove_observer(&self, observer: &Arc<dyn StreamObserver>) {
        self.core().observers.remove(observer);
    }

    fn media_source(&self) -> Option<Arc<dyn MediaSource>> {
        self.core().media_source()
    }

    /// Render the first video track into `renderer`, replacing any renderer
    /// attached before. Streams without video are logged and left untouched.
    fn attach_video_renderer(&self, renderer: Arc<dyn VideoRenderer>) {
        let core = self.core();
        if !self.renderable() {
            error!(stream_id = %core.id, "Not attaching renderer to encoded stream");
            return;
        }
        let Some(media) = core.media_source() else {
            error!(stream_id = %core.id, "Cannot attach a stream without media to a renderer");
            return;
        };
        if !media.has_video() {
            error!(stream_id = %core.id, "Attach failed because of no video tracks");
            return;
        }
        let previous = core.renderer.lock().replace(renderer.clone());
        if let Some(previous) = previous {
            media.remove_video_sink(&previous);
        }
        media.add_video_sink(renderer);
        info!(stream_id = %core.id, "Attached the stream to a renderer");
    }

    fn detach_video_renderer(&self) {
        let core = self.core();
        if !self.renderable() {
            error!(stream_id = %core.id, "Not detaching renderer from encoded stream");
            return;
        }
        let Some(renderer) = core.renderer.lock().take() else {
            return;
        };
        if let Some(media) = core.media_source() {
            media.remove_video_sink(&renderer);
        }
    }

    fn enable_audio(&self) {
        if let Some(media) = self.core().media_source() {
            media.set_audio_enabled(true);
        }
    }

    fn disable_audio(&self) {
        if let Some(media) = self.core().media_source() {
            media.set_audio_enabled(false);
        }
    }

    fn enable_video(&self) {
        if let Some(media) = self.core().media_source() {
            media.set_video_enabled(true);
        }
    }

    fn disable_video(&self) {
        if let Some(media) = self.core().media_source() {
            media.set_video_enabled(false);
        }
    }
}

// ===== LOCAL STREAMS =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraStreamParameters {
    pub audio_enabled: bool,
    pub video_enabled: bool,
    /// Device id of the camera; empty selects the default device
    pub camera_id: String,
    pub resolution: Resolution,
    pub fps: u32,
}

impl CameraStreamParameters {
    pub fn new(audio_enabled: bool, video_enabled: bool) -> Self {
        Self {
            audio_enabled,
            video_enabled,
            camera_id: String::new(),
            resolution: Resolution::new(640, 480),
            fps: 30,
        }
    }

    pub fn with_camera(mut self, camera_id: impl Into<String>) -> Self {
        self.camera_id = camera_id.into();
        self
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = Resolution::new(width, height);
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DesktopSourceType {
    FullScreen,
    Application,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenStreamParameters {
    pub audio_enabled: bool,
    pub video_enabled: bool,
    pub source_type: DesktopSourceType,
    pub fps: u32,
}

impl ScreenStreamParameters {
    pub fn new(audio_enabled: bool, video_enabled: bool, source_type: DesktopSourceType) -> Self {
        Self {
            audio_enabled,
            video_enabled,
            source_type,
            fps: 15,
        }
    }
}

/// Frames supplied by the application, raw or already encoded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomizedStreamParameters {
    pub audio_enabled: bool,
    pub video_enabled: bool,
    pub resolution: Resolution,
    pub fps: u32,
    pub bitrate_kbps: u32,
    /// Frames arrive encoded and bypass the local encoder
    pub encoded: bool,
}

impl CustomizedStreamParameters {
    pub fn new(audio_enabled: bool, video_enabled: bool) -> Self {
        Self {
            audio_enabled,
            video_enabled,
            resolution: Resolution::new(640, 480),
            fps: 30,
            bitrate_kbps: 0,
            encoded: false,
        }
    }

    pub fn encoded(mut self, bitrate_kbps: u32) -> Self {
        self.encoded = true;
        self.bitrate_kbps = bitrate_kbps;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocalStreamKind {
    Camera(CameraStreamParameters),
    Screen(ScreenStreamParameters),
    Customized(CustomizedStreamParameters),
}

/// Stream captured on this device and owned by the caller
#[derive(Debug)]
pub struct LocalStream {
    core: StreamCore,
    kind: LocalStreamKind,
}

impl LocalStream {
    /// Open a camera and/or microphone. At least one track must be enabled.
    pub fn camera(
        factory: &dyn MediaFactory,
        params: CameraStreamParameters,
    ) -> ConferenceResult<Arc<Self>> {
        if !params.audio_enabled && !params.video_enabled {
            error!("Cannot create a camera stream without audio and video");
            return Err(ConferenceError::invalid_argument(
                "camera stream needs audio or video enabled",
            ));
        }
        let media = factory.create_camera_source(&params)?;
        let source = StreamSourceInfo::new(AudioSourceInfo::Mic, VideoSourceInfo::Camera);
        Ok(Self::with_media(media, source, LocalStreamKind::Camera(params)))
    }

    /// Capture a screen or an application window
    pub fn screen(
        factory: &dyn MediaFactory,
        params: ScreenStreamParameters,
    ) -> ConferenceResult<Arc<Self>> {
        if !params.audio_enabled && !params.video_enabled {
            warn!("Creating screen stream without video and audio");
        }
        let media = factory.create_screen_source(&params)?;
        let source = StreamSourceInfo::new(AudioSourceInfo::Unknown, VideoSourceInfo::ScreenCast);
        Ok(Self::with_media(media, source, LocalStreamKind::Screen(params)))
    }

    /// Stream frames produced by the application
    pub fn customized(
        factory: &dyn MediaFactory,
        params: CustomizedStreamParameters,
    ) -> ConferenceResult<Arc<Self>> {
        if !params.audio_enabled && !params.video_enabled {
            warn!("Creating customized stream without video and audio");
        }
        let media = factory.create_customized_source(&params)?;
        Ok(Self::with_media(
            media,
            StreamSourceInfo::default(),
            LocalStreamKind::Customized(params),
        ))
    }

    fn with_media(
        media: Arc<dyn MediaSource>,
        source: StreamSourceInfo,
        kind: LocalStreamKind,
    ) -> Arc<Self> {
        let id = format!("MediaStream-{}", uuid::Uuid::new_v4());
        Arc::new(Self {
            core: StreamCore::new(id, source, Some(media)),
            kind,
        })
    }

    pub fn kind(&self) -> &LocalStreamKind {
        &self.kind
    }

    /// Encoded customized streams cannot be rendered locally
    pub fn is_encoded(&self) -> bool {
        matches!(&self.kind, LocalStreamKind::Customized(p) if p.encoded && p.video_enabled)
    }

    /// Detach any renderer and release the capture source
    pub fn close(&self) {
        self.detach_video_renderer();
        if self.core.media.write().take().is_some() {
            info!(stream_id = %self.core.id, "Closed local stream");
        }
    }
}

impl Stream for LocalStream {
    fn core(&self) -> &StreamCore {
        &self.core
    }

    fn renderable(&self) -> bool {
        !self.is_encoded()
    }
}

// ===== REMOTE STREAMS =====

/// Variant recorded when a remote stream is advertised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemoteStreamType {
    Camera,
    Screen,
    Mixed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStreamKind {
    Camera,
    Screen,
    /// Composed by the server; `view` names the layout it renders
    Mixed { view: String },
}

impl RemoteStreamKind {
    pub fn stream_type(&self) -> RemoteStreamType {
        match self {
            Self::Camera => RemoteStreamType::Camera,
            Self::Screen => RemoteStreamType::Screen,
            Self::Mixed { .. } => RemoteStreamType::Mixed,
        }
    }
}

/// Origin id of streams composed by the server
pub const MIXED_STREAM_ORIGIN: &str = "mcu";

/// Stream advertised by the conference server
#[derive(Debug)]
pub struct RemoteStream {
    core: StreamCore,
    origin: String,
    kind: RemoteStreamKind,
    subscription_capabilities: SubscriptionCapabilities,
    publication_settings: PublicationSettings,
    attributes: HashMap<String, String>,
    has_audio: bool,
    has_video: bool,
}

impl RemoteStream {
    pub(crate) fn new(
        id: impl Into<String>,
        origin: impl Into<String>,
        kind: RemoteStreamKind,
        source: StreamSourceInfo,
        subscription_capabilities: SubscriptionCapabilities,
        publication_settings: PublicationSettings,
    ) -> Self {
        Self {
            core: StreamCore::new(id, source, None),
            origin: origin.into(),
            kind,
            subscription_capabilities,
            publication_settings,
            attributes: HashMap::new(),
            has_audio: false,
            has_video: false,
        }
    }

    pub(crate) fn with_tracks(mut self, has_audio: bool, has_video: bool) -> Self {
        self.has_audio = has_audio;
        self.has_video = has_video;
        self
    }

    pub(crate) fn with_attributes(mut self, attributes: HashMap<String, String>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Participant id of the publisher, or [`MIXED_STREAM_ORIGIN`]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn kind(&self) -> &RemoteStreamKind {
        &self.kind
    }

    pub fn stream_type(&self) -> RemoteStreamType {
        self.kind.stream_type()
    }

    /// Layout label of a mixed stream
    pub fn view(&self) -> Option<&str> {
        match &self.kind {
            RemoteStreamKind::Mixed { view } => Some(view),
            _ => None,
        }
    }

    pub fn subscription_capabilities(&self) -> &SubscriptionCapabilities {
        &self.subscription_capabilities
    }

    pub fn publication_settings(&self) -> &PublicationSettings {
        &self.publication_settings
    }

    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    pub fn has_audio(&self) -> bool {
        self.has_audio
    }

    pub fn has_video(&self) -> bool {
        self.has_video
    }

    /// Attach the media received for a subscription
    pub fn set_media_source(&self, media: Arc<dyn MediaSource>) {
        *self.core.media.write() = Some(media);
    }

    pub(crate) fn trigger_on_ended(&self, queue: &EventQueue) {
        self.core.trigger_on_ended(queue);
    }

    pub(crate) fn trigger_on_video_layout_changed(&self, queue: &EventQueue) {
        for observer in self.core.observers.snapshot() {
            queue.post(async move { observer.on_video_layout_changed().await });
        }
    }
}

impl Stream for RemoteStream {
    fn core(&self) -> &StreamCore {
        &self.core
    }
}
