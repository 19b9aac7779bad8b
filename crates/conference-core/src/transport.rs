//! Contracts of the external collaborators the client drives
//!
//! The client never touches sockets, peer connections or capture devices
//! itself. It talks to:
//!
//! - a [`SignalingChannel`] that connects to the conference server and pushes
//!   room events back through [`SignalingObserver`],
//! - one [`ConferenceChannel`] per publish or subscribe session, created by the
//!   [`MediaFactory`] and reporting back through [`ChannelEventSink`],
//! - [`MediaSource`]s wrapped by local and subscribed remote streams.
//!
//! The factory is handed to the client at construction and lives exactly as
//! long as the client does.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use serde_json::Value;

use crate::client::config::ChannelConfiguration;
use crate::client::types::{ConnectionStats, SubscribeOptions};
use crate::error::{ConferenceError, ConferenceResult};
use crate::stream::{
    CameraStreamParameters, CustomizedStreamParameters, LocalStream, RemoteStream,
    ScreenStreamParameters, Stream,
};

/// Connection to the conference server
#[async_trait]
pub trait SignalingChannel: Send + Sync {
    /// Connect and authenticate; resolves to the room snapshot
    async fn connect(&self, token: &str) -> ConferenceResult<Value>;

    async fn disconnect(&self) -> ConferenceResult<()>;

    /// Send a text message; an empty receiver addresses every participant
    async fn send_custom_message(&self, message: &str, receiver: &str) -> ConferenceResult<()>;

    /// Register for pushed room events. Registering the same observer again
    /// must not duplicate deliveries.
    fn add_observer(&self, observer: Weak<dyn SignalingObserver>);
}

/// Room events pushed by the [`SignalingChannel`], in untyped wire form
pub trait SignalingObserver: Send + Sync {
    fn on_stream_added(&self, stream: Value);
    fn on_stream_removed(&self, stream: Value);
    fn on_stream_updated(&self, stream: Value);
    fn on_stream_error(&self, stream: Value);
    fn on_user_joined(&self, user: Value);
    fn on_user_left(&self, user: Value);
    fn on_signaling_message(&self, message: Value);
    fn on_custom_message(&self, from: String, message: String);
    fn on_server_disconnected(&self);
}

/// Negotiation traffic forwarded to a channel
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelSignal {
    /// Server finished setting up the session
    Ready,
    /// Server gave up on the session
    Failed,
    /// Offer, answer or candidate payload
    Negotiation(Value),
}

/// Remote stream to subscribe, tagged with the variant recorded when the
/// stream was advertised
#[derive(Clone)]
pub enum SubscribeTarget {
    Camera(Arc<RemoteStream>),
    Screen(Arc<RemoteStream>),
    Mixed(Arc<RemoteStream>),
}

impl SubscribeTarget {
    pub fn stream(&self) -> &Arc<RemoteStream> {
        match self {
            Self::Camera(s) | Self::Screen(s) | Self::Mixed(s) => s,
        }
    }
}

impl std::fmt::Debug for SubscribeTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let variant = match self {
            Self::Camera(_) => "Camera",
            Self::Screen(_) => "Screen",
            Self::Mixed(_) => "Mixed",
        };
        write!(f, "{}({})", variant, self.stream().id())
    }
}

/// One publish or subscribe media session
#[async_trait]
pub trait ConferenceChannel: Send + Sync {
    /// Session id, known once publish or subscribe has been accepted
    fn session_id(&self) -> Option<String>;

    async fn publish(&self, stream: Arc<LocalStream>) -> ConferenceResult<String>;
    async fn subscribe(
        &self,
        target: SubscribeTarget,
        options: SubscribeOptions,
    ) -> ConferenceResult<String>;
    async fn unpublish(&self, session_id: &str) -> ConferenceResult<()>;
    async fn unsubscribe(&self, session_id: &str) -> ConferenceResult<()>;

    async fn pause_audio(&self) -> ConferenceResult<()>;
    async fn pause_video(&self) -> ConferenceResult<()>;
    async fn pause_audio_video(&self) -> ConferenceResult<()>;
    async fn play_audio(&self) -> ConferenceResult<()>;
    async fn play_video(&self) -> ConferenceResult<()>;
    async fn play_audio_video(&self) -> ConferenceResult<()>;

    async fn connection_stats(&self) -> ConferenceResult<ConnectionStats>;

    fn on_signaling_message(&self, signal: ChannelSignal);
    fn on_stream_error(&self, message: &str);
}

/// What a channel reports back to the client that created it
pub trait ChannelEventSink: Send + Sync {
    /// A publication was assigned `session_id` for the local stream `label`
    fn on_stream_id(&self, session_id: &str, label: &str);

    /// A subscription was assigned `subscription_id` for `stream_id`
    fn on_subscription_id(&self, subscription_id: &str, stream_id: &str);

    fn on_stream_failed(&self, stream_id: &str, error: ConferenceError);
}

/// Creates capture sources and session channels
pub trait MediaFactory: Send + Sync {
    fn create_camera_source(
        &self,
        params: &CameraStreamParameters,
    ) -> ConferenceResult<Arc<dyn MediaSource>>;

    fn create_screen_source(
        &self,
        params: &ScreenStreamParameters,
    ) -> ConferenceResult<Arc<dyn MediaSource>>;

    fn create_customized_source(
        &self,
        params: &CustomizedStreamParameters,
    ) -> ConferenceResult<Arc<dyn MediaSource>>;

    fn create_channel(
        &self,
        config: ChannelConfiguration,
        events: Weak<dyn ChannelEventSink>,
    ) -> Arc<dyn ConferenceChannel>;
}

/// Audio/video tracks behind a stream
pub trait MediaSource: Send + Sync {
    fn has_audio(&self) -> bool;
    fn has_video(&self) -> bool;
    fn set_audio_enabled(&self, enabled: bool);
    fn set_video_enabled(&self, enabled: bool);
    /// Feed the first video track into `renderer`
    fn add_video_sink(&self, renderer: Arc<dyn VideoRenderer>);
    fn remove_video_sink(&self, renderer: &Arc<dyn VideoRenderer>);
}

/// Decoded frame handed to a renderer
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub timestamp_us: i64,
    /// ARGB pixels, row-major
    pub data: Vec<u8>,
}

pub trait VideoRenderer: Send + Sync {
    fn render_frame(&self, frame: &VideoFrame);
}
