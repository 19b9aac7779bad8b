//! # Conference Core - Session Orchestration for Multi-Party Clients
//!
//! This crate keeps the client-side model of a multi-party conference: who is
//! in the room, which streams they publish, and which publish and subscribe
//! sessions this client runs. It reconciles asynchronous, loosely typed
//! signaling events with caller-initiated operations and delivers every result
//! and notification in a deterministic order.
//!
//! Media capture, peer connections and the signaling transport are external
//! collaborators described by the traits in [`transport`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rvoip_conference_core::{
//!     ConferenceClient, ConferenceClientConfig, MediaFactory, SignalingChannel,
//! };
//!
//! # async fn example(signaling: Arc<dyn SignalingChannel>, factory: Arc<dyn MediaFactory>) {
//! let client = ConferenceClient::new(ConferenceClientConfig::default(), signaling, factory);
//!
//! let (tx, rx) = tokio::sync::oneshot::channel();
//! client.join("base64-token", move |result| {
//!     let _ = tx.send(result);
//! });
//! let conference = rx.await.unwrap().expect("join failed");
//! for stream in conference.remote_streams() {
//!     println!("stream {:?} from {}", stream.stream_type(), stream.origin());
//! }
//! # }
//! ```
//!
//! ## Ordering
//!
//! Continuations and observer notifications are posted to one
//! [`EventQueue`] and run one at a time in posting order. A join's
//! continuation always runs before any notification about participants or
//! streams that joined after it.

pub mod client;
pub mod conference;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod media;
pub mod observer;
pub mod parser;
pub mod participant;
pub mod stream;
pub mod transport;

// Re-export main types
pub use client::{
    AudioSubscriptionConstraints, CandidateNetworkPolicy, ChannelConfiguration, ConferenceClient,
    ConferenceClientBuilder, ConferenceClientConfig, ConnectionState, ConnectionStats, IceServer,
    Publication, PublishOptions, SubscribeOptions, Subscription, VideoSubscriptionConstraints,
};
pub use conference::ConferenceInfo;
pub use dispatch::EventQueue;
pub use error::{ConferenceError, ConferenceResult, ErrorKind, ParseError};
pub use events::{ConferenceObserver, ParticipantObserver, StreamObserver};
pub use media::{
    AudioCodec, AudioCodecParameters, AudioEncodingParameters, AudioPublicationSettings,
    AudioSubscriptionCapabilities, PublicationSettings, Resolution, SubscriptionCapabilities,
    TrackKind, VideoCodec, VideoCodecParameters, VideoEncodingParameters,
    VideoPublicationSettings, VideoSubscriptionCapabilities,
};
pub use observer::ObserverRegistry;
pub use participant::Participant;
pub use stream::{
    AudioSourceInfo, CameraStreamParameters, CustomizedStreamParameters, DesktopSourceType,
    LocalStream, LocalStreamKind, RemoteStream, RemoteStreamKind, RemoteStreamType,
    ScreenStreamParameters, Stream, StreamSourceInfo, VideoSourceInfo, MIXED_STREAM_ORIGIN,
};
pub use transport::{
    ChannelEventSink, ChannelSignal, ConferenceChannel, MediaFactory, MediaSource,
    SignalingChannel, SignalingObserver, SubscribeTarget, VideoFrame, VideoRenderer,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
