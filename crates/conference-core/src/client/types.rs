//! Option, statistics and handle types of the conference client

use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::client::manager::ConferenceClient;
use crate::dispatch::EventQueue;
use crate::error::{ConferenceError, ConferenceResult};
use crate::media::{
    AudioCodecParameters, AudioEncodingParameters, Resolution, TrackKind, VideoCodecParameters,
    VideoEncodingParameters,
};

// ===== OPTIONS =====

/// Encoding preferences for a publication, highest priority first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublishOptions {
    pub audio: Vec<AudioEncodingParameters>,
    pub video: Vec<VideoEncodingParameters>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioSubscriptionConstraints {
    /// Acceptable codecs, highest priority first
    pub codecs: Vec<AudioCodecParameters>,
}

/// What the subscriber asks the server to deliver
///
/// Every `None` leaves the choice to the server. Requested values should be
/// taken from the stream's subscription capabilities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoSubscriptionConstraints {
    pub codecs: Vec<VideoCodecParameters>,
    pub resolution: Option<Resolution>,
    pub frame_rate: Option<f64>,
    pub bitrate_multiplier: Option<f64>,
    pub keyframe_interval: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscribeOptions {
    pub audio: AudioSubscriptionConstraints,
    pub video: VideoSubscriptionConstraints,
}

// ===== STATISTICS =====

/// Transport statistics of one publish or subscribe session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionStats {
    /// When the statistics were sampled
    pub time_stamp: DateTime<Utc>,
    pub audio_bytes_sent: u64,
    pub audio_packets_sent: u64,
    pub audio_packets_lost: u64,
    pub audio_bytes_received: u64,
    pub audio_packets_received: u64,
    pub video_bytes_sent: u64,
    pub video_packets_sent: u64,
    pub video_packets_lost: u64,
    pub video_bytes_received: u64,
    pub video_packets_received: u64,
    /// Round trip time of the selected candidate pair, if measured
    pub round_trip_time_ms: Option<f64>,
}

impl ConnectionStats {
    /// Empty sample stamped with the current time
    pub fn new() -> Self {
        Self {
            time_stamp: Utc::now(),
            audio_bytes_sent: 0,
            audio_packets_sent: 0,
            audio_packets_lost: 0,
            audio_bytes_received: 0,
            audio_packets_received: 0,
            video_bytes_sent: 0,
            video_packets_sent: 0,
            video_packets_lost: 0,
            video_bytes_received: 0,
            video_packets_received: 0,
            round_trip_time_ms: None,
        }
    }
}

impl Default for ConnectionStats {
    fn default() -> Self {
        Self::new()
    }
}

// ===== SESSION HANDLES =====

/// Session handle shared by publications and subscriptions
///
/// Holds the client weakly: once the client is gone every operation fails
/// with [`ConferenceError::NotConnected`], still delivered through the queue.
#[derive(Clone)]
struct SessionHandle {
    id: String,
    client: Weak<ConferenceClient>,
    queue: EventQueue,
}

impl SessionHandle {
    fn with_client<T, F>(&self, on_done: F, op: impl FnOnce(Arc<ConferenceClient>, F))
    where
        T: Send + 'static,
        F: FnOnce(ConferenceResult<T>) + Send + 'static,
    {
        match self.client.upgrade() {
            Some(client) => op(client, on_done),
            None => {
                warn!(session_id = %self.id, "Conference client dropped, session is gone");
                self.queue
                    .post_fn(move || on_done(Err(ConferenceError::NotConnected)));
            }
        }
    }
}

macro_rules! session_handle_ops {
    ($handle:ident, $stop:ident) => {
        impl $handle {
            pub(crate) fn new(id: String, client: Weak<ConferenceClient>, queue: EventQueue) -> Self {
                Self {
                    inner: SessionHandle { id, client, queue },
                }
            }

            /// Session id assigned by the server
            pub fn id(&self) -> &str {
                &self.inner.id
            }

            /// End the session
            pub fn stop(&self, on_done: impl FnOnce(ConferenceResult<()>) + Send + 'static) {
                let id = self.inner.id.clone();
                self.inner
                    .with_client(on_done, move |client, on_done| client.$stop(&id, on_done));
            }

            /// Pause sending or receiving `kind` tracks
            pub fn mute(
                &self,
                kind: TrackKind,
                on_done: impl FnOnce(ConferenceResult<()>) + Send + 'static,
            ) {
                let id = self.inner.id.clone();
                self.inner
                    .with_client(on_done, move |client, on_done| client.mute(&id, kind, on_done));
            }

            pub fn unmute(
                &self,
                kind: TrackKind,
                on_done: impl FnOnce(ConferenceResult<()>) + Send + 'static,
            ) {
                let id = self.inner.id.clone();
                self.inner
                    .with_client(on_done, move |client, on_done| client.unmute(&id, kind, on_done));
            }

            pub fn connection_stats(
                &self,
                on_done: impl FnOnce(ConferenceResult<ConnectionStats>) + Send + 'static,
            ) {
                let id = self.inner.id.clone();
                self.inner.with_client(on_done, move |client, on_done| {
                    client.connection_stats(&id, on_done)
                });
            }
        }

        impl std::fmt::Debug for $handle {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($handle))
                    .field("id", &self.inner.id)
                    .finish()
            }
        }
    };
}

/// Handle of an active publication
#[derive(Clone)]
pub struct Publication {
    inner: SessionHandle,
}

/// Handle of an active subscription
#[derive(Clone)]
pub struct Subscription {
    inner: SessionHandle,
}

session_handle_ops!(Publication, unpublish);
session_handle_ops!(Subscription, unsubscribe);
