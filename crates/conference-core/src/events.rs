//! Observer traits for conference, participant and stream notifications
//!
//! All methods are invoked from the client's [`EventQueue`](crate::EventQueue),
//! one at a time and in the order the underlying events were accepted. Every
//! method has an empty default, so implementors only override what they need.
//!
//! ```rust
//! use rvoip_conference_core::{ConferenceObserver, Participant};
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct Roster;
//!
//! #[async_trait]
//! impl ConferenceObserver for Roster {
//!     async fn on_participant_joined(&self, participant: Arc<Participant>) {
//!         println!("{} joined", participant.user_id());
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ConferenceError;
use crate::participant::Participant;
use crate::stream::RemoteStream;

/// Conference-wide notifications
#[async_trait]
pub trait ConferenceObserver: Send + Sync {
    /// A participant joined after the local join completed
    async fn on_participant_joined(&self, _participant: Arc<Participant>) {}

    /// A remote stream was advertised after the local join completed
    async fn on_stream_added(&self, _stream: Arc<RemoteStream>) {}

    /// A channel reported a failure for one of our sessions
    async fn on_stream_error(&self, _stream_id: String, _error: ConferenceError) {}

    /// Custom text message from another participant
    async fn on_message_received(&self, _from: String, _message: String) {}

    /// The signaling connection dropped and all sessions were torn down
    async fn on_server_disconnected(&self) {}
}

/// Per-participant notifications
#[async_trait]
pub trait ParticipantObserver: Send + Sync {
    async fn on_left(&self) {}
}

/// Per-stream notifications
#[async_trait]
pub trait StreamObserver: Send + Sync {
    /// The stream was removed from the conference
    async fn on_ended(&self) {}

    /// Layout of a mixed stream changed
    async fn on_video_layout_changed(&self) {}
}
