//! Inbound event handling for the conference client
//!
//! Bridges the push interfaces of the collaborators into the client:
//!
//! - [`SignalingObserver`]: room membership and stream events from the
//!   server, negotiation traffic for session channels, custom messages and
//!   disconnects
//! - [`ChannelEventSink`]: session ids and failures reported by channels
//!
//! Room events are applied to the conference model under the client's state
//! lock. While a join is still in progress they are queued and replayed once
//! the join result has been delivered.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::client::manager::{ConferenceClient, ConnectionState};
use crate::client::registry::SessionGroup;
use crate::conference::ConferenceInfo;
use crate::error::ConferenceError;
use crate::parser;
use crate::stream::{RemoteStreamType, Stream};
use crate::transport::{ChannelEventSink, SignalingObserver};

/// Room event that changes the conference model
#[derive(Debug, Clone)]
pub(crate) enum RoomEvent {
    UserJoined(Value),
    UserLeft(Value),
    StreamAdded(Value),
    StreamRemoved(Value),
    StreamUpdated(Value),
}

impl RoomEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::UserJoined(_) => "user joined",
            Self::UserLeft(_) => "user left",
            Self::StreamAdded(_) => "stream added",
            Self::StreamRemoved(_) => "stream removed",
            Self::StreamUpdated(_) => "stream updated",
        }
    }
}

impl ConferenceClient {
    fn accept_room_event(&self, event: RoomEvent) {
        let mut state = self.state.lock();
        match state.phase {
            ConnectionState::Joining => {
                debug!(event = event.name(), "Deferring room event until join completes");
                state.pending.push(event);
            }
            ConnectionState::Joined => {
                let Some(conference) = self.conference.read().clone() else {
                    error!(event = event.name(), "Joined without a conference model");
                    debug_assert!(false, "joined state without conference info");
                    return;
                };
                self.handle_room_event(&conference, event);
            }
            ConnectionState::Disconnected => {
                debug!(event = event.name(), "Dropping room event, conference not joined");
            }
        }
    }

    /// Apply a live room event and post the resulting notifications.
    /// Called with the state lock held.
    pub(super) fn handle_room_event(&self, conference: &Arc<ConferenceInfo>, event: RoomEvent) {
        match event {
            RoomEvent::UserJoined(value) => self.on_participant_joined(conference, &value),
            RoomEvent::UserLeft(value) => self.on_participant_left(conference, &value),
            RoomEvent::StreamAdded(value) => self.insert_stream(conference, &value, true),
            RoomEvent::StreamRemoved(value) => self.remove_stream(conference, &value),
            RoomEvent::StreamUpdated(value) => self.update_stream(conference, &value),
        }
    }

    fn on_participant_joined(&self, conference: &ConferenceInfo, value: &Value) {
        let participant = match parser::parse_participant(value) {
            Ok(participant) => Arc::new(participant),
            Err(e) => {
                warn!(error = %e, "Ignoring malformed participant");
                return;
            }
        };
        if !conference.add_participant(participant.clone()) {
            return;
        }
        info!(participant_id = %participant.id(), user_id = %participant.user_id(), "Participant joined");
        for observer in self.observers.snapshot() {
            let participant = participant.clone();
            self.queue
                .post(async move { observer.on_participant_joined(participant).await });
        }
    }

    fn on_participant_left(&self, conference: &ConferenceInfo, value: &Value) {
        let id = match parser::parse_participant_id(value) {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed user left event");
                return;
            }
        };
        if !conference.trigger_on_participant_left(&id) {
            warn!(participant_id = %id, "Unknown participant left");
            return;
        }
        conference.remove_participant_by_id(&id);
        info!(participant_id = %id, "Participant left");
    }

    /// Parse an advertised stream and add it to `conference`. With `live`
    /// set the stream is also recorded as subscribable and announced.
    pub(super) fn insert_stream(&self, conference: &ConferenceInfo, value: &Value, live: bool) {
        let stream = match parser::parse_stream(value) {
            Ok(stream) => Arc::new(stream),
            Err(e) => {
                let stream_id = value.get("id").and_then(Value::as_str).unwrap_or("<unknown>");
                warn!(stream_id, error = %e, "Ignoring malformed stream");
                return;
            }
        };
        if !conference.add_stream(stream.clone()) {
            return;
        }
        debug!(stream_id = %stream.id(), stream_type = ?stream.stream_type(), "Stream added");
        if !live {
            return;
        }
        self.added_streams
            .insert(stream.id().to_owned(), stream.stream_type());
        for observer in self.observers.snapshot() {
            let stream = stream.clone();
            self.queue
                .post(async move { observer.on_stream_added(stream).await });
        }
    }

    fn remove_stream(&self, conference: &ConferenceInfo, value: &Value) {
        let id = match parser::parse_stream_id(value) {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed stream removed event");
                return;
            }
        };
        if self.added_streams.remove(&id).is_none() {
            warn!(stream_id = %id, "Removed stream was never advertised");
            return;
        }
        conference.trigger_on_stream_ended(&id);
        conference.remove_stream_by_id(&id);
        debug!(stream_id = %id, "Stream removed");
    }

    fn update_stream(&self, conference: &ConferenceInfo, value: &Value) {
        let (id, field) = match parser::parse_stream_update(value) {
            Ok(update) => update,
            Err(e) => {
                warn!(error = %e, "Invalid stream update event");
                return;
            }
        };
        let Some(stream_type) = self.added_streams.get(&id).map(|t| *t.value()) else {
            warn!(stream_id = %id, "Update for a stream that was never advertised");
            return;
        };
        if stream_type != RemoteStreamType::Mixed || field != "video.layout" {
            warn!(stream_id = %id, field = %field, "Stream updated event only supported on mixed stream layout");
            return;
        }
        if let Some(stream) = conference.remote_stream(&id) {
            stream.trigger_on_video_layout_changed(&self.queue);
        }
    }

    /// Channels report their session id from inside publish or subscribe, which
    /// may run after a leave or server disconnect has torn the session down.
    fn record_session_label(&self, group: SessionGroup, session_id: &str, label: &str) {
        let Some(channel) = self.sessions.lookup_in(group, session_id) else {
            debug!(session_id, label, group = ?group, "Session id reported after teardown, ignoring");
            return;
        };
        if !self.sessions.set_label(group, &channel, session_id, label) {
            debug!(session_id, label, group = ?group, "Session torn down while recording its label");
        }
    }
}

impl SignalingObserver for ConferenceClient {
    fn on_stream_added(&self, stream: Value) {
        self.accept_room_event(RoomEvent::StreamAdded(stream));
    }

    fn on_stream_removed(&self, stream: Value) {
        self.accept_room_event(RoomEvent::StreamRemoved(stream));
    }

    fn on_stream_updated(&self, stream: Value) {
        self.accept_room_event(RoomEvent::StreamUpdated(stream));
    }

    fn on_stream_error(&self, stream: Value) {
        let stream_id = match parser::parse_stream_error(&stream) {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "Invalid stream error event");
                return;
            }
        };
        error!(stream_id = %stream_id, "Server reports connection failed for stream");
        match self.sessions.lookup(&stream_id) {
            Some(channel) => {
                channel.on_stream_error("Server reported an error for this stream");
            }
            None => warn!(stream_id = %stream_id, "Stream error for unknown session"),
        }
    }

    fn on_user_joined(&self, user: Value) {
        self.accept_room_event(RoomEvent::UserJoined(user));
    }

    fn on_user_left(&self, user: Value) {
        self.accept_room_event(RoomEvent::UserLeft(user));
    }

    fn on_signaling_message(&self, message: Value) {
        let (session_id, signal) = match parser::parse_signaling_message(&message) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Ignoring signaling message");
                return;
            }
        };
        match self.sessions.lookup(&session_id) {
            Some(channel) => channel.on_signaling_message(signal),
            None => warn!(session_id = %session_id, "Received signaling message from unknown sender"),
        }
    }

    fn on_custom_message(&self, from: String, message: String) {
        debug!(from = %from, "Custom message received");
        for observer in self.observers.snapshot() {
            let from = from.clone();
            let message = message.clone();
            self.queue
                .post(async move { observer.on_message_received(from, message).await });
        }
    }

    fn on_server_disconnected(&self) {
        let was_connected = {
            let mut state = self.state.lock();
            let was_connected = state.phase != ConnectionState::Disconnected;
            state.phase = ConnectionState::Disconnected;
            state.pending.clear();
            self.teardown();
            was_connected
        };
        if !was_connected {
            debug!("Server disconnected while not in a conference");
            return;
        }
        warn!("Conference server disconnected");
        for observer in self.observers.snapshot() {
            self.queue
                .post(async move { observer.on_server_disconnected().await });
        }
    }
}

impl ChannelEventSink for ConferenceClient {
    fn on_stream_id(&self, session_id: &str, label: &str) {
        self.record_session_label(SessionGroup::Publish, session_id, label);
    }

    fn on_subscription_id(&self, subscription_id: &str, stream_id: &str) {
        self.record_session_label(SessionGroup::Subscribe, subscription_id, stream_id);
    }

    fn on_stream_failed(&self, stream_id: &str, error: ConferenceError) {
        warn!(stream_id, error = %error, "Channel reported stream failure");
        for observer in self.observers.snapshot() {
            let stream_id = stream_id.to_owned();
            let error = error.clone();
            self.queue
                .post(async move { observer.on_stream_error(stream_id, error).await });
        }
    }
}
