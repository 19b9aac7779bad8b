//! Conference client: connection lifecycle, observers and shared plumbing
//!
//! The operations are spread over three files, each adding an `impl` block
//! to [`ConferenceClient`]:
//!
//! - this file: construction, join, leave, custom messages
//! - [`sessions`](super::sessions): publish, subscribe and per-session control
//! - [`events`](super::events): inbound signaling and channel events
//!
//! Every operation takes a continuation instead of returning a future. The
//! continuation runs exactly once, on the client's [`EventQueue`], after every
//! notification that was posted before the result became available.

use std::sync::{Arc, Weak};

use base64::Engine;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::client::config::ConferenceClientConfig;
use crate::client::events::RoomEvent;
use crate::client::registry::{SessionGroup, SessionRegistry};
use crate::conference::ConferenceInfo;
use crate::dispatch::EventQueue;
use crate::error::{ConferenceError, ConferenceResult};
use crate::events::ConferenceObserver;
use crate::observer::ObserverRegistry;
use crate::parser;
use crate::stream::{RemoteStreamType, Stream};
use crate::transport::{MediaFactory, SignalingChannel, SignalingObserver};

/// Where the client is in its conference lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    /// Connect requested, room snapshot not yet applied
    Joining,
    Joined,
}

pub(super) struct SessionState {
    pub(super) phase: ConnectionState,
    /// Incremented by every join so a late result of an abandoned join is ignored
    pub(super) join_id: u64,
    /// Room events received while joining, replayed once the join completes
    pub(super) pending: Vec<RoomEvent>,
}

/// Client side of one multi-party conference
///
/// Built with [`ConferenceClient::new`] or
/// [`ConferenceClientBuilder`](crate::ConferenceClientBuilder). Must be created
/// and driven from within a tokio runtime.
pub struct ConferenceClient {
    pub(super) self_ref: Weak<ConferenceClient>,
    pub(super) config: ConferenceClientConfig,
    pub(super) signaling: Arc<dyn SignalingChannel>,
    pub(super) factory: Arc<dyn MediaFactory>,
    pub(super) queue: EventQueue,
    pub(super) observers: ObserverRegistry<dyn ConferenceObserver>,
    pub(super) state: Mutex<SessionState>,
    pub(super) conference: RwLock<Option<Arc<ConferenceInfo>>>,
    /// Variant of every stream currently advertised, keyed by stream id
    pub(super) added_streams: DashMap<String, RemoteStreamType>,
    pub(super) sessions: SessionRegistry,
}

impl ConferenceClient {
    pub fn new(
        config: ConferenceClientConfig,
        signaling: Arc<dyn SignalingChannel>,
        factory: Arc<dyn MediaFactory>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            config,
            signaling,
            factory,
            queue: EventQueue::new("conference-client"),
            observers: ObserverRegistry::new(),
            state: Mutex::new(SessionState {
                phase: ConnectionState::Disconnected,
                join_id: 0,
                pending: Vec::new(),
            }),
            conference: RwLock::new(None),
            added_streams: DashMap::new(),
            sessions: SessionRegistry::new(),
        })
    }

    pub fn config(&self) -> &ConferenceClientConfig {
        &self.config
    }

    /// Factory used for this client's channels, also usable to create local streams
    pub fn media_factory(&self) -> &Arc<dyn MediaFactory> {
        &self.factory
    }

    /// Queue delivering this client's continuations and notifications
    pub fn event_queue(&self) -> &EventQueue {
        &self.queue
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state.lock().phase
    }

    /// The joined conference, if any
    pub fn conference_info(&self) -> Option<Arc<ConferenceInfo>> {
        self.conference.read().clone()
    }

    pub fn add_observer(&self, observer: Arc<dyn ConferenceObserver>) {
        self.observers.add(observer);
    }

    pub fn remove_observer(&self, observer: &Arc<dyn ConferenceObserver>) {
        self.observers.remove(observer);
    }

    pub(super) fn is_joined(&self) -> bool {
        self.connection_state() == ConnectionState::Joined
    }

    /// Deliver `error` to `on_done` through the queue
    pub(super) fn fail<T, F>(&self, on_done: F, error: ConferenceError)
    where
        T: Send + 'static,
        F: FnOnce(ConferenceResult<T>) + Send + 'static,
    {
        self.queue.post_fn(move || on_done(Err(error)));
    }

    /// Deliver `result` to `on_done` through the queue
    pub(super) fn complete<T, F>(&self, on_done: F, result: ConferenceResult<T>)
    where
        T: Send + 'static,
        F: FnOnce(ConferenceResult<T>) + Send + 'static,
    {
        self.queue.post_fn(move || on_done(result));
    }

    /// Join the conference `token` grants access to
    ///
    /// On success the continuation receives the room as it was when the join
    /// completed. Participants and streams already present are part of that
    /// snapshot and are not announced to observers; anything that changes
    /// afterwards is, and always after the continuation has run.
    pub fn join(
        &self,
        token: &str,
        on_done: impl FnOnce(ConferenceResult<Arc<ConferenceInfo>>) + Send + 'static,
    ) {
        let join_id = {
            let mut state = self.state.lock();
            if state.phase != ConnectionState::Disconnected {
                drop(state);
                warn!("Join requested while already connected to conference server");
                self.fail(on_done, ConferenceError::AlreadyConnected);
                return;
            }
            state.phase = ConnectionState::Joining;
            state.join_id += 1;
            state.pending.clear();
            state.join_id
        };

        let Some(this) = self.self_ref.upgrade() else {
            return;
        };
        let token = normalize_token(token);
        let observer: Weak<dyn SignalingObserver> = self.self_ref.clone();
        self.signaling.add_observer(observer);

        info!("Joining conference");
        tokio::spawn(async move {
            let conference = match this.signaling.connect(&token).await {
                Ok(snapshot) => match this.build_conference(&snapshot) {
                    Ok(conference) => Ok(conference),
                    Err(e) => {
                        if let Err(err) = this.signaling.disconnect().await {
                            warn!(error = %err, "Failed to disconnect after rejected room snapshot");
                        }
                        Err(e)
                    }
                },
                Err(e) => Err(e),
            };
            this.complete_join(join_id, conference, on_done);
        });
    }

    /// Build the conference model from the room snapshot returned by connect.
    /// Nothing is announced to observers and no client state is touched here.
    fn build_conference(&self, snapshot: &Value) -> ConferenceResult<Arc<ConferenceInfo>> {
        let me = parser::parse_participant(snapshot).map_err(|e| {
            error!(error = %e, "Room info doesn't contain participant's id, user id or role");
            ConferenceError::remote(format!("Received invalid user info from server: {e}"))
        })?;
        let Some(room) = snapshot.get("room").and_then(Value::as_object) else {
            error!("Room info is missing from join response");
            return Err(ConferenceError::remote("Received invalid room info from server"));
        };

        let me = Arc::new(me);
        let conference = Arc::new(ConferenceInfo::new(me.clone(), self.queue.clone()));
        // Servers may leave the local participant out of the room list
        conference.add_participant(me);

        match room.get("participants").and_then(Value::as_array) {
            Some(participants) => {
                for value in participants {
                    match parser::parse_participant(value) {
                        Ok(participant) => {
                            conference.add_participant(Arc::new(participant));
                        }
                        Err(e) => warn!(error = %e, "Skipping malformed participant in room info"),
                    }
                }
            }
            None => warn!("Room info doesn't contain valid participants"),
        }

        match room.get("streams").and_then(Value::as_array) {
            Some(streams) => {
                for value in streams {
                    self.insert_stream(&conference, value, false);
                }
            }
            None => warn!("Room info doesn't contain valid streams"),
        }

        Ok(conference)
    }

    /// Publish the join result, then replay the room events that arrived
    /// while joining. Both happen under the state lock so no live event can
    /// slip in between.
    fn complete_join(
        &self,
        join_id: u64,
        conference: ConferenceResult<Arc<ConferenceInfo>>,
        on_done: impl FnOnce(ConferenceResult<Arc<ConferenceInfo>>) + Send + 'static,
    ) {
        let mut state = self.state.lock();
        let current = state.phase == ConnectionState::Joining && state.join_id == join_id;
        match conference {
            Ok(_) if !current => {
                drop(state);
                warn!("Connection dropped before the join completed");
                self.fail(on_done, ConferenceError::NotConnected);
            }
            Ok(conference) => {
                for stream in conference.remote_streams() {
                    self.added_streams
                        .insert(stream.id().to_owned(), stream.stream_type());
                }
                *self.conference.write() = Some(conference.clone());
                state.phase = ConnectionState::Joined;
                let pending = std::mem::take(&mut state.pending);

                info!(
                    participant_id = %conference.self_participant().id(),
                    participants = conference.participants().len(),
                    streams = conference.remote_streams().len(),
                    "Joined conference"
                );
                self.complete(on_done, Ok(conference.clone()));

                if !pending.is_empty() {
                    debug!(events = pending.len(), "Replaying room events received while joining");
                }
                for event in pending {
                    self.handle_room_event(&conference, event);
                }
            }
            Err(e) => {
                if current {
                    state.phase = ConnectionState::Disconnected;
                    state.pending.clear();
                }
                drop(state);
                error!(error = %e, "Failed to join conference");
                self.fail(on_done, e);
            }
        }
    }

    /// Leave the conference and disconnect from the server
    ///
    /// All sessions are dropped right away; the continuation runs once the
    /// signaling channel has disconnected.
    pub fn leave(&self, on_done: impl FnOnce(ConferenceResult<()>) + Send + 'static) {
        {
            let mut state = self.state.lock();
            if state.phase != ConnectionState::Joined {
                drop(state);
                self.fail(on_done, ConferenceError::NotConnected);
                return;
            }
            state.phase = ConnectionState::Disconnected;
            state.pending.clear();
            self.teardown();
        }

        info!("Leaving conference");
        let signaling = self.signaling.clone();
        let queue = self.queue.clone();
        tokio::spawn(async move {
            let result = signaling.disconnect().await;
            queue.post_fn(move || on_done(result));
        });
    }

    /// Send a text message to `receiver`, or to everyone when it is empty
    pub fn send(
        &self,
        message: &str,
        receiver: &str,
        on_done: impl FnOnce(ConferenceResult<()>) + Send + 'static,
    ) {
        if !self.is_joined() {
            self.fail(on_done, ConferenceError::NotConnected);
            return;
        }
        let signaling = self.signaling.clone();
        let queue = self.queue.clone();
        let message = message.to_owned();
        let receiver = receiver.to_owned();
        tokio::spawn(async move {
            let result = signaling.send_custom_message(&message, &receiver).await;
            queue.post_fn(move || on_done(result));
        });
    }

    /// Forget every session, advertised stream and the conference model
    pub(super) fn teardown(&self) {
        self.sessions.clear();
        self.added_streams.clear();
        self.conference.write().take();
    }
}

impl std::fmt::Debug for ConferenceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConferenceClient")
            .field("state", &self.connection_state())
            .field("observers", &self.observers)
            .field("added_streams", &self.added_streams.len())
            .field("publications", &self.sessions.len(SessionGroup::Publish))
            .field("subscriptions", &self.sessions.len(SessionGroup::Subscribe))
            .finish()
    }
}

/// Tokens are expected base64 encoded; raw tokens are still accepted
fn normalize_token(token: &str) -> String {
    let engine = base64::engine::general_purpose::STANDARD;
    if engine.decode(token).is_ok() {
        return token.to_owned();
    }
    warn!("Passing a token that is not base64 encoded is deprecated, pass it without modification");
    engine.encode(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_tokens_pass_through() {
        assert_eq!(normalize_token("dG9rZW4="), "dG9rZW4=");
    }

    #[test]
    fn raw_tokens_are_encoded() {
        assert_eq!(normalize_token("{\"host\":\"a\"}"), "eyJob3N0IjoiYSJ9");
    }
}
