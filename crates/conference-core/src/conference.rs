//! In-memory model of one joined conference

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::dispatch::EventQueue;
use crate::participant::Participant;
use crate::stream::{RemoteStream, Stream};

/// Snapshot of who is in the room and what they publish
///
/// Created when a join completes and discarded on leave or disconnect. Each
/// collection has its own lock, held only to mutate or copy it. Notifications
/// for a participant or stream go through the entity's own observer registry
/// after the collection lock has been released.
#[derive(Debug)]
pub struct ConferenceInfo {
    self_participant: Arc<Participant>,
    participants: Mutex<Vec<Arc<Participant>>>,
    remote_streams: Mutex<Vec<Arc<RemoteStream>>>,
    queue: EventQueue,
}

impl ConferenceInfo {
    pub(crate) fn new(self_participant: Arc<Participant>, queue: EventQueue) -> Self {
        Self {
            self_participant,
            participants: Mutex::new(Vec::new()),
            remote_streams: Mutex::new(Vec::new()),
            queue,
        }
    }

    /// The local participant
    pub fn self_participant(&self) -> Arc<Participant> {
        self.self_participant.clone()
    }

    /// Every participant currently in the room, the local one included
    pub fn participants(&self) -> Vec<Arc<Participant>> {
        self.participants.lock().clone()
    }

    pub fn remote_streams(&self) -> Vec<Arc<RemoteStream>> {
        self.remote_streams.lock().clone()
    }

    pub fn participant(&self, id: &str) -> Option<Arc<Participant>> {
        self.participants
            .lock()
            .iter()
            .find(|p| p.id() == id)
            .cloned()
    }

    pub fn remote_stream(&self, id: &str) -> Option<Arc<RemoteStream>> {
        self.remote_streams
            .lock()
            .iter()
            .find(|s| s.id() == id)
            .cloned()
    }

    pub fn participant_present(&self, id: &str) -> bool {
        self.participants.lock().iter().any(|p| p.id() == id)
    }

    pub fn remote_stream_present(&self, id: &str) -> bool {
        self.remote_streams.lock().iter().any(|s| s.id() == id)
    }

    /// Insert unless a participant with the same id exists. Returns whether
    /// the participant was inserted.
    pub(crate) fn add_participant(&self, participant: Arc<Participant>) -> bool {
        let mut participants = self.participants.lock();
        if participants.iter().any(|p| p.id() == participant.id()) {
            debug!(participant_id = %participant.id(), "Participant already present");
            return false;
        }
        participants.push(participant);
        true
    }

    pub(crate) fn add_stream(&self, stream: Arc<RemoteStream>) -> bool {
        let mut streams = self.remote_streams.lock();
        if streams.iter().any(|s| s.id() == stream.id()) {
            debug!(stream_id = %stream.id(), "Stream already present");
            return false;
        }
        streams.push(stream);
        true
    }

    pub(crate) fn remove_participant_by_id(&self, id: &str) -> Option<Arc<Participant>> {
        let mut participants = self.participants.lock();
        let pos = participants.iter().position(|p| p.id() == id)?;
        Some(participants.remove(pos))
    }

    pub(crate) fn remove_stream_by_id(&self, id: &str) -> Option<Arc<RemoteStream>> {
        let mut streams = self.remote_streams.lock();
        let pos = streams.iter().position(|s| s.id() == id)?;
        Some(streams.remove(pos))
    }

    /// Notify the observers of participant `id` that it left. Returns `false`
    /// if no such participant is present.
    pub(crate) fn trigger_on_participant_left(&self, id: &str) -> bool {
        match self.participant(id) {
            Some(participant) => {
                participant.trigger_on_left(&self.queue);
                true
            }
            None => false,
        }
    }

    pub(crate) fn trigger_on_stream_ended(&self, id: &str) -> bool {
        match self.remote_stream(id) {
            Some(stream) => {
                stream.trigger_on_ended(&self.queue);
                true
            }
            None => false,
        }
    }
}
