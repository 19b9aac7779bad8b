//! Conference participants

use std::sync::Arc;

use serde::Serialize;

use crate::dispatch::EventQueue;
use crate::events::ParticipantObserver;
use crate::observer::ObserverRegistry;

/// A member of the conference. Identity fields never change after creation.
#[derive(Debug, Serialize)]
pub struct Participant {
    id: String,
    user_id: String,
    role: String,
    #[serde(skip)]
    observers: ObserverRegistry<dyn ParticipantObserver>,
}

impl Participant {
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            role: role.into(),
            observers: ObserverRegistry::new(),
        }
    }

    /// Participant id assigned by the server for this session
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Account the participant authenticated as
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn add_observer(&self, observer: Arc<dyn ParticipantObserver>) {
        self.observers.add(observer);
    }

    pub fn remove_observer(&self, observer: &Arc<dyn ParticipantObserver>) {
        self.observers.remove(observer);
    }

    /// Post `on_left` for every observer registered right now
    pub(crate) fn trigger_on_left(&self, queue: &EventQueue) {
        for observer in self.observers.snapshot() {
            queue.post(async move { observer.on_left().await });
        }
    }
}
