//! Active publish and subscribe sessions
//!
//! Channels are kept in two independent groups, each behind its own lock, so
//! publish and subscribe traffic never contend. Locks are held only while the
//! group is copied or mutated; a channel's `session_id()` is always queried on
//! a copy taken outside the lock.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::transport::ConferenceChannel;

/// Which registry group a session belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionGroup {
    Publish,
    Subscribe,
}

#[derive(Default)]
struct GroupState {
    channels: Vec<Arc<dyn ConferenceChannel>>,
    /// Session id to local stream label (publish) or remote stream id (subscribe)
    labels: HashMap<String, String>,
}

#[derive(Default)]
pub(crate) struct SessionRegistry {
    publish: Mutex<GroupState>,
    subscribe: Mutex<GroupState>,
}

impl SessionRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn group(&self, group: SessionGroup) -> &Mutex<GroupState> {
        match group {
            SessionGroup::Publish => &self.publish,
            SessionGroup::Subscribe => &self.subscribe,
        }
    }

    /// Add a channel whose session is about to start
    pub(crate) fn register(&self, group: SessionGroup, channel: Arc<dyn ConferenceChannel>) {
        self.group(group).lock().channels.push(channel);
    }

    /// Find the channel owning `session_id` within one group
    pub(crate) fn lookup_in(
        &self,
        group: SessionGroup,
        session_id: &str,
    ) -> Option<Arc<dyn ConferenceChannel>> {
        let channels = self.group(group).lock().channels.clone();
        channels
            .into_iter()
            .find(|c| c.session_id().as_deref() == Some(session_id))
    }

    /// Find the channel owning `session_id`, subscriptions first
    pub(crate) fn lookup(&self, session_id: &str) -> Option<Arc<dyn ConferenceChannel>> {
        self.lookup_in(SessionGroup::Subscribe, session_id)
            .or_else(|| self.lookup_in(SessionGroup::Publish, session_id))
    }

    /// Drop `session_id` from `group`, purging both its channel and its label.
    /// Returns whether a channel was removed.
    pub(crate) fn unregister(&self, group: SessionGroup, session_id: &str) -> bool {
        let channel = self.lookup_in(group, session_id);
        let mut state = self.group(group).lock();
        state.labels.remove(session_id);
        let Some(channel) = channel else {
            debug!(session_id, "Session already unregistered");
            return false;
        };
        let before = state.channels.len();
        state.channels.retain(|c| !Arc::ptr_eq(c, &channel));
        state.channels.len() != before
    }

    /// Record the label for `session_id` while `channel` is still in `group`.
    /// Returns false, recording nothing, once the channel has been dropped.
    pub(crate) fn set_label(
        &self,
        group: SessionGroup,
        channel: &Arc<dyn ConferenceChannel>,
        session_id: &str,
        label: &str,
    ) -> bool {
        let mut state = self.group(group).lock();
        if !state.channels.iter().any(|c| Arc::ptr_eq(c, channel)) {
            return false;
        }
        state
            .labels
            .insert(session_id.to_owned(), label.to_owned());
        true
    }

    pub(crate) fn label(&self, group: SessionGroup, session_id: &str) -> Option<String> {
        self.group(group).lock().labels.get(session_id).cloned()
    }

    /// Number of channels in `group`, including ones still negotiating
    pub(crate) fn len(&self, group: SessionGroup) -> usize {
        self.group(group).lock().channels.len()
    }

    /// Drop every session in both groups
    pub(crate) fn clear(&self) {
        for group in [SessionGroup::Publish, SessionGroup::Subscribe] {
            let mut state = self.group(group).lock();
            state.channels.clear();
            state.labels.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::types::{ConnectionStats, SubscribeOptions};
    use crate::error::ConferenceResult;
    use crate::stream::LocalStream;
    use crate::transport::{ChannelSignal, SubscribeTarget};
    use async_trait::async_trait;

    struct StubChannel(Option<&'static str>);

    #[async_trait]
    impl ConferenceChannel for StubChannel {
        fn session_id(&self) -> Option<String> {
            self.0.map(str::to_owned)
        }
        async fn publish(&self, _stream: Arc<LocalStream>) -> ConferenceResult<String> {
            unimplemented!()
        }
        async fn subscribe(
            &self,
            _target: SubscribeTarget,
            _options: SubscribeOptions,
        ) -> ConferenceResult<String> {
            unimplemented!()
        }
        async fn unpublish(&self, _session_id: &str) -> ConferenceResult<()> {
            Ok(())
        }
        async fn unsubscribe(&self, _session_id: &str) -> ConferenceResult<()> {
            Ok(())
        }
        async fn pause_audio(&self) -> ConferenceResult<()> {
            Ok(())
        }
        async fn pause_video(&self) -> ConferenceResult<()> {
            Ok(())
        }
        async fn pause_audio_video(&self) -> ConferenceResult<()> {
            Ok(())
        }
        async fn play_audio(&self) -> ConferenceResult<()> {
            Ok(())
        }
        async fn play_video(&self) -> ConferenceResult<()> {
            Ok(())
        }
        async fn play_audio_video(&self) -> ConferenceResult<()> {
            Ok(())
        }
        async fn connection_stats(&self) -> ConferenceResult<ConnectionStats> {
            Ok(ConnectionStats::new())
        }
        fn on_signaling_message(&self, _signal: ChannelSignal) {}
        fn on_stream_error(&self, _message: &str) {}
    }

    #[test]
    fn lookup_checks_subscriptions_before_publications() {
        let registry = SessionRegistry::new();
        let published: Arc<dyn ConferenceChannel> = Arc::new(StubChannel(Some("same")));
        let subscribed: Arc<dyn ConferenceChannel> = Arc::new(StubChannel(Some("same")));
        registry.register(SessionGroup::Publish, published.clone());
        registry.register(SessionGroup::Subscribe, subscribed.clone());

        assert!(Arc::ptr_eq(&registry.lookup("same").unwrap(), &subscribed));
        assert!(Arc::ptr_eq(
            &registry.lookup_in(SessionGroup::Publish, "same").unwrap(),
            &published
        ));
        assert!(registry.lookup("other").is_none());
    }

    #[test]
    fn channels_without_session_id_are_never_found() {
        let registry = SessionRegistry::new();
        registry.register(SessionGroup::Publish, Arc::new(StubChannel(None)));
        assert!(registry.lookup("").is_none());
        assert_eq!(registry.len(SessionGroup::Publish), 1);
    }

    #[test]
    fn unregister_purges_channel_and_label() {
        let registry = SessionRegistry::new();
        let channel: Arc<dyn ConferenceChannel> = Arc::new(StubChannel(Some("sub-1")));
        registry.register(SessionGroup::Subscribe, channel.clone());
        assert!(registry.set_label(SessionGroup::Subscribe, &channel, "sub-1", "stream-1"));

        assert!(!registry.unregister(SessionGroup::Publish, "sub-1"));
        assert_eq!(registry.len(SessionGroup::Subscribe), 1);

        assert!(registry.unregister(SessionGroup::Subscribe, "sub-1"));
        assert_eq!(registry.len(SessionGroup::Subscribe), 0);
        assert!(registry.label(SessionGroup::Subscribe, "sub-1").is_none());
    }

    #[test]
    fn clear_empties_both_groups() {
        let registry = SessionRegistry::new();
        let channel: Arc<dyn ConferenceChannel> = Arc::new(StubChannel(Some("a")));
        registry.register(SessionGroup::Publish, channel.clone());
        registry.register(SessionGroup::Subscribe, Arc::new(StubChannel(Some("b"))));
        registry.set_label(SessionGroup::Publish, &channel, "a", "local");

        registry.clear();
        assert_eq!(registry.len(SessionGroup::Publish), 0);
        assert_eq!(registry.len(SessionGroup::Subscribe), 0);
        assert!(registry.label(SessionGroup::Publish, "a").is_none());
    }

    #[test]
    fn label_is_not_recorded_after_channel_is_dropped() {
        let registry = SessionRegistry::new();
        let channel: Arc<dyn ConferenceChannel> = Arc::new(StubChannel(Some("a")));
        registry.register(SessionGroup::Publish, channel.clone());
        registry.clear();

        assert!(!registry.set_label(SessionGroup::Publish, &channel, "a", "local"));
        assert!(registry.label(SessionGroup::Publish, "a").is_none());

        // Registered in the other group only
        registry.register(SessionGroup::Subscribe, channel.clone());
        assert!(!registry.set_label(SessionGroup::Publish, &channel, "a", "local"));
    }
}
