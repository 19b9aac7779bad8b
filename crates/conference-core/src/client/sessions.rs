//! Publish and subscribe session operations

use std::sync::{Arc, Weak};

use tracing::{debug, info, warn};

use crate::client::manager::ConferenceClient;
use crate::client::registry::SessionGroup;
use crate::client::types::{ConnectionStats, PublishOptions, Publication, SubscribeOptions, Subscription};
use crate::error::{ConferenceError, ConferenceResult};
use crate::media::{AudioEncodingParameters, TrackKind, VideoEncodingParameters};
use crate::stream::{LocalStream, RemoteStream, RemoteStreamType, Stream};
use crate::transport::{ChannelEventSink, ConferenceChannel, SubscribeTarget};

#[derive(Debug, Clone, Copy)]
enum TrackAction {
    Pause,
    Play,
}

impl ConferenceClient {
    fn event_sink(&self) -> Weak<dyn ChannelEventSink> {
        self.self_ref.clone()
    }

    /// Publish a local stream to the conference
    ///
    /// Codec preferences in `options` are appended to the channel
    /// configuration in the order given and decide negotiation priority. The
    /// channel is registered before publishing starts; if publishing fails it
    /// stays registered until [`unpublish`](Self::unpublish) or leave.
    pub fn publish(
        &self,
        stream: Arc<LocalStream>,
        options: PublishOptions,
        on_done: impl FnOnce(ConferenceResult<Publication>) + Send + 'static,
    ) {
        if stream.media_source().is_none() {
            warn!(stream_id = %stream.id(), "Cannot publish a local stream without media");
            self.fail(
                on_done,
                ConferenceError::invalid_argument("Cannot publish a local stream without media"),
            );
            return;
        }
        if !self.is_joined() {
            self.fail(on_done, ConferenceError::NotConnected);
            return;
        }

        let mut config = self.config.channel_configuration();
        config.video.extend(options.video);
        config.audio.extend(options.audio);
        let channel = self.factory.create_channel(config, self.event_sink());
        self.sessions.register(SessionGroup::Publish, channel.clone());

        info!(stream_id = %stream.id(), "Publishing local stream");
        let client = self.self_ref.clone();
        let queue = self.queue.clone();
        tokio::spawn(async move {
            let result = channel
                .publish(stream)
                .await
                .map(|session_id| Publication::new(session_id, client, queue.clone()));
            queue.post_fn(move || on_done(result));
        });
    }

    /// Subscribe to a remote stream advertised by the conference
    ///
    /// Fails with [`ConferenceError::UnknownStream`] if the stream has not been
    /// advertised or has been removed since.
    pub fn subscribe(
        &self,
        stream: Arc<RemoteStream>,
        options: SubscribeOptions,
        on_done: impl FnOnce(ConferenceResult<Subscription>) + Send + 'static,
    ) {
        if !self.is_joined() {
            self.fail(on_done, ConferenceError::NotConnected);
            return;
        }
        let Some(stream_type) = self
            .added_streams
            .get(stream.id())
            .map(|entry| *entry.value())
        else {
            warn!(stream_id = %stream.id(), "Subscribing an unknown stream");
            self.fail(on_done, ConferenceError::unknown_stream(stream.id()));
            return;
        };

        let mut config = self.config.channel_configuration();
        config.video.extend(
            options
                .video
                .codecs
                .iter()
                .cloned()
                .map(|codec| VideoEncodingParameters::new(codec, 0, false)),
        );
        config.audio.extend(
            options
                .audio
                .codecs
                .iter()
                .cloned()
                .map(|codec| AudioEncodingParameters::new(codec, 0)),
        );
        let channel = self.factory.create_channel(config, self.event_sink());
        self.sessions.register(SessionGroup::Subscribe, channel.clone());

        let target = match stream_type {
            RemoteStreamType::Camera => SubscribeTarget::Camera(stream),
            RemoteStreamType::Screen => SubscribeTarget::Screen(stream),
            RemoteStreamType::Mixed => SubscribeTarget::Mixed(stream),
        };
        info!(subscribe_target = ?target, "Subscribing remote stream");
        let client = self.self_ref.clone();
        let queue = self.queue.clone();
        tokio::spawn(async move {
            let result = channel
                .subscribe(target, options)
                .await
                .map(|session_id| Subscription::new(session_id, client, queue.clone()));
            queue.post_fn(move || on_done(result));
        });
    }

    /// Stop a publication
    pub fn unpublish(&self, session_id: &str, on_done: impl FnOnce(ConferenceResult<()>) + Send + 'static) {
        self.end_session(SessionGroup::Publish, session_id, on_done);
    }

    /// Stop a subscription
    pub fn unsubscribe(&self, session_id: &str, on_done: impl FnOnce(ConferenceResult<()>) + Send + 'static) {
        self.end_session(SessionGroup::Subscribe, session_id, on_done);
    }

    fn end_session(
        &self,
        group: SessionGroup,
        session_id: &str,
        on_done: impl FnOnce(ConferenceResult<()>) + Send + 'static,
    ) {
        if !self.is_joined() {
            self.fail(on_done, ConferenceError::NotConnected);
            return;
        }
        let Some(channel) = self.sessions.lookup_in(group, session_id) else {
            let message = match group {
                SessionGroup::Publish => "Invalid publication id",
                SessionGroup::Subscribe => "Invalid subscription id",
            };
            self.fail(on_done, ConferenceError::not_found(format!("{message} {session_id}")));
            return;
        };

        let client = self.self_ref.clone();
        let queue = self.queue.clone();
        let session_id = session_id.to_owned();
        tokio::spawn(async move {
            let result = match group {
                SessionGroup::Publish => channel.unpublish(&session_id).await,
                SessionGroup::Subscribe => channel.unsubscribe(&session_id).await,
            };
            if result.is_ok() {
                if let Some(client) = client.upgrade() {
                    let label = client.sessions.label(group, &session_id);
                    client.sessions.unregister(group, &session_id);
                    debug!(session_id = %session_id, group = ?group, label = ?label, "Session ended");
                }
            }
            queue.post_fn(move || on_done(result));
        });
    }

    /// Stop sending (publication) or receiving (subscription) `kind` tracks
    pub fn mute(
        &self,
        session_id: &str,
        kind: TrackKind,
        on_done: impl FnOnce(ConferenceResult<()>) + Send + 'static,
    ) {
        self.toggle_tracks(session_id, kind, TrackAction::Pause, on_done);
    }

    pub fn unmute(
        &self,
        session_id: &str,
        kind: TrackKind,
        on_done: impl FnOnce(ConferenceResult<()>) + Send + 'static,
    ) {
        self.toggle_tracks(session_id, kind, TrackAction::Play, on_done);
    }

    fn toggle_tracks(
        &self,
        session_id: &str,
        kind: TrackKind,
        action: TrackAction,
        on_done: impl FnOnce(ConferenceResult<()>) + Send + 'static,
    ) {
        if !self.is_joined() {
            self.fail(on_done, ConferenceError::NotConnected);
            return;
        }
        let Some(channel) = self.sessions.lookup(session_id) else {
            self.fail(
                on_done,
                ConferenceError::not_found(format!("Invalid session id {session_id}")),
            );
            return;
        };

        debug!(session_id, kind = ?kind, action = ?action, "Toggling tracks");
        let queue = self.queue.clone();
        tokio::spawn(async move {
            let result = toggle(channel.as_ref(), kind, action).await;
            queue.post_fn(move || on_done(result));
        });
    }

    /// Fetch transport statistics of a publication or subscription
    pub fn connection_stats(
        &self,
        session_id: &str,
        on_done: impl FnOnce(ConferenceResult<ConnectionStats>) + Send + 'static,
    ) {
        let Some(channel) = self.sessions.lookup(session_id) else {
            warn!(session_id, "Tried to get connection statistics from unknown session");
            self.fail(
                on_done,
                ConferenceError::not_found("Stream is not published or subscribed"),
            );
            return;
        };
        let queue = self.queue.clone();
        tokio::spawn(async move {
            let result = channel.connection_stats().await;
            queue.post_fn(move || on_done(result));
        });
    }
}

async fn toggle(
    channel: &dyn ConferenceChannel,
    kind: TrackKind,
    action: TrackAction,
) -> ConferenceResult<()> {
    match (action, kind) {
        (TrackAction::Pause, TrackKind::Audio) => channel.pause_audio().await,
        (TrackAction::Pause, TrackKind::Video) => channel.pause_video().await,
        (TrackAction::Pause, TrackKind::AudioAndVideo) => channel.pause_audio_video().await,
        (TrackAction::Play, TrackKind::Audio) => channel.play_audio().await,
        (TrackAction::Play, TrackKind::Video) => channel.play_video().await,
        (TrackAction::Play, TrackKind::AudioAndVideo) => channel.play_audio_video().await,
    }
}
