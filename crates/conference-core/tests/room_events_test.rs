//! Live room event tests
//!
//! Covers:
//! - Participant and stream notifications through entity observers
//! - Mixed stream layout updates
//! - Malformed and duplicate events leaving the model untouched
//! - Mistyped optional stream details falling back to defaults

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use common::{camera_stream, mixed_stream, participant, EventLog, Harness};
use rvoip_conference_core::{
    AudioCodec, AudioSourceInfo, ParticipantObserver, RemoteStreamType, Stream, StreamObserver,
    VideoCodec, VideoSourceInfo,
};

struct EntityObserver {
    name: &'static str,
    log: EventLog,
}

#[async_trait]
impl ParticipantObserver for EntityObserver {
    async fn on_left(&self) {
        self.log.push(format!("{}:left", self.name));
    }
}

#[async_trait]
impl StreamObserver for EntityObserver {
    async fn on_ended(&self) {
        self.log.push(format!("{}:ended", self.name));
    }

    async fn on_video_layout_changed(&self) {
        self.log.push(format!("{}:layout", self.name));
    }
}

#[tokio::test]
async fn test_participant_join_and_leave() {
    let harness = Harness::joined().await;
    let conference = harness.client.conference_info().unwrap();

    harness.signaling.emit(|o| o.on_user_joined(participant("p2", "carol")));
    let p2 = conference.participant("p2").expect("participant added");
    p2.add_observer(Arc::new(EntityObserver {
        name: "p2",
        log: harness.log.clone(),
    }));

    // Both wire shapes of user left are accepted
    harness.signaling.emit(|o| o.on_user_left(json!("p2")));
    harness.signaling.emit(|o| o.on_user_left(json!({ "id": "p1" })));
    harness.flush().await;

    assert_eq!(harness.log.entries(), vec!["participant_joined:p2", "p2:left"]);
    assert!(!conference.participant_present("p2"));
    assert!(!conference.participant_present("p1"));
}

#[tokio::test]
async fn test_duplicate_and_unknown_participants_are_ignored() {
    let harness = Harness::joined().await;
    let conference = harness.client.conference_info().unwrap();

    harness.signaling.emit(|o| o.on_user_joined(participant("p1", "bob")));
    harness.signaling.emit(|o| o.on_user_left(json!("stranger")));
    harness.flush().await;

    assert!(harness.log.entries().is_empty());
    assert_eq!(conference.participants().len(), 2);
}

#[tokio::test]
async fn test_stream_added_and_removed() {
    let harness = Harness::joined().await;
    let conference = harness.client.conference_info().unwrap();

    harness.signaling.emit(|o| o.on_stream_added(camera_stream("s2", "p1")));
    let stream = conference.remote_stream("s2").expect("stream added");
    stream.add_observer(Arc::new(EntityObserver {
        name: "s2",
        log: harness.log.clone(),
    }));

    harness.signaling.emit(|o| o.on_stream_removed(json!({ "id": "s2" })));
    // Second removal is a no-op
    harness.signaling.emit(|o| o.on_stream_removed(json!({ "id": "s2" })));
    harness.flush().await;

    assert_eq!(harness.log.entries(), vec!["stream_added:s2", "s2:ended"]);
    assert!(stream.ended());
    assert!(!conference.remote_stream_present("s2"));
}

#[tokio::test]
async fn test_forward_stream_details() {
    let harness = Harness::joined().await;
    let stream = harness.client.conference_info().unwrap().remote_stream("s1").unwrap();

    assert_eq!(stream.attributes().get("a").map(String::as_str), Some("1"));
    assert_eq!(stream.attributes().get("b").map(String::as_str), Some("2"));
    assert_eq!(stream.attributes().len(), 2);
    assert!(stream.has_audio());
    assert!(stream.has_video());
    assert_eq!(stream.source().audio, AudioSourceInfo::Mic);
    assert_eq!(stream.source().video, VideoSourceInfo::Camera);

    let settings = stream.publication_settings();
    let audio = settings.audio.as_ref().unwrap();
    assert_eq!(audio.codec.name, AudioCodec::Opus);
    assert_eq!(audio.codec.clock_rate, 48000);
    assert_eq!(audio.codec.channel_count, 2);
    assert_eq!(settings.video.as_ref().unwrap().codec.name, VideoCodec::Vp8);
}

#[tokio::test]
async fn test_screen_share_stream() {
    let harness = Harness::joined().await;
    harness.signaling.emit(|o| {
        o.on_stream_added(json!({
            "id": "sc1",
            "type": "forward",
            "info": { "owner": "p1" },
            "media": { "video": { "source": "screen-cast", "format": { "codec": "vp9" } } }
        }))
    });

    let stream = harness.client.conference_info().unwrap().remote_stream("sc1").unwrap();
    assert_eq!(stream.stream_type(), RemoteStreamType::Screen);
    assert!(stream.has_video());
    assert!(!stream.has_audio());
    assert!(stream.attributes().is_empty());
}

#[tokio::test]
async fn test_mixed_stream_layout_change() {
    let harness = Harness::joined().await;
    harness.signaling.emit(|o| o.on_stream_added(mixed_stream("m1")));

    let conference = harness.client.conference_info().unwrap();
    let mixed = conference.remote_stream("m1").unwrap();
    assert_eq!(mixed.stream_type(), RemoteStreamType::Mixed);
    assert_eq!(mixed.origin(), "mcu");
    assert_eq!(mixed.view(), Some("common"));

    mixed.add_observer(Arc::new(EntityObserver {
        name: "m1",
        log: harness.log.clone(),
    }));
    conference
        .remote_stream("s1")
        .unwrap()
        .add_observer(Arc::new(EntityObserver {
            name: "s1",
            log: harness.log.clone(),
        }));

    let update = |id: &str, field: &str| json!({ "id": id, "event": { "field": field } });
    harness.signaling.emit(|o| o.on_stream_updated(update("m1", "video.layout")));
    // Only layout updates of mixed streams are reported
    harness.signaling.emit(|o| o.on_stream_updated(update("m1", "audio.status")));
    harness.signaling.emit(|o| o.on_stream_updated(update("s1", "video.layout")));
    harness.signaling.emit(|o| o.on_stream_updated(update("unknown", "video.layout")));
    harness.flush().await;

    assert_eq!(harness.log.entries(), vec!["stream_added:m1", "m1:layout"]);
}

#[tokio::test]
async fn test_malformed_events_change_nothing() {
    let harness = Harness::joined().await;
    let conference = harness.client.conference_info().unwrap();

    let mut no_codec = camera_stream("bad1", "p1");
    no_codec["media"]["video"]["format"]
        .as_object_mut()
        .unwrap()
        .remove("codec");
    let mut bad_bitrate = camera_stream("bad2", "p1");
    bad_bitrate["media"]["video"]["optional"] =
        json!({ "parameters": { "bitrate": ["x0.8", "1.2"] } });

    harness.signaling.emit(|o| o.on_stream_added(no_codec.clone()));
    harness.signaling.emit(|o| o.on_stream_added(bad_bitrate.clone()));
    harness.signaling.emit(|o| o.on_stream_added(json!({ "id": "bad3", "type": "sip", "media": {} })));
    harness.signaling.emit(|o| o.on_stream_added(json!("not an object")));
    harness.signaling.emit(|o| o.on_user_joined(json!({ "id": "p9", "user": 7, "role": "guest" })));
    harness.signaling.emit(|o| o.on_stream_removed(json!({ "stream": "s1" })));
    harness.signaling.emit(|o| o.on_stream_updated(json!({ "id": "s1" })));
    harness.flush().await;

    assert!(harness.log.entries().is_empty());
    assert_eq!(conference.remote_streams().len(), 1);
    assert_eq!(conference.participants().len(), 2);
    assert!(conference.remote_stream_present("s1"));
}

#[tokio::test]
async fn test_mistyped_optional_details_keep_the_stream() {
    let harness = Harness::joined().await;
    let mut stream = camera_stream("s4", "p1");
    stream["media"]["video"]["parameters"] = json!({ "bitrate": "unspecified", "framerate": 24 });
    stream["media"]["video"]["source"] = json!(3);
    stream["media"]["audio"] = json!({ "format": { "codec": "opus" }, "optional": "none" });
    harness.signaling.emit(|o| o.on_stream_added(stream.clone()));
    harness.flush().await;

    assert_eq!(harness.log.entries(), vec!["stream_added:s4"]);
    let stream = harness.client.conference_info().unwrap().remote_stream("s4").unwrap();
    assert!(stream.has_audio());
    assert!(stream.has_video());
    assert_eq!(stream.source().video, VideoSourceInfo::Unknown);
    let video = stream.publication_settings().video.as_ref().unwrap();
    assert_eq!(video.bitrate, 0.0);
    assert_eq!(video.frame_rate, 24.0);
}

#[tokio::test]
async fn test_subscription_capabilities_are_parsed() {
    let harness = Harness::joined().await;
    let mut stream = camera_stream("s3", "p1");
    stream["media"]["video"]["optional"] = json!({
        "format": [ { "codec": "h264", "profile": "B" } ],
        "parameters": {
            "resolution": [ { "width": 640, "height": 480 } ],
            "framerate": [ 15, 30 ],
            "bitrate": [ "x0.8", "x1.2" ],
            "keyFrameInterval": [ 100 ]
        }
    });
    harness.signaling.emit(|o| o.on_stream_added(stream.clone()));

    let stream = harness.client.conference_info().unwrap().remote_stream("s3").unwrap();
    let video = &stream.subscription_capabilities().video;
    assert_eq!(video.codecs[0].name, VideoCodec::H264);
    assert_eq!(video.codecs[0].profile.as_deref(), Some("B"));
    assert_eq!(video.resolutions[0].width, 640);
    assert_eq!(video.frame_rates, vec![15.0, 30.0]);
    assert_eq!(video.bitrate_multipliers, vec![0.8, 1.2]);
    assert_eq!(video.keyframe_intervals, vec![100.0]);
}
