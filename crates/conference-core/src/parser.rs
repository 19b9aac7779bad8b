//! Decoding of untyped signaling payloads
//!
//! Payloads arrive from the signaling channel as generic [`serde_json::Value`]
//! trees. The functions here turn them into typed participants, remote streams
//! and channel signals, validating the shape of every required member before
//! using it. A function either returns a complete value or a [`ParseError`];
//! it never yields a partially filled entity and never touches client state.
//!
//! Optional members (profiles, resolutions, rates, the `optional` capability
//! blocks) default to absent or zero when missing. A mistyped optional member
//! is logged and treated as missing, and a mistyped element of an optional
//! list is skipped. Required members stay strict, as do bitrate multiplier
//! tokens.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ParseError;
use crate::media::{
    AudioCodec, AudioCodecParameters, AudioPublicationSettings, PublicationSettings, Resolution,
    SubscriptionCapabilities, VideoCodec, VideoCodecParameters, VideoPublicationSettings,
};
use crate::participant::Participant;
use crate::stream::{
    AudioSourceInfo, MIXED_STREAM_ORIGIN, RemoteStream, RemoteStreamKind, StreamSourceInfo,
    VideoSourceInfo,
};
use crate::transport::ChannelSignal;

type Object = Map<String, Value>;

fn as_object<'a>(value: &'a Value, field: &str) -> Result<&'a Object, ParseError> {
    value
        .as_object()
        .ok_or_else(|| ParseError::wrong_type(field, "an object"))
}

fn required<'a>(obj: &'a Object, field: &str, path: &str) -> Result<&'a Value, ParseError> {
    match obj.get(field) {
        Some(Value::Null) | None => Err(ParseError::missing(path)),
        Some(value) => Ok(value),
    }
}

fn required_str<'a>(obj: &'a Object, field: &str, path: &str) -> Result<&'a str, ParseError> {
    required(obj, field, path)?
        .as_str()
        .ok_or_else(|| ParseError::wrong_type(path, "a string"))
}

fn required_object<'a>(obj: &'a Object, field: &str, path: &str) -> Result<&'a Object, ParseError> {
    as_object(required(obj, field, path)?, path)
}

fn optional<'a>(obj: &'a Object, field: &str) -> Option<&'a Value> {
    obj.get(field).filter(|v| !v.is_null())
}

/// Log a malformed optional member and treat it as missing
fn lenient<T>(result: Result<T, ParseError>) -> Option<T> {
    result
        .map_err(|e| warn!(error = %e, "Ignoring malformed optional member"))
        .ok()
}

fn optional_str<'a>(obj: &'a Object, field: &str, path: &str) -> Option<&'a str> {
    optional(obj, field)
        .and_then(|v| lenient(v.as_str().ok_or_else(|| ParseError::wrong_type(path, "a string"))))
}

fn optional_object<'a>(obj: &'a Object, field: &str, path: &str) -> Option<&'a Object> {
    optional(obj, field).and_then(|v| lenient(as_object(v, path)))
}

fn optional_array<'a>(obj: &'a Object, field: &str, path: &str) -> &'a [Value] {
    optional(obj, field)
        .and_then(|v| {
            lenient(
                v.as_array()
                    .ok_or_else(|| ParseError::wrong_type(path, "an array")),
            )
        })
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn number(value: &Value, path: &str) -> Result<f64, ParseError> {
    value
        .as_f64()
        .ok_or_else(|| ParseError::wrong_type(path, "a number"))
}

fn optional_number(obj: &Object, field: &str, path: &str) -> f64 {
    optional(obj, field)
        .and_then(|v| lenient(number(v, path)))
        .unwrap_or_default()
}

fn resolution(value: &Value, path: &str) -> Result<Resolution, ParseError> {
    let obj = as_object(value, path)?;
    let width = number(required(obj, "width", path)?, path)?;
    let height = number(required(obj, "height", path)?, path)?;
    Ok(Resolution::new(width as u32, height as u32))
}

/// Decode a participant record. `id`, `user` and `role` must all be strings.
pub fn parse_participant(value: &Value) -> Result<Participant, ParseError> {
    let obj = as_object(value, "participant")?;
    let id = required_str(obj, "id", "id")?;
    let user = required_str(obj, "user", "user")?;
    let role = required_str(obj, "role", "role")?;
    Ok(Participant::new(id, user, role))
}

/// Participant id carried by a "user left" event, either bare or as `{ "id": .. }`
pub fn parse_participant_id(value: &Value) -> Result<String, ParseError> {
    match value {
        Value::String(id) => Ok(id.clone()),
        Value::Object(obj) => required_str(obj, "id", "id").map(str::to_owned),
        _ => Err(ParseError::wrong_type("participant", "a string or an object")),
    }
}

/// Parse a bitrate multiplier token such as `x0.8`
pub fn parse_bitrate_multiplier(token: &str) -> Result<f64, ParseError> {
    let invalid = || ParseError::InvalidValue {
        field: "bitrate".to_owned(),
        value: token.to_owned(),
    };
    let value: f64 = token
        .strip_prefix('x')
        .ok_or_else(invalid)?
        .parse()
        .map_err(|_| invalid())?;
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid());
    }
    Ok(value)
}

/// Collect the string-valued members of `info.attributes`
///
/// Older servers omit attributes entirely, so a missing or mistyped block
/// yields an empty map. Members whose value is not a string are skipped.
pub fn parse_attributes(info: &Object) -> HashMap<String, String> {
    let Some(attributes) = info.get("attributes") else {
        warn!("Cannot find attributes info");
        return HashMap::new();
    };
    let Some(attributes) = attributes.as_object() else {
        warn!("Incorrect attribute format");
        return HashMap::new();
    };
    attributes
        .iter()
        .filter_map(|(key, value)| match value.as_str() {
            Some(value) => Some((key.clone(), value.to_owned())),
            None => {
                warn!(attribute = %key, "Skipping non-string attribute value");
                None
            }
        })
        .collect()
}

struct AudioInfo {
    source: String,
    publication: AudioPublicationSettings,
    capabilities: Vec<AudioCodecParameters>,
}

fn audio_codec_parameters(obj: &Object, path: &str) -> Result<AudioCodecParameters, ParseError> {
    let codec = required_str(obj, "codec", &format!("{path}.codec"))?;
    let clock_rate = optional_number(obj, "sampleRate", &format!("{path}.sampleRate"));
    let channels = optional_number(obj, "channelNum", &format!("{path}.channelNum"));
    Ok(AudioCodecParameters::new(
        AudioCodec::from_name(codec),
        channels as u32,
        clock_rate as u32,
    ))
}

fn parse_audio(audio: &Object) -> Result<AudioInfo, ParseError> {
    let source = optional_str(audio, "source", "media.audio.source").unwrap_or_default();
    let format = required_object(audio, "format", "media.audio.format")?;
    let codec = audio_codec_parameters(format, "media.audio.format")?;

    let mut capabilities = Vec::new();
    if let Some(optional) = optional_object(audio, "optional", "media.audio.optional") {
        const PATH: &str = "media.audio.optional.format";
        for format in optional_array(optional, "format", PATH) {
            if let Some(format) = lenient(as_object(format, PATH)) {
                capabilities.push(audio_codec_parameters(format, PATH)?);
            }
        }
    }

    Ok(AudioInfo {
        source: source.to_owned(),
        publication: AudioPublicationSettings { codec },
        capabilities,
    })
}

fn video_codec_parameters(obj: &Object, path: &str) -> Result<VideoCodecParameters, ParseError> {
    let codec = required_str(obj, "codec", &format!("{path}.codec"))?;
    let profile = optional_str(obj, "profile", &format!("{path}.profile"));
    Ok(VideoCodecParameters::new(
        VideoCodec::from_name(codec),
        profile.map(str::to_owned),
    ))
}

struct VideoInfo {
    source: String,
    publication: VideoPublicationSettings,
    capabilities: crate::media::VideoSubscriptionCapabilities,
}

fn parse_video(video: &Object) -> Result<VideoInfo, ParseError> {
    let source = optional_str(video, "source", "media.video.source").unwrap_or_default();
    let format = required_object(video, "format", "media.video.format")?;
    let mut publication = VideoPublicationSettings::new(video_codec_parameters(
        format,
        "media.video.format",
    )?);

    if let Some(params) = optional_object(video, "parameters", "media.video.parameters") {
        publication.resolution = optional(params, "resolution")
            .and_then(|r| lenient(resolution(r, "media.video.parameters.resolution")));
        publication.frame_rate =
            optional_number(params, "framerate", "media.video.parameters.framerate");
        publication.bitrate = optional_number(params, "bitrate", "media.video.parameters.bitrate");
        publication.keyframe_interval = optional_number(
            params,
            "keyFrameInterval",
            "media.video.parameters.keyFrameInterval",
        );
    }

    let mut capabilities = crate::media::VideoSubscriptionCapabilities::default();
    if let Some(optional) = optional_object(video, "optional", "media.video.optional") {
        const FORMAT_PATH: &str = "media.video.optional.format";
        for format in optional_array(optional, "format", FORMAT_PATH) {
            if let Some(format) = lenient(as_object(format, FORMAT_PATH)) {
                capabilities
                    .codecs
                    .push(video_codec_parameters(format, FORMAT_PATH)?);
            }
        }
        if let Some(params) =
            optional_object(optional, "parameters", "media.video.optional.parameters")
        {
            const PATH: &str = "media.video.optional.parameters";
            capabilities.resolutions.extend(
                optional_array(params, "resolution", PATH)
                    .iter()
                    .filter_map(|r| lenient(resolution(r, PATH))),
            );
            capabilities.frame_rates.extend(
                optional_array(params, "framerate", PATH)
                    .iter()
                    .filter_map(|f| lenient(number(f, PATH))),
            );
            for b in optional_array(params, "bitrate", PATH) {
                let Some(token) =
                    lenient(b.as_str().ok_or_else(|| ParseError::wrong_type(PATH, "a string")))
                else {
                    continue;
                };
                capabilities
                    .bitrate_multipliers
                    .push(parse_bitrate_multiplier(token)?);
            }
            capabilities.keyframe_intervals.extend(
                optional_array(params, "keyFrameInterval", PATH)
                    .iter()
                    .filter_map(|k| lenient(number(k, PATH))),
            );
        }
    }

    Ok(VideoInfo {
        source: source.to_owned(),
        publication,
        capabilities,
    })
}

/// Decode a stream advertisement into a [`RemoteStream`]
///
/// `mixed` streams become [`RemoteStreamKind::Mixed`]. `forward` streams become
/// [`RemoteStreamKind::Screen`] when their video source is `screen-cast` and
/// [`RemoteStreamKind::Camera`] otherwise. Any other type is rejected.
pub fn parse_stream(value: &Value) -> Result<RemoteStream, ParseError> {
    let obj = as_object(value, "stream")?;
    let id = required_str(obj, "id", "id")?;
    let media = required_object(obj, "media", "media")?;
    let stream_type = required_str(obj, "type", "type")?;

    enum Advertised<'a> {
        Mixed { view: String },
        Forward { owner: &'a str, attributes: HashMap<String, String> },
    }

    let advertised = match stream_type {
        "mixed" => {
            let view = obj
                .get("info")
                .and_then(Value::as_object)
                .and_then(|info| info.get("label"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned();
            Advertised::Mixed { view }
        }
        "forward" => {
            let info = required_object(obj, "info", "info")?;
            let owner = required_str(info, "owner", "info.owner")?;
            Advertised::Forward {
                owner,
                attributes: parse_attributes(info),
            }
        }
        other => return Err(ParseError::UnsupportedStreamType(other.to_owned())),
    };

    let audio = optional_object(media, "audio", "media.audio")
        .map(parse_audio)
        .transpose()?;
    if audio.is_none() {
        debug!(stream_id = %id, "No audio in stream");
    }
    let video = optional_object(media, "video", "media.video")
        .map(parse_video)
        .transpose()?;
    if video.is_none() {
        debug!(stream_id = %id, "No video in stream");
    }

    let has_audio = audio.is_some();
    let has_video = video.is_some();
    let audio_source = audio.as_ref().map(|a| a.source.clone()).unwrap_or_default();
    let video_source = video.as_ref().map(|v| v.source.clone()).unwrap_or_default();

    let mut capabilities = SubscriptionCapabilities::default();
    let mut settings = PublicationSettings::default();
    if let Some(audio) = audio {
        capabilities.audio.codecs = audio.capabilities;
        settings.audio = Some(audio.publication);
    }
    if let Some(video) = video {
        capabilities.video = video.capabilities;
        settings.video = Some(video.publication);
    }

    let stream = match advertised {
        Advertised::Mixed { view } => RemoteStream::new(
            id,
            MIXED_STREAM_ORIGIN,
            RemoteStreamKind::Mixed { view },
            StreamSourceInfo::new(AudioSourceInfo::Mixed, VideoSourceInfo::Mixed),
            capabilities,
            settings,
        )
        .with_tracks(has_audio, has_video),
        Advertised::Forward { owner, attributes } => {
            let source = StreamSourceInfo::new(
                AudioSourceInfo::from_wire(&audio_source),
                VideoSourceInfo::from_wire(&video_source),
            );
            let screen = video_source == "screen-cast";
            let kind = if screen {
                RemoteStreamKind::Screen
            } else {
                RemoteStreamKind::Camera
            };
            RemoteStream::new(id, owner, kind, source, capabilities, settings)
                .with_tracks(has_audio, has_video || screen)
                .with_attributes(attributes)
        }
    };
    Ok(stream)
}

/// Stream id and the updated field of a `stream updated` event
pub fn parse_stream_update(value: &Value) -> Result<(String, String), ParseError> {
    let obj = as_object(value, "stream")?;
    let id = required_str(obj, "id", "id")?;
    let event = required_object(obj, "event", "event")?;
    let field = required_str(event, "field", "event.field")?;
    Ok((id.to_owned(), field.to_owned()))
}

/// Stream id of a `stream removed` event
pub fn parse_stream_id(value: &Value) -> Result<String, ParseError> {
    let obj = as_object(value, "stream")?;
    required_str(obj, "id", "id").map(str::to_owned)
}

/// Stream id of a server-reported stream error
pub fn parse_stream_error(value: &Value) -> Result<String, ParseError> {
    let obj = as_object(value, "stream")?;
    required_str(obj, "streamId", "streamId").map(str::to_owned)
}

/// Session id and translated signal of a negotiation status message
///
/// The server names the session `peerId` on some messages and `id` on others.
/// Only the `ready`, `error` and `soac` statuses are forwarded; `soac` must
/// carry an object `data` member.
pub fn parse_signaling_message(value: &Value) -> Result<(String, ChannelSignal), ParseError> {
    let obj = as_object(value, "message")?;
    let session_id = match optional(obj, "peerId") {
        Some(peer) => peer
            .as_str()
            .ok_or_else(|| ParseError::wrong_type("peerId", "a string"))?,
        None => required_str(obj, "id", "id")?,
    };
    let status = required_str(obj, "status", "status")?;
    let signal = match status {
        "ready" => ChannelSignal::Ready,
        "error" => ChannelSignal::Failed,
        "soac" => {
            let data = required(obj, "data", "data")?;
            if !data.is_object() {
                return Err(ParseError::wrong_type("data", "an object"));
            }
            ChannelSignal::Negotiation(data.clone())
        }
        other => {
            return Err(ParseError::InvalidValue {
                field: "status".to_owned(),
                value: other.to_owned(),
            });
        }
    };
    Ok((session_id.to_owned(), signal))
}
