//! Codec, capability and settings types carried by streams
//!
//! A remote stream advertises two things: the single configuration it is
//! currently published with ([`PublicationSettings`]) and the option sets a
//! subscriber may ask the server to transcode into
//! ([`SubscriptionCapabilities`]).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Audio codec names understood by the conference server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioCodec {
    Pcmu,
    Pcma,
    Opus,
    G722,
    Isac,
    Ilbc,
    Aac,
    Ac3,
    Asao,
    Unknown,
}

impl AudioCodec {
    /// Map a wire codec name, case-insensitively. Unrecognized names map to
    /// [`AudioCodec::Unknown`].
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "pcmu" => Self::Pcmu,
            "pcma" => Self::Pcma,
            "opus" => Self::Opus,
            "g722" => Self::G722,
            "isac" => Self::Isac,
            "ilbc" => Self::Ilbc,
            "aac" => Self::Aac,
            "ac3" => Self::Ac3,
            "asao" | "nellymoser" => Self::Asao,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pcmu => "PCMU",
            Self::Pcma => "PCMA",
            Self::Opus => "opus",
            Self::G722 => "G722",
            Self::Isac => "ISAC",
            Self::Ilbc => "ILBC",
            Self::Aac => "AAC",
            Self::Ac3 => "AC3",
            Self::Asao => "ASAO",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Video codec names understood by the conference server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoCodec {
    Vp8,
    Vp9,
    H264,
    H265,
    Unknown,
}

impl VideoCodec {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "vp8" => Self::Vp8,
            "vp9" => Self::Vp9,
            "h264" => Self::H264,
            "h265" => Self::H265,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vp8 => "VP8",
            Self::Vp9 => "VP9",
            Self::H264 => "H264",
            Self::H265 => "H265",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audio codec with its sampling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioCodecParameters {
    pub name: AudioCodec,
    /// Number of channels, 0 when not advertised
    pub channel_count: u32,
    /// Sampling rate in Hz, 0 when not advertised
    pub clock_rate: u32,
}

impl AudioCodecParameters {
    pub fn new(name: AudioCodec, channel_count: u32, clock_rate: u32) -> Self {
        Self {
            name,
            channel_count,
            clock_rate,
        }
    }
}

impl From<AudioCodec> for AudioCodecParameters {
    fn from(name: AudioCodec) -> Self {
        Self::new(name, 0, 0)
    }
}

/// Video codec with an optional profile (e.g. H.264 `CB`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoCodecParameters {
    pub name: VideoCodec,
    pub profile: Option<String>,
}

impl VideoCodecParameters {
    pub fn new(name: VideoCodec, profile: Option<String>) -> Self {
        Self { name, profile }
    }
}

impl From<VideoCodec> for VideoCodecParameters {
    fn from(name: VideoCodec) -> Self {
        Self::new(name, None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioSubscriptionCapabilities {
    pub codecs: Vec<AudioCodecParameters>,
}

/// Video options a subscriber may request from the server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoSubscriptionCapabilities {
    pub codecs: Vec<VideoCodecParameters>,
    pub resolutions: Vec<Resolution>,
    pub frame_rates: Vec<f64>,
    /// Relative to the published bitrate; wire tokens look like `x0.8`
    pub bitrate_multipliers: Vec<f64>,
    pub keyframe_intervals: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionCapabilities {
    pub audio: AudioSubscriptionCapabilities,
    pub video: VideoSubscriptionCapabilities,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioPublicationSettings {
    pub codec: AudioCodecParameters,
}

/// Currently active video configuration of a published stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoPublicationSettings {
    pub codec: VideoCodecParameters,
    pub resolution: Option<Resolution>,
    /// 0 when not advertised
    pub frame_rate: f64,
    /// kbps, 0 when not advertised
    pub bitrate: f64,
    /// seconds, 0 when not advertised
    pub keyframe_interval: f64,
}

impl VideoPublicationSettings {
    pub fn new(codec: VideoCodecParameters) -> Self {
        Self {
            codec,
            resolution: None,
            frame_rate: 0.0,
            bitrate: 0.0,
            keyframe_interval: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicationSettings {
    pub audio: Option<AudioPublicationSettings>,
    pub video: Option<VideoPublicationSettings>,
}

/// Encoding preference passed to a channel, in priority order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioEncodingParameters {
    pub codec: AudioCodecParameters,
    /// kbps, 0 leaves the choice to the encoder
    pub max_bitrate: u32,
}

impl AudioEncodingParameters {
    pub fn new(codec: impl Into<AudioCodecParameters>, max_bitrate: u32) -> Self {
        Self {
            codec: codec.into(),
            max_bitrate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoEncodingParameters {
    pub codec: VideoCodecParameters,
    pub max_bitrate: u32,
    pub hardware_accelerated: bool,
}

impl VideoEncodingParameters {
    pub fn new(
        codec: impl Into<VideoCodecParameters>,
        max_bitrate: u32,
        hardware_accelerated: bool,
    ) -> Self {
        Self {
            codec: codec.into(),
            max_bitrate,
            hardware_accelerated,
        }
    }
}

/// Which tracks a mute/unmute request applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackKind {
    Audio,
    Video,
    AudioAndVideo,
}

impl FromStr for TrackKind {
    type Err = crate::ConferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(Self::Audio),
            "video" => Ok(Self::Video),
            "audio-video" | "av" => Ok(Self::AudioAndVideo),
            other => Err(crate::ConferenceError::invalid_argument(format!(
                "unrecognized track kind `{}`",
                other
            ))),
        }
    }
}
