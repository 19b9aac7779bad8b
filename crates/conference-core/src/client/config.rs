//! Client and channel configuration
//!
//! [`ConferenceClientConfig`] is supplied once when the client is built. Every
//! publish or subscribe session then gets its own [`ChannelConfiguration`],
//! derived from the client configuration and extended with the codec
//! preferences the caller passed for that session.
//!
//! # Examples
//!
//! ```rust
//! use rvoip_conference_core::{CandidateNetworkPolicy, ConferenceClientConfig, IceServer};
//!
//! let config = ConferenceClientConfig::new()
//!     .with_ice_server(IceServer::new(vec!["stun:stun.example.org:3478".to_string()]))
//!     .with_ice_server(
//!         IceServer::new(vec!["turn:turn.example.org:3478?transport=udp".to_string()])
//!             .with_credentials("user", "secret"),
//!     )
//!     .with_candidate_network_policy(CandidateNetworkPolicy::LowCost);
//!
//! assert_eq!(config.ice_servers.len(), 2);
//! ```

use serde::{Deserialize, Serialize};

use crate::media::{AudioEncodingParameters, VideoEncodingParameters};

/// STUN or TURN server descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServer {
    /// Server URLs, e.g. `stun:host:3478` or `turn:host:3478?transport=tcp`
    pub urls: Vec<String>,
    /// TURN user name, empty for STUN servers
    #[serde(default)]
    pub username: String,
    /// TURN credential, empty for STUN servers
    #[serde(default)]
    pub password: String,
}

impl IceServer {
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            urls,
            ..Default::default()
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }
}

/// Which network interfaces ICE may gather candidates on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandidateNetworkPolicy {
    /// Gather on every interface
    #[default]
    All,
    /// Skip interfaces considered expensive, such as cellular
    LowCost,
}

/// Configuration of a conference client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConferenceClientConfig {
    /// ICE servers handed to every session channel
    #[serde(default)]
    pub ice_servers: Vec<IceServer>,
    /// Candidate gathering policy handed to every session channel
    #[serde(default)]
    pub candidate_network_policy: CandidateNetworkPolicy,
}

impl ConferenceClientConfig {
    /// Configuration without ICE servers, gathering on all interfaces
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an ICE server
    ///
    /// Servers are handed to channels in the order they were added.
    pub fn with_ice_server(mut self, server: IceServer) -> Self {
        self.ice_servers.push(server);
        self
    }

    /// Replace the whole ICE server list
    pub fn with_ice_servers(mut self, servers: Vec<IceServer>) -> Self {
        self.ice_servers = servers;
        self
    }

    pub fn with_candidate_network_policy(mut self, policy: CandidateNetworkPolicy) -> Self {
        self.candidate_network_policy = policy;
        self
    }

    /// Baseline configuration for a new session channel
    pub fn channel_configuration(&self) -> ChannelConfiguration {
        ChannelConfiguration {
            ice_servers: self.ice_servers.clone(),
            candidate_network_policy: self.candidate_network_policy,
            audio: Vec::new(),
            video: Vec::new(),
        }
    }
}

/// Configuration of one publish or subscribe channel
///
/// `audio` and `video` list encoding preferences in priority order; the first
/// entry wins codec negotiation when the far end supports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfiguration {
    pub ice_servers: Vec<IceServer>,
    pub candidate_network_policy: CandidateNetworkPolicy,
    pub audio: Vec<AudioEncodingParameters>,
    pub video: Vec<VideoEncodingParameters>,
}
