//! Builder for [`ConferenceClient`]
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rvoip_conference_core::{
//!     ConferenceClientBuilder, IceServer, MediaFactory, SignalingChannel,
//! };
//!
//! # fn example(signaling: Arc<dyn SignalingChannel>, factory: Arc<dyn MediaFactory>) {
//! let client = ConferenceClientBuilder::new()
//!     .ice_server(IceServer::new(vec!["stun:stun.example.org:3478".to_string()]))
//!     .signaling(signaling)
//!     .media_factory(factory)
//!     .build()
//!     .expect("both collaborators were supplied");
//! # }
//! ```

use std::sync::Arc;

use crate::client::config::{CandidateNetworkPolicy, ConferenceClientConfig, IceServer};
use crate::client::manager::ConferenceClient;
use crate::error::{ConferenceError, ConferenceResult};
use crate::transport::{MediaFactory, SignalingChannel};

/// Fluent builder assembling a client from its configuration and collaborators
#[derive(Default)]
pub struct ConferenceClientBuilder {
    config: ConferenceClientConfig,
    signaling: Option<Arc<dyn SignalingChannel>>,
    factory: Option<Arc<dyn MediaFactory>>,
}

impl ConferenceClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: ConferenceClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn ice_server(mut self, server: IceServer) -> Self {
        self.config.ice_servers.push(server);
        self
    }

    pub fn candidate_network_policy(mut self, policy: CandidateNetworkPolicy) -> Self {
        self.config.candidate_network_policy = policy;
        self
    }

    /// Connection to the conference server (required)
    pub fn signaling(mut self, signaling: Arc<dyn SignalingChannel>) -> Self {
        self.signaling = Some(signaling);
        self
    }

    /// Factory for capture sources and session channels (required)
    pub fn media_factory(mut self, factory: Arc<dyn MediaFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Build the client. Must be called from within a tokio runtime.
    pub fn build(self) -> ConferenceResult<Arc<ConferenceClient>> {
        let signaling = self
            .signaling
            .ok_or_else(|| ConferenceError::invalid_argument("signaling channel is required"))?;
        let factory = self
            .factory
            .ok_or_else(|| ConferenceError::invalid_argument("media factory is required"))?;
        Ok(ConferenceClient::new(self.config, signaling, factory))
    }
}
