//! Conference client
//!
//! [`ConferenceClient`] joins a conference over a [`SignalingChannel`], keeps
//! the [`ConferenceInfo`] model in sync with room events and drives one
//! [`ConferenceChannel`] per publication or subscription.
//!
//! [`SignalingChannel`]: crate::SignalingChannel
//! [`ConferenceInfo`]: crate::ConferenceInfo
//! [`ConferenceChannel`]: crate::ConferenceChannel

pub mod builder;
pub mod config;
pub mod events;
pub mod manager;
pub(crate) mod registry;
pub mod sessions;
pub mod types;


pub use builder::ConferenceClientBuilder;
pub use config::{CandidateNetworkPolicy, ChannelConfiguration, ConferenceClientConfig, IceServer};
pub use manager::{ConferenceClient, ConnectionState};
pub use types::{
    AudioSubscriptionConstraints, ConnectionStats, Publication, PublishOptions, SubscribeOptions,
    Subscription, VideoSubscriptionConstraints,
};
