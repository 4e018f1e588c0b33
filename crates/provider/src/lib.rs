//! External real-time chat provider boundary.
//!
//! Delivery, presence and typing stay inside the provider; the core only
//! connects an identity, queries channels by membership and tenant tag, and
//! reads or posts messages per channel.

pub mod client;
pub mod error;
pub mod types;

pub use {
    client::{ChatProvider, StreamProvider},
    error::ProviderError,
    types::{
        ChannelHistory, ChannelQuery, NewProviderChannel, ProviderChannel, ProviderIdentity,
        ProviderMessage, ProviderUser, channel_id_for,
    },
};
