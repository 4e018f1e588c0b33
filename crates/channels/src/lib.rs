//! Channel and message resolution.
//!
//! [`ChannelResolver`] decides, per tenant and per channel, whether data comes
//! from the primary backend, the external chat provider or static fixtures.
//! [`MessageGateway`] writes through whichever source a channel resolved to
//! and keeps the session's ordered view.

pub mod fixtures;
pub mod link;
pub mod messages;
pub mod resolver;

#[cfg(test)]
mod testing;

pub use {
    link::{LinkError, ProviderLink},
    messages::MessageGateway,
    resolver::ChannelResolver,
};
