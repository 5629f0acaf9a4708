//! Real-time deal chat over the message broker.
//!
//! The broker multiplexes every direct and group message of a deal onto one
//! topic. [`channel::ConversationChannel`] owns one connection and one
//! subscription per open deal room and rebuilds the viewer's conversation
//! with the pure [`filter::is_relevant`] rule.

pub mod channel;
pub mod config;
pub mod connection;
pub mod error;
pub mod filter;
pub mod memory;
pub mod stomp;
pub mod transcript;
pub mod transport;

pub use channel::ConversationChannel;
pub use config::GatewayConfig;
pub use connection::{StompConnector, StompTransport};
pub use error::GatewayError;
pub use filter::{ConversationScope, is_relevant};
pub use memory::{MemoryBroker, MemoryConnection};
pub use transcript::Transcript;
pub use transport::{Connector, PubSub, Subscription};
