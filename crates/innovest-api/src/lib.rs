//! REST client for the marketplace service.
//!
//! A [`Session`] is the single authenticated context: it is created by
//! [`ApiClient::login`] or [`ApiClient::resume`], passed by reference to
//! everything that makes authenticated calls, and consumed by
//! [`Session::logout`]. The traits in each module are the seams the deal
//! room and chat layers depend on.

pub mod access;
pub mod auth;
pub mod config;
pub mod deals;
pub mod error;
pub mod files;
pub mod mandates;
pub mod messages;

pub use access::AccessAuthority;
pub use auth::{ApiClient, Session};
pub use config::ApiConfig;
pub use deals::DealSource;
pub use error::{ApiError, ErrorKind};
pub use files::DocumentStore;
pub use mandates::MandateDesk;
pub use messages::ChatHistory;
