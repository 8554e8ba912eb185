//! Usage Relay - an auditing reverse proxy for completions APIs
//!
//! Every inbound call is forwarded to the upstream API untouched (apart from
//! the caller credential), the response is streamed straight back, and
//! request, response and token-usage records are published to an event
//! broker off the critical path.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod providers;
pub mod proxy;

pub use application::Application;
pub use error::{Error, Result};
