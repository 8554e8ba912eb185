//! Knowledge of the upstream completions API
//!
//! The proxy forwards everything blindly; this module holds the little it
//! needs to understand about the upstream's payloads for usage accounting.

pub mod constants;
pub mod response_processor;

pub use response_processor::{UsageEndpoint, UsageExtractor, UsageRecord};
