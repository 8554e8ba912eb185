//! Proxy module for relaying completions API calls
//!
//! This module implements the two paths of every call:
//! - Hot path: read the request once, forward it, stream the response back
//! - Audit path: publish request, response and usage records off to the side

pub mod audit_path;
pub mod error_response;
pub mod headers;
pub mod hot_path;
pub mod interceptor;
pub mod middleware;
pub mod service;
pub mod streaming;
pub mod types;
pub mod url_resolver;

#[cfg(test)]
pub(crate) mod test_utils;


pub use service::ProxyService;
pub use types::{ProxyConfig, ProxyError, ProxyResult};
