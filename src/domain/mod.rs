//! Domain types for Usage Relay
//!
//! The audit records that leave the proxy, independent of how they are
//! captured or where they are delivered.

pub mod audit_logging;

pub use audit_logging::*;
