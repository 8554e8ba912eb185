//! Constants for the completions API
//!
//! JSON field names and endpoint paths the proxy inspects, kept in one
//! place so request parsing, usage extraction and tests agree.

/// JSON field names used in request and response bodies
pub mod json_fields {
    /// Top-level request field naming the end user
    pub const USER: &str = "user";
}

/// Path constants for routing decisions
pub mod paths {
    /// Chat completions endpoint, relative to the upstream base URL
    pub const CHAT_COMPLETIONS: &str = "/chat/completions";
}

/// Default upstream values
pub mod upstream {
    pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
}
