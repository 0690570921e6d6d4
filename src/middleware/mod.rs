//! Middleware module
//!
//! This module contains request extractors and layers shared by all routes

pub mod auth;
pub mod logging;
pub mod rate_limit;

// Re-export commonly used middleware
pub use auth::{AuthUser, StaffUser};
pub use logging::{cors_layer, http_trace_layer};
pub use rate_limit::LoginRateLimiter;
