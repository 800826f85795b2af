//! HTTP route handlers.

pub mod chain;
pub mod headers;
pub mod health;
