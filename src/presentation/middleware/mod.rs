//! Middleware

pub mod cors;
pub mod logging;
