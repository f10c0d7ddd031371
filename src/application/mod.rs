//! # Application Layer
//!
//! Chat services: credential resolution, the moderation gate, and the
//! message pipeline.

pub mod services;

pub use services::*;
