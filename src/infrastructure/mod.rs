//! Infrastructure Layer
//!
//! Implementations for external services:
//! - PostgreSQL repositories
//! - Redis session cache
//! - Prometheus metrics

pub mod cache;
pub mod database;
pub mod metrics;
pub mod repositories;
