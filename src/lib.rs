//! # Parley Server Library
//!
//! This crate provides a multi-room real-time chat server with:
//! - WebSocket gateway for real-time messaging, presence, and typing
//! - Dual-credential connection authentication (session cookies and signed tokens)
//! - Moderation gate (mute/ban/block) consulted on every inbound message
//! - PostgreSQL as the system of record, Redis for session caching
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Core entities and repository traits
//! - **Application Layer**: Session resolver, moderation gate, message pipeline
//! - **Gateway Layer**: Transport-agnostic realtime core (registry, presence, rooms)
//! - **Infrastructure Layer**: Database and cache implementations
//! - **Presentation Layer**: HTTP routes and the WebSocket connection handler
//!
//! ## Module Structure
//!
//! ```text
//! parley_server/
//! +-- config/         Configuration management
//! +-- domain/         Entities and repository traits
//! +-- application/    Session resolver, moderation gate, message pipeline
//! +-- gateway/        Connection registry, presence tracker, room router
//! +-- infrastructure/ Database, cache, and metrics implementations
//! +-- presentation/   HTTP routes and WebSocket handler
//! +-- shared/         Common utilities (errors, snowflake IDs, text scanning)
//! ```

// Configuration module
pub mod config;

// Domain layer - Entities and repository traits
pub mod domain;

// Application layer - Chat services
pub mod application;

// Realtime core - connection registry, presence, rooms, events
pub mod gateway;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
