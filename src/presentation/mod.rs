//! Presentation Layer
//!
//! HTTP routes and the WebSocket gateway endpoint.

pub mod http;
pub mod middleware;
pub mod websocket;
