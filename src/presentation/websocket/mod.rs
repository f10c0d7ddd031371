//! WebSocket Gateway Endpoint
//!
//! Socket lifecycle: identify handshake, event dispatch, and disconnect
//! cleanup. The wire protocol itself lives in `crate::gateway::events`.

pub mod handler;

pub use handler::{admit_connection, disconnect, ws_handler, Admission};
