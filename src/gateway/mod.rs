//! # Realtime Gateway Core
//!
//! Transport-agnostic pieces of the realtime system: the connection
//! registry with per-connection outbound queues, the presence tracker,
//! the room router, and the wire event taxonomy. The WebSocket plumbing
//! in the presentation layer drives these; the message pipeline fans out
//! through them.

pub mod events;
pub mod presence;
pub mod registry;
pub mod rooms;

pub use events::{ClientEvent, ClientType, ConnectionId, IdentifyFrame, ServerEvent, WireCredential};
pub use presence::PresenceTracker;
pub use registry::{ConnectedClient, Gateway};
pub use rooms::RoomRouter;
