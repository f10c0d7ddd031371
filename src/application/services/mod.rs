//! Application Services

mod chat_service;
mod moderation;
mod session_resolver;

pub use chat_service::{ChatService, ConnectionContext};
pub use moderation::ModerationGate;
pub use session_resolver::{Credential, SessionResolver, TokenClaims};
