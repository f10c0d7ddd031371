//! Repository Implementations
//!
//! PostgreSQL implementations of the domain repository traits. Each
//! repository owns data access for one entity type; rows are mapped
//! through `sqlx::FromRow` structs rather than deriving directly on the
//! domain entities.

pub mod message_repository;
pub mod moderation_repository;
pub mod notification_repository;
pub mod private_message_repository;
pub mod reaction_repository;
pub mod read_state_repository;
pub mod room_repository;
pub mod session_repository;
pub mod user_repository;

pub use message_repository::PgMessageRepository;
pub use moderation_repository::PgModerationRepository;
pub use notification_repository::PgNotificationRepository;
pub use private_message_repository::PgPrivateMessageRepository;
pub use reaction_repository::PgReactionRepository;
pub use read_state_repository::PgReadStateRepository;
pub use room_repository::PgRoomRepository;
pub use session_repository::PgSessionRepository;
pub use user_repository::PgUserRepository;
