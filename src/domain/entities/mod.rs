//! Domain entities and repository traits.

mod message;
mod moderation;
mod notification;
mod private_message;
mod reaction;
mod read_state;
mod room;
mod session;
mod user;

pub use message::{Message, MessageEdit, MessageRepository};
pub use moderation::{Ban, ModerationRepository, Mute};
pub use notification::{Notification, NotificationRepository};
pub use private_message::{PrivateMessage, PrivateMessageRepository};
pub use reaction::{Reaction, ReactionGroup, ReactionRepository};
pub use read_state::ReadStateRepository;
pub use room::{Room, RoomRepository, RoomType};
pub use session::{SessionRepository, StoredSession};
pub use user::{Principal, Role, User, UserRepository};

#[cfg(test)]
pub use message::MockMessageRepository;
#[cfg(test)]
pub use moderation::MockModerationRepository;
#[cfg(test)]
pub use notification::MockNotificationRepository;
#[cfg(test)]
pub use private_message::MockPrivateMessageRepository;
#[cfg(test)]
pub use reaction::MockReactionRepository;
#[cfg(test)]
pub use read_state::MockReadStateRepository;
#[cfg(test)]
pub use room::MockRoomRepository;
#[cfg(test)]
pub use session::MockSessionRepository;
#[cfg(test)]
pub use user::MockUserRepository;
