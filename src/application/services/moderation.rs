//! Moderation Gate
//!
//! Mute/ban/block checks consulted before any message is persisted or
//! broadcast. A banned user is rejected at connection time; a muted user
//! stays connected but every send attempt is rejected with the mute's
//! expiry; blocks gate private messages bidirectionally.
//!
//! The gate itself never drops open connections: callers own the
//! connection lifecycle and re-check at send time.

use std::sync::Arc;

use crate::domain::{Ban, ModerationRepository, Mute};
use crate::shared::error::AppError;

/// Per-message moderation checks backed by the moderation repository.
pub struct ModerationGate {
    repo: Arc<dyn ModerationRepository>,
}

impl ModerationGate {
    pub fn new(repo: Arc<dyn ModerationRepository>) -> Self {
        Self { repo }
    }

    /// The active ban for a username, if any.
    pub async fn check_ban(&self, username: &str) -> Result<Option<Ban>, AppError> {
        self.repo.active_ban(username).await
    }

    /// The active mute for a username, if any.
    pub async fn check_mute(&self, username: &str) -> Result<Option<Mute>, AppError> {
        self.repo.active_mute(username).await
    }

    /// Reject with `Banned` if the username has an active ban.
    pub async fn ensure_not_banned(&self, username: &str) -> Result<(), AppError> {
        match self.check_ban(username).await? {
            Some(ban) => Err(AppError::Banned(ban)),
            None => Ok(()),
        }
    }

    /// Reject with `Muted` (carrying the expiry) if the username has an
    /// active mute.
    pub async fn ensure_can_send(&self, username: &str) -> Result<(), AppError> {
        match self.check_mute(username).await? {
            Some(mute) => Err(AppError::Muted(mute)),
            None => Ok(()),
        }
    }

    /// Reject with `Blocked` if either party has blocked the other.
    pub async fn ensure_unblocked(&self, a: &str, b: &str) -> Result<(), AppError> {
        if self.repo.is_blocked(a, b).await? || self.repo.is_blocked(b, a).await? {
            return Err(AppError::Blocked);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MockModerationRepository;
    use chrono::{Duration, Utc};

    fn mute(username: &str) -> Mute {
        Mute {
            username: username.into(),
            issued_by: "mod".into(),
            reason: "spam".into(),
            expires_at: Some(Utc::now() + Duration::minutes(10)),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn muted_error_carries_expiry() {
        let mut repo = MockModerationRepository::new();
        repo.expect_active_mute()
            .returning(|u| Ok(Some(mute(u))));

        let gate = ModerationGate::new(Arc::new(repo));
        let err = gate.ensure_can_send("alice").await.unwrap_err();
        match err {
            AppError::Muted(m) => assert!(m.expires_at.is_some()),
            other => panic!("expected Muted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn block_is_checked_in_both_directions() {
        let mut repo = MockModerationRepository::new();
        // Only bob blocked alice; the pair is still unreachable either way.
        repo.expect_is_blocked()
            .returning(|blocker, _| Ok(blocker == "bob"));

        let gate = ModerationGate::new(Arc::new(repo));
        assert!(matches!(
            gate.ensure_unblocked("alice", "bob").await.unwrap_err(),
            AppError::Blocked
        ));
        assert!(matches!(
            gate.ensure_unblocked("bob", "alice").await.unwrap_err(),
            AppError::Blocked
        ));
    }

    #[tokio::test]
    async fn clean_users_pass_every_check() {
        let mut repo = MockModerationRepository::new();
        repo.expect_active_ban().returning(|_| Ok(None));
        repo.expect_active_mute().returning(|_| Ok(None));
        repo.expect_is_blocked().returning(|_, _| Ok(false));

        let gate = ModerationGate::new(Arc::new(repo));
        gate.ensure_not_banned("alice").await.unwrap();
        gate.ensure_can_send("alice").await.unwrap();
        gate.ensure_unblocked("alice", "bob").await.unwrap();
    }
}
