//! Per-request context passed explicitly through every data-layer call.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Request kit: identity, tracing id, and the cancellation scope of one request.
///
/// Cloning a kit shares its cancellation token, so cancelling any clone
/// cancels all of them. Use [`Kit::child`] for a scope that can be
/// cancelled independently of its parent.
#[derive(Debug, Clone)]
pub struct Kit {
    /// Request id, attached to every log line as `rid`.
    pub rid: String,
    pub user: String,
    pub app_code: String,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Kit {
    pub fn new() -> Self {
        Self {
            rid: uuid::Uuid::new_v4().simple().to_string(),
            user: String::new(),
            app_code: String::new(),
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    pub fn with_rid(mut self, rid: impl Into<String>) -> Self {
        self.rid = rid.into();
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn with_app_code(mut self, app_code: impl Into<String>) -> Self {
        self.app_code = app_code.into();
        self
    }

    /// Bound the request to `timeout` from now. An earlier existing deadline wins.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        });
        self
    }

    /// A kit sharing identity and deadline whose token is a child of this one.
    pub fn child(&self) -> Self {
        Self {
            rid: self.rid.clone(),
            user: self.user.clone(),
            app_code: self.app_code.clone(),
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline; `None` when the kit has no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }
}

impl Default for Kit {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_kit_has_rid() {
        let kt = Kit::new();
        assert_eq!(kt.rid.len(), 32);
        assert!(!kt.is_cancelled());
        assert!(kt.deadline().is_none());
    }

    #[test]
    fn child_cancellation_does_not_reach_parent() {
        let parent = Kit::new().with_user("admin");
        let child = parent.child();
        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
        assert_eq!(child.user, "admin");

        let other = parent.child();
        parent.cancel();
        assert!(other.is_cancelled());
    }

    #[tokio::test]
    async fn earlier_deadline_wins() {
        let kt = Kit::new()
            .with_timeout(Duration::from_secs(1))
            .with_timeout(Duration::from_secs(60));
        let remaining = kt.remaining().unwrap();
        assert!(remaining <= Duration::from_secs(1));
    }
}
