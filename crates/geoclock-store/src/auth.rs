//! Auth collaborator

use geoclock_util::UserId;

/// Names the signed-in user, if any
pub trait AuthProvider: Send + Sync {
    fn current_user_id(&self) -> Option<UserId>;
}

/// Auth backed by a fixed identity, e.g. from `--user` or `GEOCLOCK_USER`
#[derive(Debug, Clone, Default)]
pub struct StaticAuth {
    user: Option<UserId>,
}

impl StaticAuth {
    pub fn new(user: impl Into<UserId>) -> Self {
        Self {
            user: Some(user.into()),
        }
    }

    pub fn signed_out() -> Self {
        Self { user: None }
    }

    /// Treats a missing or blank name as signed out
    pub fn from_optional(user: Option<String>) -> Self {
        match user {
            Some(name) if !name.trim().is_empty() => Self::new(name.trim()),
            _ => Self::signed_out(),
        }
    }
}

impl AuthProvider for StaticAuth {
    fn current_user_id(&self) -> Option<UserId> {
        self.user.clone()
    }
}
