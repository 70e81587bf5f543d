use serde::{Deserialize, Serialize};

/// Combined authentication + authorization outcome.
///
/// Only `Success` and `AuthorizationFailed` are produced by the evaluator;
/// the remaining variants come from the credential check that runs before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AuthStatus {
    /// No authentication was attempted
    #[default]
    None,
    Success,
    UsernameNotFound,
    PasswordIncorrect,
    AccountDisabled,
    AccountLocked,
    /// Authenticated, but not permitted to perform the operation
    AuthorizationFailed,
}

impl AuthStatus {
    pub fn from_decision(allowed: bool) -> Self {
        if allowed {
            AuthStatus::Success
        } else {
            AuthStatus::AuthorizationFailed
        }
    }

    pub fn is_success(self) -> bool {
        self == AuthStatus::Success
    }

    /// Runs `decide` only if authentication succeeded; any earlier failure is
    /// passed through untouched.
    pub fn then_authorize<F>(self, decide: F) -> Self
    where
        F: FnOnce() -> bool,
    {
        match self {
            AuthStatus::Success => AuthStatus::from_decision(decide()),
            other => other,
        }
    }
}
