//! Authenticated client context.

use url::Url;

use crate::account::UserProfile;
use crate::ids::UserId;

/// The result of a successful login.
///
/// Passed explicitly to every authenticated API call.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Base URL of the history API the token was issued by
    pub api_base: Url,

    /// Bearer token
    pub token: String,

    /// The logged-in user
    pub user: UserProfile,

    /// Token expiry (Unix epoch seconds), when the server reported one
    pub expires_at: Option<u64>,
}

impl Session {
    pub fn new(api_base: Url, token: impl Into<String>, user: UserProfile) -> Self {
        Self {
            api_base,
            token: token.into(),
            user,
            expires_at: None,
        }
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    pub fn user_id(&self) -> UserId {
        self.user.id
    }
}
