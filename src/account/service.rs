//! Registration and credential checks.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::AccountError;
use crate::ids::UserId;
use crate::store::UserStore;

use super::password::{hash_password_with, verify_password, DEFAULT_ITERATIONS};
use super::user::{normalize_email, User};

/// Body of a registration request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Body of a login request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Account operations over a [`UserStore`].
pub struct AccountService<S: UserStore> {
    store: S,
    iterations: u32,
}

impl<S: UserStore> AccountService<S> {
    /// Create a service using the default hashing cost.
    pub fn new(store: S) -> Self {
        Self::with_iterations(store, DEFAULT_ITERATIONS)
    }

    /// Create a service with an explicit PBKDF2 iteration count.
    pub fn with_iterations(store: S, iterations: u32) -> Self {
        Self {
            store,
            iterations: iterations.max(1),
        }
    }

    /// Register a new user.
    ///
    /// Name, email and password must all be present and non-blank. Emails are
    /// compared case-insensitively; registering an existing email fails with
    /// [`AccountError::UserExists`].
    pub async fn register(&self, request: RegisterRequest) -> Result<User, AccountError> {
        let (Some(name), Some(email), Some(password)) = (
            non_blank(request.name),
            non_blank(request.email),
            request.password.filter(|p| !p.is_empty()),
        ) else {
            return Err(AccountError::Validation(
                "Name, email and password are required".to_string(),
            ));
        };

        let email = normalize_email(&email);
        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(AccountError::UserExists(email));
        }

        let iterations = self.iterations;
        let password_hash =
            tokio::task::spawn_blocking(move || hash_password_with(&password, iterations))
                .await
                .map_err(|e| AccountError::Hashing(e.to_string()))?;

        let user = User {
            id: UserId::new(),
            name: name.trim().to_string(),
            email,
            password_hash,
            created_at: Utc::now(),
        };

        self.store.insert_user(user.clone()).await?;
        info!(user_id = %user.id, "Registered user");

        Ok(user)
    }

    /// Check credentials and return the matching user.
    ///
    /// Unknown emails and wrong passwords produce the same error.
    pub async fn login(&self, request: LoginRequest) -> Result<User, AccountError> {
        let (Some(email), Some(password)) = (
            non_blank(request.email),
            request.password.filter(|p| !p.is_empty()),
        ) else {
            return Err(AccountError::Validation(
                "Email and password are required".to_string(),
            ));
        };

        let Some(user) = self.store.find_user_by_email(&normalize_email(&email)).await? else {
            debug!("Login for unknown email");
            return Err(AccountError::InvalidCredentials);
        };

        let stored = user.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
            .await
            .map_err(|e| AccountError::Hashing(e.to_string()))?;

        if !valid {
            debug!(user_id = %user.id, "Login with wrong password");
            return Err(AccountError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Look up a user by identifier.
    pub async fn find(&self, id: &UserId) -> Result<Option<User>, AccountError> {
        Ok(self.store.find_user(id).await?)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
