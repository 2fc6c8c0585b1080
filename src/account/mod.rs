//! User accounts.
//!
//! Registration stores a PBKDF2 password hash; login checks credentials and
//! hands the user back to the HTTP layer, which issues a bearer token (see
//! [`crate::server::auth`]).

mod password;
mod service;
mod user;

pub use password::{hash_password, hash_password_with, verify_password, DEFAULT_ITERATIONS};
pub use service::{AccountService, LoginRequest, RegisterRequest};
pub use user::{normalize_email, User, UserProfile};
