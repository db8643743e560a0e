//! Authentication error types.

use thiserror::Error;

/// Errors that can occur while checking the staff password.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// No usable password in the request (absent, not a string, or blank).
    #[error("password is required")]
    MissingPassword,

    /// The password does not match the configured hash.
    #[error("invalid password")]
    InvalidPassword,
}
