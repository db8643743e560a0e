//! Shared-password authentication gate.
//!
//! The front-desk app unlocks itself by posting the staff password to
//! `/auth`. There are no accounts, sessions or tokens: every call is checked
//! from scratch, and the rate limiter is the only brake on guessing.
//!
//! Operators can switch the gate off entirely (`AUTH_DISABLED=true`), in
//! which case every call succeeds regardless of input.

mod error;
pub mod hash;

pub use error::AuthError;
pub use hash::ExpectedHash;

use crate::config::AuthConfig;

/// Successful outcome of an authentication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The gate is disabled; nothing was checked.
    Bypassed,
    /// The password matched.
    Granted,
}

impl AuthOutcome {
    /// Metrics label for this outcome.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Bypassed => "bypassed",
            Self::Granted => "granted",
        }
    }
}

/// Checks submitted passwords against the configured digest.
#[derive(Debug, Clone)]
pub struct AuthGate {
    expected: Option<ExpectedHash>,
}

impl AuthGate {
    /// Build the gate from configuration.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let expected = match config {
            AuthConfig::Disabled => None,
            AuthConfig::Enabled(hash) => Some(hash.clone()),
        };
        Self { expected }
    }

    /// Whether the gate lets everything through.
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        self.expected.is_none()
    }

    /// Check a submitted password.
    ///
    /// Both the password as sent and its trimmed form are hashed, and either
    /// digest matching grants access. Both candidates are always compared.
    ///
    /// # Errors
    ///
    /// - `AuthError::MissingPassword` if `password` is absent or blank
    /// - `AuthError::InvalidPassword` if no candidate digest matches
    pub fn authenticate(&self, password: Option<&str>) -> Result<AuthOutcome, AuthError> {
        let Some(expected) = &self.expected else {
            return Ok(AuthOutcome::Bypassed);
        };

        let raw = password.ok_or(AuthError::MissingPassword)?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AuthError::MissingPassword);
        }

        let mut candidates = vec![raw];
        if trimmed != raw {
            candidates.push(trimmed);
        }

        let matched = candidates
            .into_iter()
            .map(hash::sha256_hex)
            .fold(false, |acc, candidate| {
                hash::compare(&candidate, expected.as_bytes()) | acc
            });

        if matched {
            Ok(AuthOutcome::Granted)
        } else {
            Err(AuthError::InvalidPassword)
        }
    }
}
