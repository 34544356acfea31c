//! App-level bearer token with redacted output.

use crate::{CredentialError, ErrorLocation};

use std::fmt;
use std::panic::Location;

use serde::ser::Error;
use zeroize::Zeroize;

/// Bearer token used to negotiate a socket session.
///
/// Read once at startup and never mutated. The value is only reachable
/// through [`Credential::expose`], which is called when building the
/// `Authorization` header.
#[derive(Clone)]
pub struct Credential {
    inner: String,
}

impl Credential {
    /// Wrap a token, rejecting empty or whitespace-only values.
    #[track_caller]
    pub fn new(token: impl Into<String>) -> Result<Self, CredentialError> {
        let token = token.into();
        let trimmed = token.trim();

        if trimmed.is_empty() {
            return Err(CredentialError::Empty {
                message: String::from("Bearer token must not be empty"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(Self {
            inner: trimmed.to_string(),
        })
    }

    /// Raw token value, for the `Authorization` header only.
    #[inline]
    pub fn expose(&self) -> &str {
        &self.inner
    }

    /// Leading segment of a Slack token (`xapp`, `xoxb`, ...), if it has one.
    pub fn kind(&self) -> Option<&str> {
        self.inner
            .split_once('-')
            .map(|(prefix, _)| prefix)
            .filter(|prefix| prefix.chars().all(|c| c.is_ascii_alphanumeric()))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential([REDACTED])")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED TOKEN]")
    }
}

impl Drop for Credential {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

// Tokens must go through expose(), never through serde.
impl serde::Serialize for Credential {
    #[track_caller]
    fn serialize<S>(&self, _serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        Err(S::Error::custom(CredentialError::Serialization {
            message: String::from("Credential cannot be serialized - use expose() explicitly"),
            location: ErrorLocation::from(Location::caller()),
        }))
    }
}
