//! Request credential.
//!
//! One UUID-shaped value is shared by every link of a subscription: VLESS and
//! VMess carry it as the user id, Trojan as the password.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::CredentialError;

static UUID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("UUID pattern is valid")
});

/// All-zero credential carried by the failure sentinel.
pub const NIL_CREDENTIAL: &str = "00000000-0000-0000-0000-000000000000";

/// A validated UUID credential.
///
/// The original casing is preserved; clients compare ids case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Credential(String);

impl Credential {
    /// Validates `value` against the canonical UUID textual grammar.
    pub fn parse(value: &str) -> Result<Self, CredentialError> {
        if UUID_PATTERN.is_match(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(CredentialError(value.to_string()))
        }
    }

    /// The all-zero credential.
    pub fn nil() -> Self {
        Self(NIL_CREDENTIAL.to_string())
    }

    /// Returns the credential text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Credential {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Credential {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
