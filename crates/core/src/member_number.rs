//! Member number value object.
//!
//! Member numbers are human-assigned business identifiers (e.g. `A1234`).
//! They are unique, case-insensitive and stored normalized: surrounding
//! whitespace trimmed, letters uppercased. All lookups and credential
//! derivation go through the normalized form.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Normalized member number.
///
/// Construction is only possible through [`MemberNumber::parse`], so a value
/// of this type is always trimmed, uppercased and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberNumber(String);

impl MemberNumber {
    /// Parse and normalize raw user input.
    ///
    /// Trims surrounding whitespace and uppercases; rejects input that is
    /// empty after trimming.
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let normalized = raw.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(DomainError::validation("member number must not be empty"));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Synthetic sign-in email derived from the member number.
    ///
    /// The business identifier is authoritative, so the identity provider
    /// account is keyed by `lowercase(number)@temp.com` rather than a
    /// user-supplied address.
    pub fn derived_email(&self) -> String {
        format!("{}@temp.com", self.0.to_lowercase())
    }
}

impl ValueObject for MemberNumber {}

impl core::fmt::Display for MemberNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
