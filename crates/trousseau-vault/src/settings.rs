//! Per-database settings that outlive a session.
//!
//! Stored by the host as JSON next to its other preferences; only the
//! values the element model itself acts on live here.

use serde::{Deserialize, Serialize};

use crate::format::EncryptionAlgorithm;
use crate::index::OnDuplicate;

// ── Settings ───────────────────────────────────────────────────────

/// Settings applied with [`crate::database::DatabaseCore::apply_settings`].
///
/// All fields have defaults, so partial JSON loads cleanly.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSettings {
    /// What insertions do with an identifier that is already taken.
    #[serde(default)]
    pub on_duplicate: OnDuplicate,

    /// Cipher declared for the payload.
    #[serde(default)]
    pub encryption_algorithm: EncryptionAlgorithm,
}

impl DatabaseSettings {
    /// Parse settings, falling back to [`Default::default()`] on invalid
    /// JSON (corrupt-file recovery).
    #[must_use]
    pub fn from_json(contents: &str) -> Self {
        serde_json::from_str(contents).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "invalid database settings, using defaults");
            Self::default()
        })
    }

    /// Pretty-printed JSON form.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

// ── Tests ──────────────────────────────────────────────────────────
