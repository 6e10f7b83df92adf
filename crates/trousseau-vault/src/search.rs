//! Search query configuration.
//!
//! Search itself runs outside the element model; this is the contract a
//! search receives. Which groups it may descend into is decided by
//! [`crate::database::DatabaseCore::is_group_searchable`].

use serde::{Deserialize, Serialize};

/// Query text and the fields it is matched against.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchParameters {
    /// Text to look for.
    pub search_query: String,
    /// Match entry titles.
    pub search_in_titles: bool,
    /// Match user names.
    pub search_in_user_names: bool,
    /// Match passwords.
    pub search_in_passwords: bool,
    /// Match URLs.
    pub search_in_urls: bool,
    /// Match notes.
    pub search_in_notes: bool,
    /// Match one-time-password settings.
    pub search_in_otp: bool,
    /// Match custom fields.
    pub search_in_other: bool,
    /// Match identifiers.
    pub search_in_uuids: bool,
    /// Match tags.
    pub search_in_tags: bool,
    /// Include template entries.
    pub search_in_templates: bool,
}

impl Default for SearchParameters {
    fn default() -> Self {
        Self {
            search_query: String::new(),
            search_in_titles: true,
            search_in_user_names: true,
            search_in_passwords: false,
            search_in_urls: true,
            search_in_notes: true,
            search_in_otp: false,
            search_in_other: true,
            search_in_uuids: false,
            search_in_tags: true,
            search_in_templates: false,
        }
    }
}

impl SearchParameters {
    /// Default field selection for `query`.
    #[must_use]
    pub fn with_query(query: impl Into<String>) -> Self {
        Self {
            search_query: query.into(),
            ..Self::default()
        }
    }
}
