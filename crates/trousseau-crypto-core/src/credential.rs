//! Composite master key from credential factors.
//!
//! ```text
//! password + key file  ──► sha256( sha256(enc(password)) ++ file_key(key file) )
//! password + hardware  ──► sha256( sha256(enc(password)) ++ sha256(response) )
//! password             ──► sha256( enc(password) )
//! key file             ──► file_key(key file)
//! ```
//!
//! The password encoding is fixed by the file format: a different encoding
//! yields a different key and decryption simply fails later.

use std::fmt;
use std::io::{Cursor, Read};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::hash::sha256;
use crate::keyfile::{file_key_from_reader, KeyFileRules};
use crate::memory::{SecretBuffer, SecretBytes};

/// Length of the master key in bytes.
pub const MASTER_KEY_LEN: usize = 32;

/// Byte substituted for characters the legacy encoding cannot represent.
const LATIN1_REPLACEMENT: u8 = b'?';

/// Text encoding applied to the password before hashing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PasswordEncoding {
    /// ISO-8859-1, one byte per character (legacy format).
    Latin1,
    /// UTF-8 (modern format).
    Utf8,
}

impl PasswordEncoding {
    /// Encode `password` into secret memory.
    ///
    /// Latin-1 maps every character up to U+00FF to its code point and any
    /// other character to `?`.
    #[must_use]
    pub fn encode(self, password: &str) -> SecretBuffer {
        match self {
            Self::Utf8 => SecretBuffer::new(password.as_bytes()),
            Self::Latin1 => SecretBuffer::from_vec(
                password
                    .chars()
                    .map(|c| u8::try_from(u32::from(c)).unwrap_or(LATIN1_REPLACEMENT))
                    .collect(),
            ),
        }
    }

    /// Returns `true` if `password` survives an encode/decode round trip.
    #[must_use]
    pub fn can_represent(self, password: &str) -> bool {
        match self {
            Self::Utf8 => true,
            Self::Latin1 => password.chars().all(|c| u32::from(c) <= 0xFF),
        }
    }
}

/// Check that a credential can be used with the given encoding.
///
/// Without a password a key file is required; with a password, every
/// character must be representable.
#[must_use]
pub fn validate_password_encoding(
    password: Option<&str>,
    contains_key_file: bool,
    encoding: PasswordEncoding,
) -> bool {
    match password {
        None => contains_key_file,
        Some(password) => encoding.can_represent(password),
    }
}

/// `sha256(enc(password))`.
#[must_use]
pub fn password_key(password: &str, encoding: PasswordEncoding) -> [u8; MASTER_KEY_LEN] {
    let encoded = encoding.encode(password);
    sha256(&[encoded.expose()])
}

/// Combine the supplied credential factors into the master key.
///
/// A hardware response only counts together with a password; a key file
/// takes precedence over a hardware response. `key_file_rules` selects the
/// key-file layouts the container format recognises.
///
/// # Errors
///
/// - [`CryptoError::EmptyCredential`] if neither a password nor a key file is given
/// - any key-file error from [`crate::keyfile`]
pub fn derive_master_key(
    password: Option<&str>,
    key_file: Option<&mut dyn Read>,
    hardware_response: Option<&[u8]>,
    encoding: PasswordEncoding,
    key_file_rules: KeyFileRules,
) -> Result<SecretBytes<MASTER_KEY_LEN>, CryptoError> {
    match (password, key_file, hardware_response) {
        (Some(password), Some(key_file), _) => {
            let mut part1 = password_key(password, encoding);
            let part2 = file_key_from_reader(key_file, key_file_rules)?;
            let key = sha256(&[&part1, part2.expose()]);
            part1.zeroize();
            Ok(SecretBytes::new(key))
        }
        (Some(password), None, Some(response)) => {
            let mut part1 = password_key(password, encoding);
            let mut part2 = sha256(&[response]);
            let key = sha256(&[&part1, &part2]);
            part1.zeroize();
            part2.zeroize();
            Ok(SecretBytes::new(key))
        }
        (Some(password), None, None) => Ok(SecretBytes::new(password_key(password, encoding))),
        (None, Some(key_file), _) => file_key_from_reader(key_file, key_file_rules),
        (None, None, _) => Err(CryptoError::EmptyCredential),
    }
}

/// Credential factors supplied by the user to open a store.
#[derive(Default)]
pub struct MainCredential {
    /// Master password.
    pub password: Option<SecretString>,
    /// Contents of the key file.
    pub key_file: Option<SecretBuffer>,
    /// Response returned by the hardware challenge-response device.
    pub hardware_response: Option<SecretBuffer>,
}

impl MainCredential {
    /// Credential made of a password only.
    #[must_use]
    pub fn with_password(password: &str) -> Self {
        Self {
            password: Some(SecretString::from(password.to_owned())),
            ..Self::default()
        }
    }

    /// Add key-file contents.
    #[must_use]
    pub fn key_file(mut self, contents: &[u8]) -> Self {
        self.key_file = Some(SecretBuffer::new(contents));
        self
    }

    /// Add a hardware challenge-response answer.
    #[must_use]
    pub fn hardware_response(mut self, response: &[u8]) -> Self {
        self.hardware_response = Some(SecretBuffer::new(response));
        self
    }

    /// Derive the master key from the held factors.
    ///
    /// # Errors
    ///
    /// See [`derive_master_key`].
    pub fn master_key(
        &self,
        encoding: PasswordEncoding,
        key_file_rules: KeyFileRules,
    ) -> Result<SecretBytes<MASTER_KEY_LEN>, CryptoError> {
        let mut cursor = self.key_file.as_ref().map(|kf| Cursor::new(kf.expose()));
        derive_master_key(
            self.password.as_ref().map(|p| p.expose_secret()),
            cursor.as_mut().map(|c| c as &mut dyn Read),
            self.hardware_response.as_ref().map(SecretBuffer::expose),
            encoding,
            key_file_rules,
        )
    }
}

impl fmt::Debug for MainCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainCredential")
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("key_file", &self.key_file)
            .field("hardware_response", &self.hardware_response)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
