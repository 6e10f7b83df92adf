//! Cryptographic error types for `trousseau-crypto-core`.

use thiserror::Error;

/// Errors produced while turning credential factors into key material.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// No password and no key file were supplied.
    #[error("key cannot be empty: supply a password or a key file")]
    EmptyCredential,

    /// The key file is larger than the reader will buffer, or the buffer
    /// could not be allocated.
    #[error("key file data is too large (limit {max_bytes} bytes)")]
    KeyFileTooLarge {
        /// Maximum number of bytes accepted from a key file.
        max_bytes: usize,
    },

    /// Structured key file recognized but unusable (bad version, bad
    /// encoding, hash mismatch).
    #[error("unsupported key file: {0}")]
    UnsupportedKeyFile(String),

    /// Transform of the master key failed (invalid KDF parameters, unknown
    /// engine, allocation failure inside the engine).
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Invalid key material (wrong length, corrupted bytes).
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// Hardware challenge-response failure reported by the device layer.
    #[error("hardware key error: {0}")]
    HardwareKey(String),

    /// Reading a credential stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
