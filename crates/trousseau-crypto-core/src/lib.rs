//! `trousseau-crypto-core`: Master key derivation for KeePass-family stores.
//!
//! Turns credential factors (password, key file, hardware challenge-response)
//! into the master key, then into the final key used for payload decryption.
//! No tree knowledge, no I/O beyond reading a key-file stream.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod memory;

pub mod hash;

pub mod keyfile;

pub mod credential;

pub mod hardware_key;

pub mod kdf;

pub use credential::{
    derive_master_key, password_key, validate_password_encoding, MainCredential,
    PasswordEncoding, MASTER_KEY_LEN,
};
pub use error::CryptoError;
pub use hardware_key::{
    build_challenge, challenge_from_seed, challenge_response, ChallengeResponder, CHALLENGE_LEN,
    CHALLENGE_SEED_LEN,
};
pub use kdf::{
    aes_transform, argon2_transform, final_key, transform_key, KdfEngine, KdfParameters,
    LEGACY_AES_ROUNDS,
};
pub use keyfile::{
    file_key, file_key_from_reader, read_key_file, KeyFileRules, MAX_KEY_FILE_LEN,
};
pub use memory::{SecretBuffer, SecretBytes};
