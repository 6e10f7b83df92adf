//! Slow transform of the master key and final key computation.
//!
//! This module provides:
//! - [`KdfEngine`]: registry of supported engines, identified by the UUID
//!   stored in the container header
//! - [`KdfParameters`]: serializable per-engine parameter set
//! - [`aes_transform`]: the AES-KDF round function (legacy and modern)
//! - [`transform_key`]: dispatch to the engine named by the parameters
//! - [`final_key`]: `sha256(master_seed ++ transformed_key)`
//!
//! # Key Hierarchy
//!
//! ```text
//! credential factors ──► master key ──► KDF(seed, cost) ──► transformed key
//! master seed ++ transformed key ──► SHA-256 ──► final key
//! ```

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes256;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::hash::sha256;
use crate::memory::SecretBytes;

/// Output length of every engine in bytes (256 bits).
pub const OUTPUT_LEN: usize = 32;

/// Length of the AES-KDF transform seed.
pub const AES_SEED_LEN: usize = 32;

/// Default AES-KDF rounds for the legacy format.
pub const LEGACY_AES_ROUNDS: u64 = 300;

/// Default AES-KDF rounds for newly configured modern stores.
pub const DEFAULT_AES_ROUNDS: u64 = 60_000;

/// Argon2 version 1.3, the only one written by current clients.
pub const ARGON2_VERSION_13: u32 = 0x13;

/// Argon2 version 1.0, still found in old files.
pub const ARGON2_VERSION_10: u32 = 0x10;

/// Minimum Argon2 salt length accepted by the `argon2` crate.
const MIN_SALT_LEN: usize = 8;

/// 64 MiB in bytes.
const DEFAULT_ARGON2_MEMORY: u64 = 67_108_864;

// ---------------------------------------------------------------------------
// Engine registry
// ---------------------------------------------------------------------------

/// Key-derivation engines a store may declare.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KdfEngine {
    /// AES-256-ECB applied `rounds` times, then SHA-256.
    Aes,
    /// Argon2d.
    Argon2d,
    /// Argon2id.
    Argon2id,
}

impl KdfEngine {
    /// Every supported engine, in the order a UI should offer them.
    pub const ALL: [Self; 3] = [Self::Aes, Self::Argon2d, Self::Argon2id];

    /// Engine identifier as written in the container header.
    #[must_use]
    pub const fn uuid(self) -> Uuid {
        match self {
            Self::Aes => Uuid::from_u128(0xc9d9_f39a_628a_4460_bf74_0d08_c18a_4fea),
            Self::Argon2d => Uuid::from_u128(0xef63_6ddf_8c29_444b_91f7_a9a4_03e3_0a0c),
            Self::Argon2id => Uuid::from_u128(0x9e29_8b19_56db_4773_b23d_fc3e_c6f0_a1e6),
        }
    }

    /// Look up an engine by header UUID.
    #[must_use]
    pub fn from_uuid(uuid: &Uuid) -> Option<Self> {
        Self::ALL.into_iter().find(|engine| engine.uuid() == *uuid)
    }

    /// Human-readable engine name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Aes => "AES-KDF",
            Self::Argon2d => "Argon2d",
            Self::Argon2id => "Argon2id",
        }
    }

    /// Fresh parameters for this engine with a random seed/salt.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyMaterial`] if the CSPRNG fails.
    pub fn default_parameters(self) -> Result<KdfParameters, CryptoError> {
        let seed = SecretBytes::<AES_SEED_LEN>::random()?;
        Ok(match self {
            Self::Aes => KdfParameters::Aes {
                seed: *seed.expose(),
                rounds: DEFAULT_AES_ROUNDS,
            },
            Self::Argon2d | Self::Argon2id => KdfParameters::Argon2 {
                engine: self,
                salt: seed.expose().to_vec(),
                iterations: 2,
                memory: DEFAULT_ARGON2_MEMORY,
                parallelism: 2,
                version: ARGON2_VERSION_13,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Engine parameters, stored in the container header.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KdfParameters {
    /// AES-KDF.
    Aes {
        /// Transform seed, used as the AES-256 key.
        seed: [u8; AES_SEED_LEN],
        /// Number of times both master-key blocks are encrypted.
        rounds: u64,
    },
    /// Argon2d / Argon2id.
    Argon2 {
        /// [`KdfEngine::Argon2d`] or [`KdfEngine::Argon2id`].
        engine: KdfEngine,
        /// Salt (the header's transform seed).
        salt: Vec<u8>,
        /// Number of passes (time cost).
        iterations: u32,
        /// Memory cost in bytes (converted to KiB for the engine).
        memory: u64,
        /// Degree of parallelism (lanes).
        parallelism: u32,
        /// Argon2 version, `0x10` or `0x13`.
        version: u32,
    },
}

impl KdfParameters {
    /// AES-KDF parameters with an explicit seed and round count.
    #[must_use]
    pub const fn aes(seed: [u8; AES_SEED_LEN], rounds: u64) -> Self {
        Self::Aes { seed, rounds }
    }

    /// Engine these parameters belong to.
    #[must_use]
    pub const fn engine(&self) -> KdfEngine {
        match self {
            Self::Aes { .. } => KdfEngine::Aes,
            Self::Argon2 { engine, .. } => *engine,
        }
    }

    /// Iteration count in the engine's own unit (AES rounds or Argon2 passes).
    #[must_use]
    pub fn iterations(&self) -> u64 {
        match self {
            Self::Aes { rounds, .. } => *rounds,
            Self::Argon2 { iterations, .. } => u64::from(*iterations),
        }
    }
}

// ---------------------------------------------------------------------------
// Transforms
// ---------------------------------------------------------------------------

/// AES-KDF: encrypt both 16-byte halves of `key` with AES-256-ECB keyed by
/// `seed`, `rounds` times, then hash the result with SHA-256.
///
/// Every round re-encrypts the full 32-byte block. This call is
/// synchronous and may take seconds for large round counts.
#[must_use]
pub fn aes_transform(
    seed: &[u8; AES_SEED_LEN],
    key: &[u8; OUTPUT_LEN],
    rounds: u64,
) -> SecretBytes<OUTPUT_LEN> {
    let cipher = Aes256::new(GenericArray::from_slice(seed));
    let mut blocks: [aes::Block; 2] = [
        *GenericArray::from_slice(&key[..16]),
        *GenericArray::from_slice(&key[16..]),
    ];
    for _ in 0..rounds {
        cipher.encrypt_blocks(&mut blocks);
    }

    let mut transformed = [0u8; OUTPUT_LEN];
    transformed[..16].copy_from_slice(&blocks[0]);
    transformed[16..].copy_from_slice(&blocks[1]);
    let digest = sha256(&[&transformed]);

    transformed.zeroize();
    for block in &mut blocks {
        block.as_mut_slice().zeroize();
    }
    SecretBytes::new(digest)
}

/// Argon2 transform of `key` with the given engine parameters.
///
/// # Errors
///
/// Returns `CryptoError::KeyDerivation` if:
/// - the salt is shorter than 8 bytes
/// - the version is neither `0x10` nor `0x13`
/// - the argon2 parameters are invalid
/// - the derivation itself fails (e.g., memory allocation)
pub fn argon2_transform(
    key: &[u8; OUTPUT_LEN],
    engine: KdfEngine,
    salt: &[u8],
    iterations: u32,
    memory: u64,
    parallelism: u32,
    version: u32,
) -> Result<SecretBytes<OUTPUT_LEN>, CryptoError> {
    if salt.len() < MIN_SALT_LEN {
        return Err(CryptoError::KeyDerivation(format!(
            "salt too short: {} bytes (minimum {MIN_SALT_LEN})",
            salt.len()
        )));
    }

    let algorithm = match engine {
        KdfEngine::Argon2d => argon2::Algorithm::Argon2d,
        KdfEngine::Argon2id => argon2::Algorithm::Argon2id,
        KdfEngine::Aes => {
            return Err(CryptoError::KeyDerivation(
                "AES-KDF is not an Argon2 engine".into(),
            ))
        }
    };
    let version = match version {
        ARGON2_VERSION_13 => argon2::Version::V0x13,
        ARGON2_VERSION_10 => argon2::Version::V0x10,
        other => {
            return Err(CryptoError::KeyDerivation(format!(
                "unsupported argon2 version {other:#x}"
            )))
        }
    };
    let m_cost = memory
        .checked_div(1024)
        .and_then(|kib| u32::try_from(kib).ok())
        .ok_or_else(|| CryptoError::KeyDerivation(format!("argon2 memory out of range: {memory}")))?;

    let params = argon2::Params::new(m_cost, iterations, parallelism, Some(OUTPUT_LEN))
        .map_err(|e| CryptoError::KeyDerivation(format!("invalid argon2 params: {e}")))?;
    let argon2 = argon2::Argon2::new(algorithm, version, params);

    let mut output = [0u8; OUTPUT_LEN];
    argon2
        .hash_password_into(key, salt, &mut output)
        .map_err(|e| CryptoError::KeyDerivation(format!("argon2 derivation failed: {e}")))?;

    let result = SecretBytes::new(output);
    output.zeroize();
    Ok(result)
}

/// Transform the master key with the engine named by `params`.
///
/// # Errors
///
/// Propagates [`argon2_transform`] failures; AES-KDF cannot fail.
pub fn transform_key(
    key: &[u8; OUTPUT_LEN],
    params: &KdfParameters,
) -> Result<SecretBytes<OUTPUT_LEN>, CryptoError> {
    match params {
        KdfParameters::Aes { seed, rounds } => Ok(aes_transform(seed, key, *rounds)),
        KdfParameters::Argon2 {
            engine,
            salt,
            iterations,
            memory,
            parallelism,
            version,
        } => argon2_transform(
            key,
            *engine,
            salt,
            *iterations,
            *memory,
            *parallelism,
            *version,
        ),
    }
}

/// `sha256(master_seed ++ transformed_key)`, the key payload decryption uses.
#[must_use]
pub fn final_key(
    master_seed: &[u8],
    transformed_key: &SecretBytes<OUTPUT_LEN>,
) -> SecretBytes<OUTPUT_LEN> {
    SecretBytes::new(sha256(&[master_seed, transformed_key.expose()]))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [0x11; 32];
    const SEED: [u8; 32] = [0x22; 32];

    fn small_argon2(engine: KdfEngine) -> KdfParameters {
        KdfParameters::Argon2 {
            engine,
            salt: b"0123456789abcdef".to_vec(),
            iterations: 1,
            memory: 32 * 1024,
            parallelism: 1,
            version: ARGON2_VERSION_13,
        }
    }

    #[test]
    fn registry_round_trips_uuids() {
        for engine in KdfEngine::ALL {
            assert_eq!(KdfEngine::from_uuid(&engine.uuid()), Some(engine));
        }
        assert_eq!(KdfEngine::from_uuid(&Uuid::nil()), None);
    }

    #[test]
    fn aes_uuid_matches_header_bytes() {
        let expected = [
            0xc9, 0xd9, 0xf3, 0x9a, 0x62, 0x8a, 0x44, 0x60, 0xbf, 0x74, 0x0d, 0x08, 0xc1, 0x8a,
            0x4f, 0xea,
        ];
        assert_eq!(KdfEngine::Aes.uuid().as_bytes(), &expected);
    }

    #[test]
    fn aes_zero_rounds_is_plain_hash() {
        let out = aes_transform(&SEED, &KEY, 0);
        assert_eq!(out.expose(), &sha256(&[&KEY]));
    }

    #[test]
    fn aes_one_round_matches_block_cipher() {
        let cipher = Aes256::new(GenericArray::from_slice(&SEED));
        let mut block = *GenericArray::from_slice(&KEY[..16]);
        cipher.encrypt_block(&mut block);
        let mut expected_blocks = [0u8; 32];
        expected_blocks[..16].copy_from_slice(&block);
        expected_blocks[16..].copy_from_slice(&block); // both halves are identical
        let out = aes_transform(&SEED, &KEY, 1);
        assert_eq!(out.expose(), &sha256(&[&expected_blocks]));
    }

    #[test]
    fn aes_rounds_change_output() {
        let a = aes_transform(&SEED, &KEY, 300);
        let b = aes_transform(&SEED, &KEY, 301);
        assert_ne!(a.expose(), b.expose());
    }

    #[test]
    fn aes_is_deterministic() {
        let a = aes_transform(&SEED, &KEY, 1000);
        let b = aes_transform(&SEED, &KEY, 1000);
        assert_eq!(a.expose(), b.expose());
    }

    #[test]
    fn argon2_engines_differ() {
        let d = transform_key(&KEY, &small_argon2(KdfEngine::Argon2d)).unwrap();
        let id = transform_key(&KEY, &small_argon2(KdfEngine::Argon2id)).unwrap();
        assert_ne!(d.expose(), id.expose());
    }

    #[test]
    fn argon2_rejects_short_salt() {
        let err = argon2_transform(&KEY, KdfEngine::Argon2d, b"short", 1, 32 * 1024, 1, 0x13)
            .expect_err("short salt must fail");
        assert!(format!("{err}").contains("salt too short"));
    }

    #[test]
    fn argon2_rejects_unknown_version() {
        let err = argon2_transform(&KEY, KdfEngine::Argon2id, &SEED, 1, 32 * 1024, 1, 0x42)
            .expect_err("unknown version must fail");
        assert!(matches!(err, CryptoError::KeyDerivation(_)));
    }

    #[test]
    fn argon2_rejects_aes_engine() {
        assert!(argon2_transform(&KEY, KdfEngine::Aes, &SEED, 1, 32 * 1024, 1, 0x13).is_err());
    }

    #[test]
    fn final_key_hashes_seed_then_transformed() {
        let transformed = SecretBytes::new([0x33; 32]);
        let master_seed = [0x44u8; 16];
        let key = final_key(&master_seed, &transformed);
        assert_eq!(key.expose(), &sha256(&[&master_seed, &[0x33; 32]]));
    }

    #[test]
    fn default_parameters_per_engine() {
        for engine in KdfEngine::ALL {
            let params = engine.default_parameters().unwrap();
            assert_eq!(params.engine(), engine);
        }
        let a = KdfEngine::Aes.default_parameters().unwrap();
        let b = KdfEngine::Aes.default_parameters().unwrap();
        assert_ne!(a, b, "seeds must be random");
        assert_eq!(a.iterations(), DEFAULT_AES_ROUNDS);
    }

    #[test]
    fn parameters_serde_roundtrip() {
        let params = small_argon2(KdfEngine::Argon2id);
        let json = serde_json::to_string(&params).expect("serialize should succeed");
        let back: KdfParameters = serde_json::from_str(&json).expect("deserialize should succeed");
        assert_eq!(params, back);
    }
}
