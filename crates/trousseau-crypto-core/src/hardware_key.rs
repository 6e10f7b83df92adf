//! Hardware challenge-response credential factor.
//!
//! The store's 32-byte seed is sent to the device inside a fixed 64-byte
//! challenge; the device's answer is then hashed into the composite key by
//! [`crate::credential::derive_master_key`].
//!
//! ```text
//! challenge = seed[0..32] ++ [0x00; 32]
//! ```

use crate::error::CryptoError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Length of the seed placed at the start of the challenge.
pub const CHALLENGE_SEED_LEN: usize = 32;

/// Total challenge length sent to the device.
pub const CHALLENGE_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Device interface
// ---------------------------------------------------------------------------

/// A device (or driver bridge) answering challenge-response requests.
///
/// Implemented outside this crate by the platform layer.
pub trait ChallengeResponder {
    /// Send `challenge` to the device and return its response.
    ///
    /// # Errors
    ///
    /// Implementations report device failures as [`CryptoError::HardwareKey`].
    fn respond(&mut self, challenge: &[u8; CHALLENGE_LEN]) -> Result<Vec<u8>, CryptoError>;
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the 64-byte challenge for `seed`: the seed, then zero padding.
#[must_use]
pub fn build_challenge(seed: &[u8; CHALLENGE_SEED_LEN]) -> [u8; CHALLENGE_LEN] {
    let mut challenge = [0u8; CHALLENGE_LEN];
    challenge[..CHALLENGE_SEED_LEN].copy_from_slice(seed);
    challenge
}

/// Build the challenge from a seed slice, as read from a container header.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidKeyMaterial`] if `seed` is not 32 bytes.
pub fn challenge_from_seed(seed: &[u8]) -> Result<[u8; CHALLENGE_LEN], CryptoError> {
    let seed: &[u8; CHALLENGE_SEED_LEN] = seed.try_into().map_err(|_| {
        CryptoError::InvalidKeyMaterial(format!(
            "challenge seed must be {CHALLENGE_SEED_LEN} bytes, got {}",
            seed.len()
        ))
    })?;
    Ok(build_challenge(seed))
}

/// Run one challenge-response exchange with `device` for `seed`.
///
/// # Errors
///
/// Returns [`CryptoError::HardwareKey`] if the device fails or answers with
/// an empty response.
pub fn challenge_response<D: ChallengeResponder + ?Sized>(
    device: &mut D,
    seed: &[u8; CHALLENGE_SEED_LEN],
) -> Result<Vec<u8>, CryptoError> {
    let challenge = build_challenge(seed);
    let response = device.respond(&challenge)?;
    if response.is_empty() {
        return Err(CryptoError::HardwareKey("device returned an empty response".into()));
    }
    Ok(response)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
