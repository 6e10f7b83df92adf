#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Property-based tests for master key derivation and the key transforms.

use std::io::{Cursor, Read};

use proptest::prelude::*;
use trousseau_crypto_core::kdf::{aes_transform, final_key};
use trousseau_crypto_core::{derive_master_key, file_key, KeyFileRules, PasswordEncoding};

fn master(
    password: Option<&str>,
    key_file: Option<&[u8]>,
    response: Option<&[u8]>,
) -> [u8; 32] {
    let mut reader = key_file.map(Cursor::new);
    *derive_master_key(
        password,
        reader.as_mut().map(|r| r as &mut dyn Read),
        response,
        PasswordEncoding::Utf8,
        KeyFileRules::Structured,
    )
    .unwrap()
    .expose()
}

fn flip(data: &[u8], index: usize) -> Vec<u8> {
    let mut out = data.to_vec();
    let i = index % out.len();
    out[i] ^= 0x01;
    out
}

proptest! {
    /// Identical factors always yield an identical key.
    #[test]
    fn derivation_is_deterministic(
        password in "[ -~]{0,32}",
        key_file in proptest::collection::vec(any::<u8>(), 0..128),
    ) {
        let a = master(Some(&password), Some(&key_file), None);
        let b = master(Some(&password), Some(&key_file), None);
        prop_assert_eq!(a, b);
    }

    /// Changing one byte of the password changes the key.
    #[test]
    fn password_byte_change_changes_key(
        password in "[a-z]{1,32}",
        index in any::<usize>(),
    ) {
        let changed = String::from_utf8(flip(password.as_bytes(), index)).unwrap();
        prop_assert_ne!(master(Some(&password), None, None), master(Some(&changed), None, None));
    }

    /// Changing one byte of the key file changes the key, whatever rule applies.
    #[test]
    fn key_file_byte_change_changes_key(
        key_file in proptest::collection::vec(any::<u8>(), 1..96),
        index in any::<usize>(),
    ) {
        let changed = flip(&key_file, index);
        prop_assert_ne!(
            master(Some("pw"), Some(&key_file), None),
            master(Some("pw"), Some(&changed), None)
        );
    }

    /// Changing one byte of the hardware response changes the key.
    #[test]
    fn response_byte_change_changes_key(
        response in proptest::collection::vec(any::<u8>(), 1..64),
        index in any::<usize>(),
    ) {
        let changed = flip(&response, index);
        prop_assert_ne!(
            master(Some("pw"), None, Some(&response)),
            master(Some("pw"), None, Some(&changed))
        );
    }

    /// Key files of any size reduce to exactly 32 bytes.
    #[test]
    fn file_key_always_32_bytes(data in proptest::collection::vec(any::<u8>(), 0..512)) {
        for rules in [KeyFileRules::Structured, KeyFileRules::RawOnly] {
            prop_assert_eq!(file_key(&data, rules).unwrap().expose().len(), 32);
        }
    }

    /// The final key depends on the master seed.
    #[test]
    fn final_key_binds_master_seed(
        seed_a in proptest::array::uniform32(any::<u8>()),
        seed_b in proptest::array::uniform32(any::<u8>()),
    ) {
        prop_assume!(seed_a != seed_b);
        let transformed = aes_transform(&[0x01; 32], &[0x02; 32], 10);
        let key_a = final_key(&seed_a, &transformed);
        let key_b = final_key(&seed_b, &transformed);
        prop_assert_ne!(
            key_a.expose(),
            key_b.expose()
        );
    }
}
