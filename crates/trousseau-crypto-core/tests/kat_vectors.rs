#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Known-answer vectors for the master-key pipeline.
//!
//! Expected values were computed independently with SHA-256 and AES-256-ECB
//! reference implementations.

use std::io::Cursor;
use std::io::Read;

use data_encoding::HEXLOWER;
use trousseau_crypto_core::kdf::{aes_transform, final_key};
use trousseau_crypto_core::{derive_master_key, file_key, KeyFileRules, PasswordEncoding};

fn hex32(s: &str) -> [u8; 32] {
    HEXLOWER.decode(s.as_bytes()).unwrap().try_into().unwrap()
}

/// sha256("correct-horse")
const CORRECT_HORSE: &str = "9dca666eb54730714630d1519264a7bf1eeaad00b8f2edc90d3ecbfad928d163";

/// sha256 of the v1.00 XML key file used below.
const XML_KEY_FILE_SHA256: &str =
    "50d1e8bd6cd6c4508dbe393abda4137c64c39e5113427fb04923148da6ab8ed2";

#[test]
fn password_only_master_key() {
    for encoding in [PasswordEncoding::Latin1, PasswordEncoding::Utf8] {
        let key =
            derive_master_key(Some("correct-horse"), None, None, encoding, KeyFileRules::RawOnly)
                .unwrap();
        assert_eq!(key.expose(), &hex32(CORRECT_HORSE));
    }
}

#[test]
fn non_ascii_password_per_encoding() {
    let latin1 = derive_master_key(
        Some("caf\u{e9}"),
        None,
        None,
        PasswordEncoding::Latin1,
        KeyFileRules::RawOnly,
    )
    .unwrap();
    assert_eq!(
        latin1.expose(),
        &hex32("dafd66c0b98965e688be1fc12942c09f0350e6be0685017c3f234e97d0adc92e")
    );
    let utf8 = derive_master_key(
        Some("caf\u{e9}"),
        None,
        None,
        PasswordEncoding::Utf8,
        KeyFileRules::Structured,
    )
    .unwrap();
    assert_eq!(
        utf8.expose(),
        &hex32("850f7dc43910ff890f8879c0ed26fe697c93a067ad93a7d50f466a7028a9bf4e")
    );
}

#[test]
fn password_with_raw_key_file() {
    let key_file: Vec<u8> = (0u8..32).collect();
    let mut reader = Cursor::new(key_file);
    let key = derive_master_key(
        Some("correct-horse"),
        Some(&mut reader as &mut dyn Read),
        None,
        PasswordEncoding::Utf8,
        KeyFileRules::Structured,
    )
    .unwrap();
    assert_eq!(
        key.expose(),
        &hex32("05cf52dd1932ada0760ef1f415f287aec18d412bfd53f787782cf1118a7610f5")
    );
}

#[test]
fn password_with_hardware_response() {
    let response = [0x77u8; 20];
    let key = derive_master_key(
        Some("correct-horse"),
        None,
        Some(&response),
        PasswordEncoding::Utf8,
        KeyFileRules::Structured,
    )
    .unwrap();
    assert_eq!(
        key.expose(),
        &hex32("d8b15a666ede4f8a79c65652065a66384b0f2a03a4ced220abd05178bce826ff")
    );
}

#[test]
fn raw_32_byte_key_file_unchanged() {
    let data: Vec<u8> = (0x00u8..=0x1F).collect();
    let key = file_key(&data, KeyFileRules::Structured).unwrap();
    assert_eq!(key.expose().as_slice(), data.as_slice());
}

#[test]
fn hex_key_file_decoded() {
    let data = "aa".repeat(32);
    assert_eq!(data.len(), 64);
    let key = file_key(data.as_bytes(), KeyFileRules::Structured).unwrap();
    assert_eq!(key.expose(), &[0xAA; 32]);
}

#[test]
fn xml_key_file_under_each_rule_set() {
    // <KeyFile> v1.00 wrapping 32 bytes of 0x11.
    let xml = "<KeyFile><Meta><Version>1.00</Version></Meta>\
               <Key><Data>ERERERERERERERERERERERERERERERERERERERERERE=</Data></Key></KeyFile>";
    let structured = file_key(xml.as_bytes(), KeyFileRules::Structured).unwrap();
    assert_eq!(structured.expose(), &[0x11; 32]);
    let raw = file_key(xml.as_bytes(), KeyFileRules::RawOnly).unwrap();
    assert_eq!(raw.expose(), &hex32(XML_KEY_FILE_SHA256));
}

#[test]
fn legacy_aes_kdf_300_rounds() {
    let master = hex32(CORRECT_HORSE);
    let transform_seed: [u8; 32] = core::array::from_fn(|i| i as u8);
    let transformed = aes_transform(&transform_seed, &master, 300);
    assert_eq!(
        transformed.expose(),
        &hex32("c89e982f2ac0bce8d36ff2b4fb3023ecec17c88ed26e9475814508533e93b755")
    );

    let master_seed = [0xA5u8; 32];
    let key = final_key(&master_seed, &transformed);
    assert_eq!(
        key.expose(),
        &hex32("9806bf828d6548ac5776c1ba44e4f299695746548352a062e5f22840412001b4")
    );
}

/// Argon2d output must match the raw `argon2` crate for the same inputs.
#[test]
fn argon2d_matches_raw_argon2() {
    let master = hex32(CORRECT_HORSE);
    let salt = b"salt_for_matching";

    let ours = trousseau_crypto_core::argon2_transform(
        &master,
        trousseau_crypto_core::KdfEngine::Argon2d,
        salt,
        2,
        64 * 1024,
        1,
        0x13,
    )
    .unwrap();

    let params = argon2::Params::new(64, 2, 1, Some(32)).unwrap();
    let argon2 = argon2::Argon2::new(argon2::Algorithm::Argon2d, argon2::Version::V0x13, params);
    let mut raw = [0u8; 32];
    argon2.hash_password_into(&master, salt, &mut raw).unwrap();

    assert_eq!(ours.expose(), &raw);
}
