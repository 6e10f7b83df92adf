//! Key-file credential factor.
//!
//! A key file contributes 32 bytes to the composite key. The bytes are
//! taken, in order of precedence, from:
//!
//! 1. a structured XML key file (`<KeyFile>` v1.0 base64 or v2.0 hex), only
//!    under [`KeyFileRules::Structured`]
//! 2. the raw file, when it is exactly 32 bytes
//! 3. the hex decoding of the file, when it is exactly 64 hex characters
//! 4. the SHA-256 of the whole file otherwise

use std::io::{ErrorKind, Read};

use data_encoding::{BASE64, HEXLOWER_PERMISSIVE};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::hash::sha256;
use crate::memory::{SecretBuffer, SecretBytes};

/// Length of the key material a key file contributes.
pub const FILE_KEY_LEN: usize = 32;

/// Largest key file the reader will buffer (64 MiB).
pub const MAX_KEY_FILE_LEN: usize = 67_108_864;

const READ_CHUNK: usize = 8_192;

/// Key-file layouts a container format recognises.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyFileRules {
    /// XML key files, then the raw-file rules (modern format).
    Structured,
    /// Raw-file rules only. An XML document is hashed like any other file
    /// (legacy format).
    RawOnly,
}

const VERSION_PATH: [&[u8]; 3] = [b"KeyFile", b"Meta", b"Version"];
const DATA_PATH: [&[u8]; 3] = [b"KeyFile", b"Key", b"Data"];

/// Read a whole key-file stream into secret memory.
///
/// # Errors
///
/// - [`CryptoError::KeyFileTooLarge`] if the stream exceeds [`MAX_KEY_FILE_LEN`]
///   or the buffer cannot be allocated
/// - [`CryptoError::Io`] for any other read failure
pub fn read_key_file<R: Read + ?Sized>(reader: &mut R) -> Result<SecretBuffer, CryptoError> {
    let mut data: Vec<u8> = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];
    let result = loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == ErrorKind::OutOfMemory => {
                break Err(CryptoError::KeyFileTooLarge {
                    max_bytes: MAX_KEY_FILE_LEN,
                })
            }
            Err(e) => break Err(CryptoError::Io(e)),
        };
        if data.len().saturating_add(n) > MAX_KEY_FILE_LEN || data.try_reserve(n).is_err() {
            break Err(CryptoError::KeyFileTooLarge {
                max_bytes: MAX_KEY_FILE_LEN,
            });
        }
        data.extend_from_slice(&chunk[..n]);
    };
    chunk.zeroize();
    match result {
        Ok(()) => Ok(SecretBuffer::from_vec(data)),
        Err(e) => {
            data.zeroize();
            Err(e)
        }
    }
}

/// Read a key-file stream and reduce it to its 32-byte key.
///
/// # Errors
///
/// See [`read_key_file`] and [`file_key`].
pub fn file_key_from_reader<R: Read + ?Sized>(
    reader: &mut R,
    rules: KeyFileRules,
) -> Result<SecretBytes<FILE_KEY_LEN>, CryptoError> {
    let data = read_key_file(reader)?;
    file_key(data.expose(), rules)
}

/// Reduce key-file contents to the 32-byte key they contribute.
///
/// # Errors
///
/// Returns [`CryptoError::UnsupportedKeyFile`] if, under
/// [`KeyFileRules::Structured`], the data is an XML key file with an
/// unknown version, an undecodable payload or a mismatching checksum.
pub fn file_key(
    data: &[u8],
    rules: KeyFileRules,
) -> Result<SecretBytes<FILE_KEY_LEN>, CryptoError> {
    if rules == KeyFileRules::Structured {
        if let Some(key) = xml_key(data)? {
            return Ok(key);
        }
    }

    match data.len() {
        FILE_KEY_LEN => return SecretBytes::from_slice(data),
        64 => {
            if let Ok(mut decoded) = HEXLOWER_PERMISSIVE.decode(data) {
                let key = SecretBytes::from_slice(&decoded);
                decoded.zeroize();
                return key;
            }
            // Not hex: hash it like any other binary file.
        }
        _ => {}
    }

    Ok(SecretBytes::new(sha256(&[data])))
}

// ---------------------------------------------------------------------------
// XML key files
// ---------------------------------------------------------------------------

/// Fields collected from a `<KeyFile>` document.
#[derive(Default)]
struct XmlKeyFile {
    version: Option<String>,
    data: Option<String>,
    hash: Option<String>,
}

impl Drop for XmlKeyFile {
    fn drop(&mut self) {
        if let Some(data) = self.data.as_mut() {
            data.zeroize();
        }
    }
}

/// Parse `data` as an XML key file.
///
/// Returns `Ok(None)` when the bytes are not a `<KeyFile>` document, so the
/// caller falls through to the raw-file rules.
fn xml_key(data: &[u8]) -> Result<Option<SecretBytes<FILE_KEY_LEN>>, CryptoError> {
    let Some(doc) = parse_xml_key_file(data) else {
        return Ok(None);
    };
    let (Some(version), Some(payload)) = (doc.version.as_deref(), doc.data.as_deref()) else {
        return Ok(None);
    };

    let mut key = if version.starts_with("1.") {
        BASE64
            .decode(payload.trim().as_bytes())
            .map_err(|e| CryptoError::UnsupportedKeyFile(format!("invalid base64 data: {e}")))?
    } else if version.starts_with("2.") {
        let hex: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        HEXLOWER_PERMISSIVE
            .decode(hex.as_bytes())
            .map_err(|e| CryptoError::UnsupportedKeyFile(format!("invalid hex data: {e}")))?
    } else {
        return Err(CryptoError::UnsupportedKeyFile(format!(
            "unknown key file version {version}"
        )));
    };

    if key.len() != FILE_KEY_LEN {
        let len = key.len();
        key.zeroize();
        return Err(CryptoError::UnsupportedKeyFile(format!(
            "embedded key is {len} bytes, expected {FILE_KEY_LEN}"
        )));
    }

    if let Some(expected) = doc.hash.as_deref() {
        let digest = sha256(&[&key]);
        let matches = HEXLOWER_PERMISSIVE
            .decode(expected.trim().as_bytes())
            .is_ok_and(|h| h.as_slice() == &digest[..4]);
        if !matches {
            key.zeroize();
            return Err(CryptoError::UnsupportedKeyFile(
                "embedded key does not match its hash".into(),
            ));
        }
    }

    let secret = SecretBytes::from_slice(&key);
    key.zeroize();
    secret.map(Some)
}

/// Walk the document and collect `Meta/Version`, `Key/Data` and its `Hash`.
fn parse_xml_key_file(data: &[u8]) -> Option<XmlKeyFile> {
    let mut reader = Reader::from_reader(data);
    reader.config_mut().trim_text(true);

    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut doc = XmlKeyFile::default();
    let mut seen_root = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).ok()? {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                if path.is_empty() {
                    if name != b"KeyFile" {
                        return None;
                    }
                    seen_root = true;
                }
                path.push(name);
                if is_path(&path, &DATA_PATH) {
                    if let Ok(Some(attr)) = e.try_get_attribute("Hash") {
                        doc.hash = attr.unescape_value().ok().map(|v| v.into_owned());
                    }
                }
            }
            Event::Text(t) => {
                let text = t.unescape().ok()?.into_owned();
                if is_path(&path, &VERSION_PATH) {
                    doc.version = Some(text);
                } else if is_path(&path, &DATA_PATH) {
                    doc.data = Some(text);
                }
            }
            Event::End(_) => {
                path.pop();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    buf.zeroize();

    seen_root.then_some(doc)
}

fn is_path(path: &[Vec<u8>], expected: &[&[u8]]) -> bool {
    path.len() == expected.len() && path.iter().zip(expected).all(|(a, b)| a.as_slice() == *b)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
