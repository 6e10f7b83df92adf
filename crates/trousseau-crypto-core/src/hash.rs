//! SHA-256 over concatenated parts.
//!
//! Every hash in the key pipeline is `sha256(a ++ b ++ ...)`; the order of
//! `parts` is part of the file format.

use ring::digest;

/// SHA-256 output length.
pub const DIGEST_LEN: usize = 32;

/// Hash the concatenation of `parts`, in order.
#[must_use]
pub fn sha256(parts: &[&[u8]]) -> [u8; DIGEST_LEN] {
    let mut ctx = digest::Context::new(&digest::SHA256);
    for part in parts {
        ctx.update(part);
    }
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(ctx.finish().as_ref());
    out
}
