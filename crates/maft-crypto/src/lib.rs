// crates/maft-crypto/src/lib.rs

//! Hash substrate shared by the tree engine, the server, and the client.
//!
//! ⚠️ **Compatibility note:** leaf and inner hashing are both plain SHA-256
//! with **no** domain-separation prefix (`inner = SHA-256(left || right)`).
//! This matches every root already in circulation; adding RFC 6962-style
//! tags would invalidate them. The cost is the classical second-preimage
//! weakness between leaves and inner nodes: callers must not treat a
//! 64-byte leaf that happens to parse as two hashes as authenticated.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]

use std::io;

use sha2::{Digest, Sha256};

/// Width of every digest in the system, in bytes.
pub const HASH_LEN: usize = 32;

/// A 32-byte SHA-256 digest.
pub type Hash = [u8; HASH_LEN];

/// Hash one data block into a leaf digest.
#[must_use]
pub fn hash_leaf(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}

/// Hash two child digests into their parent: `SHA-256(left || right)`.
#[must_use]
pub fn hash_inner(left: &Hash, right: &Hash) -> Hash {
    let mut h = Sha256::new();
    h.update(left);
    h.update(right);
    h.finalize().into()
}

/// Hash everything a reader yields, without buffering it in memory.
///
/// Equivalent to [`hash_leaf`] over the reader's full contents; used for
/// hashing files larger than we want to hold at once.
///
/// # Errors
/// Propagates any read error.
pub fn hash_reader<R: io::Read>(reader: &mut R) -> io::Result<Hash> {
    let mut hasher = Sha256::new();
    io::copy(reader, &mut hasher)?;
    Ok(hasher.finalize().into())
}

/// The digest every padding leaf carries: the hash of the empty block.
///
/// Both construction paths pad short batches with this value, so roots
/// agree regardless of how the leaves were delivered.
#[must_use]
pub fn padding_leaf() -> Hash {
    hash_leaf(&[])
}

/// Fixed-time equality over two digests.
///
/// Folds the XOR of every byte pair before testing, so the comparison does
/// not exit early on the first mismatching byte.
#[must_use]
pub fn fixed_time_eq(a: &Hash, b: &Hash) -> bool {
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Lower-hex rendering of a digest, as used for blob keys and sidecars.
#[must_use]
pub fn to_hex(h: &Hash) -> String {
    hex::encode(h)
}

/// Parse a lower- or upper-hex digest of exactly [`HASH_LEN`] bytes.
///
/// # Errors
/// Returns the underlying [`hex::FromHexError`] on bad characters or any
/// length other than 64 hex digits.
pub fn from_hex(s: &str) -> Result<Hash, hex::FromHexError> {
    let mut out = [0u8; HASH_LEN];
    hex::decode_to_slice(s.trim(), &mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    // SHA-256 of the empty string, a fixed point of the padding rule.
    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn leaf_hash_matches_known_vector() {
        assert_eq!(to_hex(&hash_leaf(b"")), EMPTY_SHA256);
        assert_eq!(
            to_hex(&hash_leaf(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn padding_leaf_is_hashed_empty_block() {
        assert_eq!(padding_leaf(), hash_leaf(&[]));
    }

    #[test]
    fn inner_hash_is_concat_then_sha256() {
        let l = hash_leaf(b"left");
        let r = hash_leaf(b"right");
        let mut cat = Vec::with_capacity(HASH_LEN * 2);
        cat.extend_from_slice(&l);
        cat.extend_from_slice(&r);
        assert_eq!(hash_inner(&l, &r), hash_leaf(&cat));
        // Order matters.
        assert_ne!(hash_inner(&l, &r), hash_inner(&r, &l));
    }

    #[test]
    fn fixed_time_eq_agrees_with_plain_eq() {
        let a = hash_leaf(b"x");
        let mut b = a;
        assert!(fixed_time_eq(&a, &b));
        b[31] ^= 1;
        assert!(!fixed_time_eq(&a, &b));
        b = a;
        b[0] ^= 0x80;
        assert!(!fixed_time_eq(&a, &b));
    }

    #[test]
    fn reader_hashing_matches_block_hashing() {
        let data = b"streamed contents".to_vec();
        let mut cursor = std::io::Cursor::new(&data);
        assert_eq!(hash_reader(&mut cursor).unwrap(), hash_leaf(&data));
    }

    #[test]
    fn hex_round_trip() {
        let h = hash_leaf(b"round trip");
        assert_eq!(from_hex(&to_hex(&h)), Ok(h));
        assert!(from_hex("abcd").is_err());
        assert!(from_hex("zz").is_err());
    }
}
