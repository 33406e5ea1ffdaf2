//! This module holds declarations for computing
//! [BIP340](https://github.com/bitcoin/bips/blob/master/bip-0340.mediawiki)-style
//! tagged hashes.
//!
//! A tagged hash is a SHA256 hash which has been prefixed with two copies of
//! the SHA256 hash of a given fixed constant byte string. This has the effect
//! of namespacing the hash to reduce the possibility of collisions.
//!
//! Only the two tags this crate needs are declared: the BIP340 challenge,
//! used for every (partial) signature, and the BIP341 `TapTweak` tag, used
//! to commit an output key to a script tree.
//!
//! ```
//! use musig2_ptlc::tagged_hashes;
//! use sha2::Sha256;
//! use sha2::Digest as _; // Brings trait methods into scope
//!
//! let hash = tagged_hashes::TAPROOT_TWEAK_TAG_HASHER
//!     .clone()
//!     .chain_update(b"SomeData")
//!     .finalize();
//!
//! let expected = {
//!     let tag_digest = Sha256::digest("TapTweak");
//!     Sha256::new()
//!         .chain_update(&tag_digest)
//!         .chain_update(&tag_digest)
//!         .chain_update(b"SomeData")
//!         .finalize()
//! };
//!
//! assert_eq!(hash, expected);
//! ```

use sha2::Sha256;
use std::sync::LazyLock;

use sha2::Digest as _;

fn with_tag_hash_prefix(tag_hash: [u8; 32]) -> Sha256 {
    Sha256::new().chain_update(tag_hash).chain_update(tag_hash)
}

/// sha256(b"BIP0340/challenge")
const BIP0340_CHALLENGE_TAG_DIGEST: [u8; 32] = [
    0x7B, 0xB5, 0x2D, 0x7A, 0x9F, 0xEF, 0x58, 0x32, 0x3E, 0xB1, 0xBF, 0x7A, 0x40, 0x7D, 0xB3, 0x82,
    0xD2, 0xF3, 0xF2, 0xD8, 0x1B, 0xB1, 0x22, 0x4F, 0x49, 0xFE, 0x51, 0x8F, 0x6D, 0x48, 0xD3, 0x7C,
];

/// sha256(b"TapTweak")
const TAPROOT_TWEAK_TAG_DIGEST: [u8; 32] = [
    0xe8, 0x0f, 0xe1, 0x63, 0x9c, 0x9c, 0xa0, 0x50, 0xe3, 0xaf, 0x1b, 0x39, 0xc1, 0x43, 0xc6, 0x3e,
    0x42, 0x9c, 0xbc, 0xeb, 0x15, 0xd9, 0x40, 0xfb, 0xb5, 0xc5, 0xa1, 0xf4, 0xaf, 0x57, 0xc5, 0xe9,
];

/// A `sha2::Sha256` hash engine with its state initialized to:
///
/// ```notrust
/// sha256(b"BIP0340/challenge") || sha256(b"BIP0340/challenge")
/// ```
pub static BIP0340_CHALLENGE_TAG_HASHER: LazyLock<Sha256> =
    LazyLock::new(|| with_tag_hash_prefix(BIP0340_CHALLENGE_TAG_DIGEST));

/// A `sha2::Sha256` hash engine with its state initialized to:
///
/// ```notrust
/// sha256(b"TapTweak") || sha256(b"TapTweak")
/// ```
pub static TAPROOT_TWEAK_TAG_HASHER: LazyLock<Sha256> =
    LazyLock::new(|| with_tag_hash_prefix(TAPROOT_TWEAK_TAG_DIGEST));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_hash() {
        let test_cases = [
            ("BIP0340/challenge", BIP0340_CHALLENGE_TAG_DIGEST),
            ("TapTweak", TAPROOT_TWEAK_TAG_DIGEST),
        ];
        for (tag, declared_hash) in test_cases {
            let actual_hash = <[u8; 32]>::from(sha2::Sha256::digest(tag));
            assert_eq!(declared_hash, actual_hash);
        }
    }
}
