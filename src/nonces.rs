use secp::{MaybePoint, MaybeScalar, Point, Scalar, G};

use crate::errors::{DecodeError, DegenerateNonceError, InvalidKeyError};
use crate::BinaryEncoding;

use sha2::{Digest as _, Sha256};

/// A pair of secret nonce scalars `(r1, r2)`, used to conceal a secret key
/// when signing a message.
///
/// A `SecNonce` must never sign more than one message: two partial
/// signatures under the same nonce reveal the signer's contribution key.
/// [`SigningSession`][crate::SigningSession] enforces this by consuming the
/// nonce when it signs.
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct SecNonce {
    pub(crate) r1: Scalar,
    pub(crate) r2: Scalar,
}

impl SecNonce {
    /// Construct a new `SecNonce` from the given individual nonce values.
    pub fn new<T: Into<Scalar>>(r1: T, r2: T) -> SecNonce {
        SecNonce {
            r1: r1.into(),
            r2: r2.into(),
        }
    }

    /// Samples a random pair of secret nonces from a CSPRNG.
    #[cfg(any(test, feature = "rand"))]
    pub fn random<R>(rng: &mut R) -> SecNonce
    where
        R: rand::RngCore + rand::CryptoRng,
    {
        SecNonce {
            r1: Scalar::random(rng),
            r2: Scalar::random(rng),
        }
    }

    /// Returns the public nonce `(r1·G, r2·G)`, which is safe to share with
    /// the other signers.
    pub fn public_nonce(&self) -> PubNonce {
        PubNonce {
            R1: self.r1 * G,
            R2: self.r2 * G,
        }
    }
}

/// The public half of a [`SecNonce`]: two points `R1` and `R2`.
#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct PubNonce {
    #[allow(missing_docs)]
    pub R1: Point,
    #[allow(missing_docs)]
    pub R2: Point,
}

impl PubNonce {
    /// Construct a new `PubNonce` from the given pair of public nonce points.
    pub fn new<T: Into<Point>>(R1: T, R2: T) -> PubNonce {
        PubNonce {
            R1: R1.into(),
            R2: R2.into(),
        }
    }

    /// Returns this signer's effective nonce point `R1 + b·R2`.
    pub fn effective_nonce(&self, binding_coeff: MaybeScalar) -> MaybePoint {
        self.R1 + binding_coeff * self.R2
    }
}

/// Computes the binding coefficient
/// `b = SHA256(P || R1_1 || R2_1 || ... || R1_N || R2_N || m) mod n`.
///
/// `P` is the untweaked aggregated key. Every point is hashed in its
/// 33-byte compressed form, in signer order.
pub fn compute_binding_coefficient<S: From<MaybeScalar>>(
    aggregated_pubkey: impl Into<Point>,
    pubnonces: &[PubNonce],
    message: impl AsRef<[u8]>,
) -> S {
    let mut hasher = Sha256::new().chain_update(aggregated_pubkey.into().serialize());
    for pubnonce in pubnonces {
        hasher.update(pubnonce.R1.serialize());
        hasher.update(pubnonce.R2.serialize());
    }
    let hash: [u8; 32] = hasher.chain_update(message.as_ref()).finalize().into();

    S::from(MaybeScalar::reduce_from(&hash))
}

/// Computes the final aggregated nonce `R = ΣR1_i + b·ΣR2_i`.
///
/// Returns an error if `R` is the point at infinity, in which case every
/// signer must discard their nonces and start over.
pub fn compute_aggregate_nonce(
    pubnonces: &[PubNonce],
    binding_coeff: MaybeScalar,
) -> Result<Point, DegenerateNonceError> {
    let (r1s, r2s): (Vec<Point>, Vec<Point>) = pubnonces
        .iter()
        .map(|pubnonce| (pubnonce.R1, pubnonce.R2))
        .unzip();

    let aggregated_nonce = Point::sum(r1s) + binding_coeff * Point::sum(r2s);
    Ok(aggregated_nonce.not_inf()?)
}

/// A ladder of nonce material derived deterministically from a seed.
///
/// Each derivation path gives a distinct 32-byte value:
///
/// ```notrust
/// d = SHA256(seed)
/// for p in path:
///     d = SHA256(d || LE32(p))
/// ```
///
/// This is meant for per-path channel nonces and test fixtures, where
/// each path is used for at most one signature. Reusing a path to sign two
/// different messages leaks the signing key just like any other nonce reuse.
#[derive(Clone)]
pub struct DeterministicNonce {
    seed: [u8; 32],
}

impl DeterministicNonce {
    /// Creates a nonce ladder from a seed of any length.
    pub fn new(seed: impl AsRef<[u8]>) -> DeterministicNonce {
        DeterministicNonce {
            seed: Sha256::digest(seed.as_ref()).into(),
        }
    }

    /// Derives the 32-byte value at the given path.
    pub fn nonce(&self, path: &[u32]) -> [u8; 32] {
        path.iter().fold(self.seed, |d, p| {
            Sha256::new()
                .chain_update(d)
                .chain_update(p.to_le_bytes())
                .finalize()
                .into()
        })
    }

    /// Derives a full [`SecNonce`] for the given path, taking `r1` from
    /// `path || 0` and `r2` from `path || 1`.
    ///
    /// Fails if either value is zero or not less than the curve order,
    /// which happens with negligible probability.
    pub fn secnonce(&self, path: &[u32]) -> Result<SecNonce, InvalidKeyError> {
        let mut extended = Vec::with_capacity(path.len() + 1);
        extended.extend_from_slice(path);

        extended.push(0);
        let r1 = Scalar::from_slice(&self.nonce(&extended))?;
        extended.pop();
        extended.push(1);
        let r2 = Scalar::from_slice(&self.nonce(&extended))?;

        Ok(SecNonce { r1, r2 })
    }
}

impl std::fmt::Debug for DeterministicNonce {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("DeterministicNonce(..)")
    }
}

mod encodings {
    use super::*;

    impl BinaryEncoding for SecNonce {
        type Serialized = [u8; 64];

        /// Serializes both scalars into a 64-byte array, `r1 || r2`.
        fn to_bytes(&self) -> Self::Serialized {
            let mut serialized = [0u8; 64];
            serialized[..32].copy_from_slice(&self.r1.serialize());
            serialized[32..].copy_from_slice(&self.r2.serialize());
            serialized
        }

        /// Parses `r1 || r2`, rejecting either scalar if it is zero or not
        /// less than the curve order.
        fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError<Self>> {
            if bytes.len() != 64 {
                return Err(DecodeError::bad_length(bytes.len()));
            }
            let r1 = Scalar::from_slice(&bytes[..32])?;
            let r2 = Scalar::from_slice(&bytes[32..])?;
            Ok(SecNonce { r1, r2 })
        }
    }

    impl BinaryEncoding for PubNonce {
        type Serialized = [u8; 66];

        /// Serializes both points in compressed form, `R1 || R2`.
        fn to_bytes(&self) -> Self::Serialized {
            let mut bytes = [0u8; 66];
            bytes[..33].copy_from_slice(&self.R1.serialize());
            bytes[33..].copy_from_slice(&self.R2.serialize());
            bytes
        }

        fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError<Self>> {
            if bytes.len() != 66 {
                return Err(DecodeError::bad_length(bytes.len()));
            }
            let R1 = Point::from_slice(&bytes[..33])?;
            let R2 = Point::from_slice(&bytes[33..])?;
            Ok(PubNonce { R1, R2 })
        }
    }

    impl_encoding_traits!(SecNonce, 64);
    impl_encoding_traits!(PubNonce, 66);

    // Do not implement Display for SecNonce.
    impl_hex_display!(PubNonce);
}
