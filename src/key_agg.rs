use secp::{MaybePoint, MaybeScalar, Point, Scalar};

use crate::errors::{DecodeError, InvalidKeyError, KeyAggError};
use crate::BinaryEncoding;

use sha2::{Digest as _, Sha256};

/// One member of a MuSig signing group.
///
/// A `Signer` holds a secret key and may produce partial signatures.
/// A `Verifier` holds only the public key of a remote co-signer; it takes
/// part in key aggregation and partial signature verification, but can
/// never sign. A group may mix both freely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignerKey {
    /// A signer whose secret key we hold.
    Signer(Scalar),

    /// A co-signer of whom we only know the public key.
    Verifier(Point),
}

impl SignerKey {
    /// Parses a 32-byte big-endian secret key. Rejects zero and any value
    /// not less than the curve order.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<SignerKey, InvalidKeyError> {
        Ok(SignerKey::Signer(Scalar::from_slice(bytes)?))
    }

    /// Parses a 33-byte compressed public key. Rejects points which are not
    /// on the curve.
    pub fn from_pubkey_bytes(bytes: &[u8]) -> Result<SignerKey, InvalidKeyError> {
        Ok(SignerKey::Verifier(Point::from_slice(bytes)?))
    }

    /// Returns the public key of this signer.
    pub fn pubkey(&self) -> Point {
        match self {
            SignerKey::Signer(seckey) => seckey.base_point_mul(),
            SignerKey::Verifier(pubkey) => *pubkey,
        }
    }

    /// Returns the secret key, if we hold it.
    pub fn seckey(&self) -> Option<Scalar> {
        match self {
            SignerKey::Signer(seckey) => Some(*seckey),
            SignerKey::Verifier(_) => None,
        }
    }

    /// Returns true if this key can produce partial signatures.
    pub fn can_sign(&self) -> bool {
        matches!(self, SignerKey::Signer(_))
    }

    /// Returns a verify-only copy of this key, safe to hand to other parties.
    pub fn neuter(&self) -> SignerKey {
        SignerKey::Verifier(self.pubkey())
    }
}

impl From<Scalar> for SignerKey {
    fn from(seckey: Scalar) -> Self {
        SignerKey::Signer(seckey)
    }
}

impl From<Point> for SignerKey {
    fn from(pubkey: Point) -> Self {
        SignerKey::Verifier(pubkey)
    }
}

/// An aggregated MuSig public key, along with everything needed to sign
/// for it.
///
/// A `MuSigAggregate` is computed from an ordered list of [`SignerKey`]s.
/// Each signer's public key `X_i` is weighted by a multiplier `mul[i]`
/// derived from a hash over the whole key list, which prevents any
/// signer from choosing their key as a function of the others' keys
/// (key cancellation). The aggregated key is `P = Σ mul[i]·X_i`, always
/// normalized to even Y by negating every multiplier if needed.
///
/// The order of the keys is part of the aggregate's identity: the same keys
/// in a different order produce a different aggregated key.
#[derive(Debug, Clone)]
pub struct MuSigAggregate {
    /// The aggregated pubkey point `P`, always with even Y.
    pub(crate) pubkey: Point,

    /// The signer keys in their original order.
    pub(crate) keys: Vec<SignerKey>,

    /// Cached public keys of `keys`, in the same order.
    pub(crate) ordered_pubkeys: Vec<Point>,

    /// Multipliers `mul[i]`, already negated if `negated` is set.
    pub(crate) multipliers: Vec<MaybeScalar>,

    /// Whether the raw weighted sum had odd Y and was negated.
    pub(crate) negated: bool,

    /// `mul[i]·X_i` for each signer.
    pub(crate) contribution_points: Vec<MaybePoint>,
}

impl MuSigAggregate {
    /// Aggregates an ordered list of signer keys.
    ///
    /// Accepts anything which converts into a [`SignerKey`], so a list of
    /// [`secp::Point`]s (all verify-only) or [`secp::Scalar`]s (all signers)
    /// works as well as a mixed list of `SignerKey`s.
    ///
    /// ```
    /// use musig2_ptlc::{MuSigAggregate, SignerKey};
    /// use secp::Scalar;
    ///
    /// let alice = Scalar::try_from([b'a'; 32]).unwrap();
    /// let bob = Scalar::try_from([b'b'; 32]).unwrap();
    ///
    /// let ours = MuSigAggregate::new([
    ///     SignerKey::Signer(alice),
    ///     SignerKey::Verifier(bob.base_point_mul()),
    /// ])
    /// .unwrap();
    ///
    /// let theirs = MuSigAggregate::new([
    ///     SignerKey::Verifier(alice.base_point_mul()),
    ///     SignerKey::Signer(bob),
    /// ])
    /// .unwrap();
    ///
    /// assert_eq!(ours.xonly(), theirs.xonly());
    ///
    /// let reordered = MuSigAggregate::new([bob, alice]).unwrap();
    /// assert_ne!(ours.xonly(), reordered.xonly());
    /// ```
    ///
    /// Signers are identified by their index from zero, in the order
    /// the iterator yields them.
    pub fn new<I, T>(keys: I) -> Result<Self, KeyAggError>
    where
        I: IntoIterator<Item = T>,
        SignerKey: From<T>,
    {
        let keys: Vec<SignerKey> = keys.into_iter().map(SignerKey::from).collect();
        if keys.is_empty() {
            return Err(KeyAggError::NoKeys);
        }
        if keys.len() > u32::MAX as usize {
            return Err(KeyAggError::TooManyKeys);
        }

        let ordered_pubkeys: Vec<Point> = keys.iter().map(SignerKey::pubkey).collect();
        let pk_list_hasher = hash_pubkeys(&ordered_pubkeys);

        let mut multipliers: Vec<MaybeScalar> = (0..ordered_pubkeys.len())
            .map(|i| compute_multiplier(&pk_list_hasher, i as u32))
            .collect();

        let weighted_pubkeys: Vec<MaybePoint> = ordered_pubkeys
            .iter()
            .zip(&multipliers)
            .map(|(&pubkey, &mul)| pubkey * mul)
            .collect();

        let mut pubkey = MaybePoint::sum(weighted_pubkeys).not_inf()?;

        // Negating every multiplier negates the sum, so the aggregated
        // secret key stays consistent with the even-Y aggregated pubkey.
        let negated = pubkey.has_odd_y();
        if negated {
            pubkey = -pubkey;
            for mul in multipliers.iter_mut() {
                *mul = -*mul;
            }
        }

        let contribution_points = ordered_pubkeys
            .iter()
            .zip(&multipliers)
            .map(|(&pubkey, &mul)| pubkey * mul)
            .collect();

        log::debug!(
            "aggregated {} signer keys into {} (negated: {})",
            keys.len(),
            pubkey,
            negated
        );

        Ok(MuSigAggregate {
            pubkey,
            keys,
            ordered_pubkeys,
            multipliers,
            negated,
            contribution_points,
        })
    }

    /// Returns the aggregated public key `P`, converted to a given type.
    /// It always has even Y.
    pub fn aggregated_pubkey<T: From<Point>>(&self) -> T {
        T::from(self.pubkey)
    }

    /// Returns the 32-byte x-only serialization of the aggregated key.
    pub fn xonly(&self) -> [u8; 32] {
        self.pubkey.serialize_xonly()
    }

    /// Returns true if the raw weighted key sum had odd Y, and so every
    /// multiplier was negated.
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Returns the number of signers in the group.
    pub fn n_signers(&self) -> usize {
        self.keys.len()
    }

    /// Returns a read-only reference to the ordered set of public keys
    /// which this aggregate was created with.
    pub fn pubkeys(&self) -> &[Point] {
        &self.ordered_pubkeys
    }

    /// Returns the signer keys in their original order.
    pub fn signer_keys(&self) -> &[SignerKey] {
        &self.keys
    }

    /// Returns the public key for a given signer's index.
    pub fn get_pubkey<T: From<Point>>(&self, index: usize) -> Option<T> {
        self.ordered_pubkeys.get(index).copied().map(T::from)
    }

    /// Returns the multiplier `mul[i]` applied to signer `i`'s key, after
    /// any negation.
    pub fn multiplier(&self, index: usize) -> Option<MaybeScalar> {
        self.multipliers.get(index).copied()
    }

    /// Returns signer `i`'s weighted public key `mul[i]·X_i`. Partial
    /// signatures from signer `i` are verified against this point.
    pub fn contribution_point(&self, index: usize) -> Option<MaybePoint> {
        self.contribution_points.get(index).copied()
    }

    /// Returns signer `i`'s weighted secret key `mul[i]·x_i`.
    ///
    /// Returns `None` if the index is out of range or if signer `i` is
    /// verify-only.
    pub fn contribution_key(&self, index: usize) -> Option<MaybeScalar> {
        let seckey = self.keys.get(index)?.seckey()?;
        Some(self.multipliers[index] * seckey)
    }
}

/// Starts a hash engine over the concatenated compressed keys. The engine
/// is cloned to derive each signer's multiplier, so its state stays shared.
fn hash_pubkeys(ordered_pubkeys: &[Point]) -> Sha256 {
    let mut h = Sha256::new();
    for pubkey in ordered_pubkeys {
        h.update(pubkey.serialize());
    }
    h
}

fn compute_multiplier(pk_list_hasher: &Sha256, index: u32) -> MaybeScalar {
    let hash: [u8; 32] = pk_list_hasher
        .clone()
        .chain_update(index.to_le_bytes())
        .finalize()
        .into();

    MaybeScalar::reduce_from(&hash)
}

impl PartialEq for MuSigAggregate {
    /// Two aggregates are equal if they were built from the same public keys
    /// in the same order. Whether we hold secret keys for them is irrelevant.
    fn eq(&self, other: &Self) -> bool {
        self.ordered_pubkeys == other.ordered_pubkeys
    }
}

impl Eq for MuSigAggregate {}

impl BinaryEncoding for MuSigAggregate {
    type Serialized = Vec<u8>;

    /// Serializes the public identity of the aggregate:
    ///
    /// - `n_pubkey` (4 bytes)
    ///     - Big-endian encoded `u32`, the number of pubkeys which follow.
    /// - `ordered_pubkeys` (33 * `n_pubkey` bytes)
    ///     - The compressed public keys in signer order.
    ///
    /// Secret keys are never serialized. Decoding yields an aggregate in
    /// which every signer is a [`SignerKey::Verifier`].
    fn to_bytes(&self) -> Self::Serialized {
        let n_pubkey = self.ordered_pubkeys.len();
        let mut serialized = Vec::<u8>::with_capacity(4 + n_pubkey * 33);

        serialized.extend_from_slice(&(n_pubkey as u32).to_be_bytes());
        for pubkey in self.ordered_pubkeys.iter() {
            serialized.extend_from_slice(&pubkey.serialize());
        }
        serialized
    }

    /// Deserializes a `MuSigAggregate` from its binary serialization.
    fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError<Self>> {
        // minimum length: 4 byte n_pubkey + 33 byte pubkey
        if bytes.len() < 37 {
            return Err(DecodeError::bad_length(bytes.len()));
        }

        let n_pubkey = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        if bytes.len() - 4 != n_pubkey * 33 {
            return Err(DecodeError::bad_length(bytes.len()));
        }

        let pubkeys: Vec<Point> = bytes[4..]
            .chunks_exact(33)
            .map(Point::from_slice)
            .collect::<Result<_, _>>()?;

        Ok(MuSigAggregate::new(pubkeys)?)
    }
}

impl_encoding_traits!(MuSigAggregate);
impl_hex_display!(MuSigAggregate);
