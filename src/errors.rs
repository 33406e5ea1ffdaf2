//! Various error types for different kinds of failures.

use std::error::Error;
use std::fmt;

/// Returned when a secret scalar is zero or not less than the curve order,
/// or when public key bytes do not describe a point on the curve.
///
/// Out-of-range secrets are never reduced or wrapped; the caller must supply
/// fresh key material.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct InvalidKeyError;
impl fmt::Display for InvalidKeyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("invalid key: not a valid curve point or a scalar in [1, n-1]")
    }
}
impl Error for InvalidKeyError {}
impl From<secp::errors::InvalidScalarBytes> for InvalidKeyError {
    fn from(_: secp::errors::InvalidScalarBytes) -> Self {
        InvalidKeyError
    }
}
impl From<secp::errors::InvalidPointBytes> for InvalidKeyError {
    fn from(_: secp::errors::InvalidPointBytes) -> Self {
        InvalidKeyError
    }
}
impl From<secp::errors::ZeroScalarError> for InvalidKeyError {
    fn from(_: secp::errors::ZeroScalarError) -> Self {
        InvalidKeyError
    }
}

/// Returned when building a [`MuSigAggregate`][crate::MuSigAggregate] fails.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum KeyAggError {
    /// No signer keys were given.
    NoKeys,

    /// More than `u32::MAX` signer keys were given, so signer indexes
    /// cannot be hashed as 4-byte integers.
    TooManyKeys,

    /// The weighted sum of the public keys is the point at infinity.
    Infinity,
}
impl fmt::Display for KeyAggError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "failed to aggregate public keys: {}",
            match self {
                Self::NoKeys => "empty set of signer keys",
                Self::TooManyKeys => "number of signer keys exceeds u32::MAX",
                Self::Infinity => "aggregated key is the point at infinity",
            }
        )
    }
}
impl Error for KeyAggError {}
impl From<secp::errors::InfinityPointError> for KeyAggError {
    fn from(_: secp::errors::InfinityPointError) -> Self {
        KeyAggError::Infinity
    }
}

/// Returned when deriving a child [`ExtendedKey`][crate::ExtendedKey] or a
/// per-path aggregate from a [`MuSigBase`][crate::MuSigBase].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DeriveError {
    /// A hardened index was requested from a key whose secret we do not hold.
    HardenedFromPublic(u32),

    /// The child at this index is invalid (`IL >= n`, or a zero or infinite
    /// child key). Callers should skip to the next index.
    InvalidChild(u32),

    /// The seed does not produce a valid master secret key.
    InvalidSeed,

    /// The derived child keys could not be aggregated.
    KeyAgg(KeyAggError),
}
impl fmt::Display for DeriveError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::HardenedFromPublic(index) => write!(
                f,
                "cannot derive hardened child {} from a public key",
                index
            ),
            Self::InvalidChild(index) => write!(f, "child key at index {} is invalid", index),
            Self::InvalidSeed => f.write_str("seed does not produce a valid master key"),
            Self::KeyAgg(e) => write!(f, "{}", e),
        }
    }
}
impl Error for DeriveError {}
impl From<KeyAggError> for DeriveError {
    fn from(e: KeyAggError) -> Self {
        DeriveError::KeyAgg(e)
    }
}

/// Returned when applying an [`OutputTweak`][crate::OutputTweak] results in
/// the point at infinity, or when a taproot tweak hash exceeds the curve
/// order (exceedingly unlikely).
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct TweakError;
impl fmt::Display for TweakError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("tweak value is invalid")
    }
}
impl Error for TweakError {}
impl From<secp::errors::InfinityPointError> for TweakError {
    fn from(_: secp::errors::InfinityPointError) -> Self {
        TweakError
    }
}

/// Returned when the aggregated nonce `R = ΣR1 + b·ΣR2` is the point at infinity.
///
/// The session must be discarded and restarted with fresh nonces from every
/// signer.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct DegenerateNonceError;
impl fmt::Display for DegenerateNonceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("aggregated nonce is the point at infinity; restart with fresh nonces")
    }
}
impl Error for DegenerateNonceError {}
impl From<secp::errors::InfinityPointError> for DegenerateNonceError {
    fn from(_: secp::errors::InfinityPointError) -> Self {
        DegenerateNonceError
    }
}

/// Returned when passing a signer index which is out of range for a
/// group of signers
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct SignerIndexError {
    /// The index of the signer we did not expect to receive.
    pub index: usize,

    /// The total size of the signing group.
    pub n_signers: usize,
}
impl fmt::Display for SignerIndexError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "signer index {} is out of range for group of {} signers",
            self.index, self.n_signers
        )
    }
}
impl Error for SignerIndexError {}

impl SignerIndexError {
    /// Construct a new `SignerIndexError` indicating we received an
    /// invalid index for the given group size of signers.
    pub(crate) fn new(index: usize, n_signers: usize) -> SignerIndexError {
        SignerIndexError { index, n_signers }
    }
}

/// Error returned when verification fails.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum VerifyError {
    /// The signature is not valid for the given key and message.
    BadSignature,
}
impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "failed to verify signature: {}",
            match self {
                Self::BadSignature => "signature is invalid",
            }
        )
    }
}
impl Error for VerifyError {}

/// Returned by [`SigningSession`][crate::SigningSession] operations.
///
/// Most variants describe an operation requested before the session reached
/// the state it requires.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum SessionError {
    /// The signer index is out of range for the group.
    SignerIndex(SignerIndexError),

    /// No message has been set on the session.
    MissingMessage,

    /// Public nonces are still missing from the listed signers.
    MissingNonces(Vec<usize>),

    /// We hold no secret nonce for this signer, either because it was never
    /// set or because it was already consumed by an earlier partial signature.
    MissingSecretNonce(usize),

    /// The signer at this index is verify-only and cannot produce partial
    /// signatures.
    VerifyOnlySigner(usize),

    /// Partial signatures are still missing from the listed signers.
    MissingPartials(Vec<usize>),

    /// The signer's contribution key or nonce scalar is zero or out of range.
    InvalidKey,

    /// The aggregated nonce is the point at infinity.
    DegenerateNonce,

    /// A partial signature received from this signer does not verify.
    InvalidPartial(usize),

    /// The combined signature does not verify against the output key.
    InvalidSignature(VerifyError),
}
impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::SignerIndex(e) => write!(f, "{}", e),
            Self::MissingMessage => f.write_str("no message has been set"),
            Self::MissingNonces(holdouts) => {
                write!(f, "still waiting for nonces from signers {:?}", holdouts)
            }
            Self::MissingSecretNonce(i) => write!(f, "no unused secret nonce for signer {}", i),
            Self::VerifyOnlySigner(i) => write!(f, "signer {} holds no secret key", i),
            Self::MissingPartials(holdouts) => write!(
                f,
                "still waiting for partial signatures from signers {:?}",
                holdouts
            ),
            Self::InvalidKey => write!(f, "{}", InvalidKeyError),
            Self::DegenerateNonce => write!(f, "{}", DegenerateNonceError),
            Self::InvalidPartial(i) => {
                write!(f, "received invalid partial signature from signer {}", i)
            }
            Self::InvalidSignature(e) => write!(f, "combined signature is invalid: {}", e),
        }
    }
}
impl Error for SessionError {}

impl From<SignerIndexError> for SessionError {
    fn from(e: SignerIndexError) -> Self {
        SessionError::SignerIndex(e)
    }
}

impl From<InvalidKeyError> for SessionError {
    fn from(_: InvalidKeyError) -> Self {
        SessionError::InvalidKey
    }
}

impl From<secp::errors::ZeroScalarError> for SessionError {
    fn from(_: secp::errors::ZeroScalarError) -> Self {
        SessionError::InvalidKey
    }
}

impl From<DegenerateNonceError> for SessionError {
    fn from(_: DegenerateNonceError) -> Self {
        SessionError::DegenerateNonce
    }
}

impl From<VerifyError> for SessionError {
    fn from(e: VerifyError) -> Self {
        SessionError::InvalidSignature(e)
    }
}

/// Returned when asking a [`RevocableSecret`][crate::RevocableSecret] for a
/// level it cannot derive.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct LevelError {
    /// The level which was requested.
    pub level: u32,

    /// The ceiling of the ladder; only levels strictly below it are derivable.
    pub ceiling: u32,
}
impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "level {} is not derivable from a secret with ceiling {}",
            self.level, self.ceiling
        )
    }
}
impl Error for LevelError {}

/// Returned when constructing a [`RevocableSecret`][crate::RevocableSecret]
/// with a ceiling above [`MAX_CEILING`][crate::MAX_CEILING].
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct CeilingError {
    /// The rejected ceiling.
    pub ceiling: u32,
}
impl fmt::Display for CeilingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "ceiling {} exceeds the maximum of {}",
            self.ceiling,
            crate::MAX_CEILING
        )
    }
}
impl Error for CeilingError {}

/// Enumerates the various reasons why binary or hex decoding
/// could fail.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum DecodeFailureReason {
    /// The hex string's format was incorrect, which could mean
    /// it either was the wrong length or held invalid characters.
    BadHexFormat(base16ct::Error),

    /// The byte slice we tried to deserialize had the wrong length.
    BadLength(usize),

    /// The bytes contained coordinates to a point that is not on
    /// the secp256k1 curve.
    InvalidPoint,

    /// The bytes slice contained a representation of a scalar which
    /// is outside the required finite field's range.
    InvalidScalar,

    /// Custom error reason.
    Custom(String),
}

/// Returned when decoding a certain data structure of type `T` fails.
///
/// The type `T` only serves as a compile-time safety check; no
/// data of type `T` is actually owned by this error.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct DecodeError<T> {
    /// The reason for the decoding failure.
    pub reason: DecodeFailureReason,
    phantom: std::marker::PhantomData<T>,
}

impl<T> DecodeError<T> {
    /// Construct a new decoding error for type `T` given a cause
    /// for the failure.
    pub fn new(reason: DecodeFailureReason) -> Self {
        DecodeError {
            reason,
            phantom: std::marker::PhantomData,
        }
    }

    /// Create a decoding error caused by an incorrect input byte
    /// slice length.
    pub fn bad_length(size: usize) -> Self {
        let reason = DecodeFailureReason::BadLength(size);
        DecodeError::new(reason)
    }

    /// Create a custom decoding failure.
    pub fn custom(s: impl fmt::Display) -> Self {
        let reason = DecodeFailureReason::Custom(s.to_string());
        DecodeError::new(reason)
    }
}

impl<T> fmt::Display for DecodeError<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use DecodeFailureReason::*;

        write!(
            f,
            "error decoding {}: {}",
            std::any::type_name::<T>(),
            match &self.reason {
                BadHexFormat(e) => format!("hex decoding error: {}", e),
                BadLength(size) => format!("unexpected length {}", size),
                InvalidPoint => secp::errors::InvalidPointBytes.to_string(),
                InvalidScalar => secp::errors::InvalidScalarBytes.to_string(),
                Custom(s) => s.to_string(),
            }
        )
    }
}

impl<T: fmt::Debug> Error for DecodeError<T> {}

impl<T> From<secp::errors::InvalidPointBytes> for DecodeError<T> {
    fn from(_: secp::errors::InvalidPointBytes) -> Self {
        DecodeError::new(DecodeFailureReason::InvalidPoint)
    }
}

impl<T> From<secp::errors::InvalidScalarBytes> for DecodeError<T> {
    fn from(_: secp::errors::InvalidScalarBytes) -> Self {
        DecodeError::new(DecodeFailureReason::InvalidScalar)
    }
}

impl<T> From<base16ct::Error> for DecodeError<T> {
    fn from(e: base16ct::Error) -> Self {
        DecodeError::new(DecodeFailureReason::BadHexFormat(e))
    }
}

impl<T> From<KeyAggError> for DecodeError<T> {
    fn from(e: KeyAggError) -> Self {
        DecodeError::custom(e)
    }
}
