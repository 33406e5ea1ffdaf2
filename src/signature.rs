use secp::{MaybeScalar, Point};

use crate::errors::DecodeError;
use crate::BinaryEncoding;

/// The number of bytes in a binary-serialized Schnorr signature.
pub const SCHNORR_SIGNATURE_SIZE: usize = 64;

/// A BIP340 Schnorr signature `(R_x, s)`, as produced by a completed
/// [`SigningSession`][crate::SigningSession].
///
/// The nonce point is kept in its x-only form. Its Y coordinate is implicitly
/// even, so verification never has to lift it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactSignature {
    /// The X-only byte representation of the nonce point `R`.
    pub rx: [u8; 32],

    /// The signature scalar.
    pub s: MaybeScalar,
}

impl CompactSignature {
    /// Constructs a `CompactSignature` from a nonce point and a scalar.
    pub fn new(R: impl Into<Point>, s: impl Into<MaybeScalar>) -> CompactSignature {
        CompactSignature {
            rx: R.into().serialize_xonly(),
            s: s.into(),
        }
    }
}

impl BinaryEncoding for CompactSignature {
    type Serialized = [u8; SCHNORR_SIGNATURE_SIZE];

    /// Serializes to `R_x || s`.
    fn to_bytes(&self) -> Self::Serialized {
        let mut serialized = [0u8; SCHNORR_SIGNATURE_SIZE];
        serialized[..32].copy_from_slice(&self.rx);
        serialized[32..].copy_from_slice(&self.s.serialize());
        serialized
    }

    /// Parses `R_x || s`. Rejects any `s` which is not less than the curve
    /// order. `R_x` is not checked here; an `R_x` off the curve simply fails
    /// verification.
    fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError<Self>> {
        if bytes.len() != SCHNORR_SIGNATURE_SIZE {
            return Err(DecodeError::bad_length(bytes.len()));
        }
        let mut rx = [0u8; 32];
        rx.copy_from_slice(&bytes[..32]);
        let s = MaybeScalar::try_from(&bytes[32..])?;
        Ok(CompactSignature { rx, s })
    }
}

impl_encoding_traits!(CompactSignature, SCHNORR_SIGNATURE_SIZE);
impl_hex_display!(CompactSignature);

#[cfg(feature = "secp256k1")]
mod secp256k1_conversions {
    use super::*;

    impl TryFrom<secp256k1::schnorr::Signature> for CompactSignature {
        type Error = DecodeError<Self>;
        fn try_from(signature: secp256k1::schnorr::Signature) -> Result<Self, Self::Error> {
            Self::try_from(signature.to_byte_array())
        }
    }

    impl From<CompactSignature> for secp256k1::schnorr::Signature {
        fn from(signature: CompactSignature) -> Self {
            Self::from_byte_array(signature.to_bytes())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secp::Scalar;

    #[test]
    fn test_signature_encoding() {
        let R = Scalar::try_from([0x07; 32]).unwrap().base_point_mul();
        let s = MaybeScalar::from(Scalar::try_from([0x09; 32]).unwrap());
        let sig = CompactSignature::new(R, s);

        let bytes = sig.serialize();
        assert_eq!(&bytes[..32], &R.serialize_xonly());
        assert_eq!(&bytes[32..], &[0x09; 32]);
        assert_eq!(CompactSignature::try_from(bytes).unwrap(), sig);
        assert_eq!(sig.to_string().parse::<CompactSignature>().unwrap(), sig);

        // s equal to the curve order must be rejected, never reduced.
        let mut overflowing = bytes;
        overflowing[32..].copy_from_slice(&[
            0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
            0xFF, 0xFE, 0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C,
            0xD0, 0x36, 0x41, 0x41,
        ]);
        assert!(CompactSignature::from_bytes(&overflowing).is_err());
        assert!(CompactSignature::from_bytes(&bytes[..63]).is_err());
    }

    #[cfg(feature = "secp256k1")]
    #[test]
    fn test_secp256k1_conversion() {
        let R = Scalar::try_from([0x07; 32]).unwrap().base_point_mul();
        let sig = CompactSignature::new(R, MaybeScalar::Zero);
        let converted = secp256k1::schnorr::Signature::from(sig);
        assert_eq!(CompactSignature::try_from(converted).unwrap(), sig);
    }
}
