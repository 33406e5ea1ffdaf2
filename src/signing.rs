use crate::errors::{InvalidKeyError, VerifyError};
use crate::tagged_hashes;

use secp::{MaybePoint, MaybeScalar, Point, Scalar, G};

use sha2::Digest as _;

/// Partial signatures are just scalars in the range `[0, n)`.
///
/// See the documentation of [`secp::MaybeScalar`] for the
/// parsing, serializing, and conversion traits available
/// on this type.
pub type PartialSignature = MaybeScalar;

/// Computes the BIP340 challenge `e = H_challenge(R_x || P_x || m) mod n`.
///
/// Only the X coordinate of `pubkey` is hashed, so its parity does not matter.
pub fn compute_challenge_hash<S: From<MaybeScalar>>(
    nonce_xonly: &[u8; 32],
    pubkey: &Point,
    message: impl AsRef<[u8]>,
) -> S {
    let hash: [u8; 32] = tagged_hashes::BIP0340_CHALLENGE_TAG_HASHER
        .clone()
        .chain_update(nonce_xonly)
        .chain_update(pubkey.serialize_xonly())
        .chain_update(message.as_ref())
        .finalize()
        .into();

    S::from(MaybeScalar::reduce_from(&hash))
}

/// Computes a single contribution `s = k + e·d` to a Schnorr signature for
/// the final nonce `R_x` and final public key `P_x`.
///
/// Both `d` and `k` must already carry whatever sign corrections the session
/// requires; this function does no parity bookkeeping of its own. Passing
/// `None` as the nonce yields `e·d` alone, which is how a public tweak is
/// folded into an aggregated signature.
///
/// Returns an error if either X coordinate does not lift to a curve point.
pub fn sign_partial_schnorr<T: From<PartialSignature>>(
    nonce_xonly: &[u8; 32],
    pubkey_xonly: &[u8; 32],
    message: impl AsRef<[u8]>,
    partial_key: Scalar,
    partial_nonce: Option<Scalar>,
) -> Result<T, InvalidKeyError> {
    let pubkey = Point::lift_x(*pubkey_xonly)?;
    Point::lift_x(*nonce_xonly)?;

    let e: MaybeScalar = compute_challenge_hash(nonce_xonly, &pubkey, &message);
    let k = partial_nonce.map(MaybeScalar::from).unwrap_or(MaybeScalar::Zero);

    Ok(T::from(k + e * partial_key))
}

/// Verifies a single signature contribution `s` against the public
/// counterparts of its key and nonce: `s·G - e·D == K`.
///
/// As with [`sign_partial_schnorr`], `partial_pubkey` (`D`) and
/// `partial_pubnonce` (`K`) must carry the same sign corrections the signer
/// applied to their secret values.
pub fn verify_partial_schnorr(
    nonce_xonly: &[u8; 32],
    pubkey_xonly: &[u8; 32],
    message: impl AsRef<[u8]>,
    partial_pubkey: impl Into<MaybePoint>,
    partial_pubnonce: impl Into<MaybePoint>,
    partial_signature: impl Into<PartialSignature>,
) -> Result<(), VerifyError> {
    let pubkey = Point::lift_x(*pubkey_xonly).map_err(|_| VerifyError::BadSignature)?;
    Point::lift_x(*nonce_xonly).map_err(|_| VerifyError::BadSignature)?;

    let D: MaybePoint = partial_pubkey.into();
    let K: MaybePoint = partial_pubnonce.into();
    let s: MaybeScalar = partial_signature.into();
    let e: MaybeScalar = compute_challenge_hash(nonce_xonly, &pubkey, &message);

    if s * G - e * D != K {
        return Err(VerifyError::BadSignature);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify_single;

    #[test]
    fn test_single_contribution_is_bip340() {
        for _ in 0..8 {
            let seckey = Scalar::random(&mut rand::rng());
            let nonce = Scalar::random(&mut rand::rng());
            let message = [0x33u8; 32];

            let pubkey = seckey.base_point_mul();
            let R = nonce.base_point_mul();
            let d = seckey.negate_if(pubkey.parity());
            let k = nonce.negate_if(R.parity());

            let s: PartialSignature = sign_partial_schnorr(
                &R.serialize_xonly(),
                &pubkey.serialize_xonly(),
                message,
                d,
                Some(k),
            )
            .unwrap();

            let mut signature = [0u8; 64];
            signature[..32].copy_from_slice(&R.serialize_xonly());
            signature[32..].copy_from_slice(&s.serialize());
            verify_single(pubkey, signature, message).expect("signature should verify");

            verify_partial_schnorr(
                &R.serialize_xonly(),
                &pubkey.serialize_xonly(),
                message,
                d * G,
                k * G,
                s,
            )
            .expect("partial should verify");

            assert_eq!(
                verify_partial_schnorr(
                    &R.serialize_xonly(),
                    &pubkey.serialize_xonly(),
                    message,
                    d * G,
                    -(k * G),
                    s,
                ),
                Err(VerifyError::BadSignature)
            );
        }
    }

    #[test]
    fn test_nonceless_contribution() {
        let tweak = Scalar::try_from([0x05; 32]).unwrap();
        let pubkey = Scalar::try_from([0x06; 32]).unwrap().base_point_mul();
        let R = Scalar::try_from([0x07; 32]).unwrap().base_point_mul();
        let message = [0u8; 32];

        let s: MaybeScalar = sign_partial_schnorr(
            &R.serialize_xonly(),
            &pubkey.serialize_xonly(),
            message,
            tweak,
            None,
        )
        .unwrap();

        let e: MaybeScalar = compute_challenge_hash(&R.serialize_xonly(), &pubkey, message);
        assert_eq!(s, e * tweak);

        verify_partial_schnorr(
            &R.serialize_xonly(),
            &pubkey.serialize_xonly(),
            message,
            tweak * G,
            MaybePoint::Infinity,
            s,
        )
        .unwrap();
    }

    #[test]
    fn test_rejects_unliftable_coordinates() {
        let key = Scalar::try_from([0x05; 32]).unwrap();
        let valid_x = key.base_point_mul().serialize_xonly();

        // x = 5 has no square root for y^2 = x^3 + 7.
        let mut invalid_x = [0u8; 32];
        invalid_x[31] = 5;

        assert_eq!(
            sign_partial_schnorr::<MaybeScalar>(&valid_x, &invalid_x, [0u8; 32], key, None),
            Err(InvalidKeyError)
        );
        assert_eq!(
            sign_partial_schnorr::<MaybeScalar>(&invalid_x, &valid_x, [0u8; 32], key, Some(key)),
            Err(InvalidKeyError)
        );
        assert_eq!(
            verify_partial_schnorr(
                &invalid_x,
                &valid_x,
                [0u8; 32],
                key * G,
                key * G,
                MaybeScalar::Zero
            ),
            Err(VerifyError::BadSignature)
        );
    }
}
