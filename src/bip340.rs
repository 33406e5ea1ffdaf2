use crate::errors::VerifyError;
use crate::{compute_challenge_hash, CompactSignature};

use secp::{MaybeScalar, Point, G};

use subtle::ConstantTimeEq as _;

/// Verifies a [BIP340](https://github.com/bitcoin/bips/blob/master/bip-0340.mediawiki)
/// Schnorr signature, whether it came from a MuSig session or a single signer.
///
/// The `pubkey` is lifted to even Y before use, so passing the output key of a
/// session in either parity gives the same answer. The `signature` argument may
/// be anything which converts fallibly into a [`CompactSignature`], such as
/// `[u8; 64]` or `&[u8]`; a conversion failure is reported as
/// [`VerifyError::BadSignature`].
///
/// Verification is pure: calling it repeatedly with the same inputs always
/// gives the same result.
pub fn verify_single<P, T>(
    pubkey: P,
    signature: T,
    message: impl AsRef<[u8]>,
) -> Result<(), VerifyError>
where
    Point: From<P>,
    CompactSignature: TryFrom<T>,
{
    use VerifyError::BadSignature;

    let pubkey = Point::from(pubkey).to_even_y();
    let CompactSignature { rx, s } =
        CompactSignature::try_from(signature).map_err(|_| BadSignature)?;
    let e: MaybeScalar = compute_challenge_hash(&rx, &pubkey, message);

    // R = sG - eP, which saves us from lifting R_x.
    let verification_point = (s * G - e * pubkey).not_inf().map_err(|_| BadSignature)?;
    if verification_point.has_odd_y() {
        return Err(BadSignature);
    }

    if bool::from(verification_point.serialize_xonly().ct_eq(&rx)) {
        Ok(())
    } else {
        Err(BadSignature)
    }
}
