use secp::{Point, Scalar, G};

use crate::errors::TweakError;
use crate::tagged_hashes;

use sha2::Digest as _;

/// A public tweak applied to an internal key to produce an output key:
/// `Q = (-1)^negate·P + tweak·G`.
///
/// A tweak is applied once per signature. The holder of the internal
/// key's secret (here, the MuSig group) can still sign for the output key,
/// because the tweak is public and added to the signature exactly once at
/// combination time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputTweak {
    /// Whether the internal key is negated before the tweak is added.
    pub negate: bool,

    /// The tweak scalar `t`.
    pub tweak: Scalar,
}

/// The result of applying an [`OutputTweak`] to an internal key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TweakedKey {
    /// The even-Y output key.
    pub output_key: Point,

    /// Whether the raw tweaked point `Q` had odd Y and was negated to get
    /// `output_key`. Signers must negate their nonce and the final signature
    /// to compensate.
    pub parity_flipped: bool,
}

impl TweakedKey {
    /// Returns the 32-byte x-only serialization of the output key.
    pub fn xonly(&self) -> [u8; 32] {
        self.output_key.serialize_xonly()
    }
}

impl OutputTweak {
    /// Constructs a tweak from its parts.
    pub fn new(negate: bool, tweak: impl Into<Scalar>) -> OutputTweak {
        OutputTweak {
            negate,
            tweak: tweak.into(),
        }
    }

    /// Computes the BIP341 taproot tweak for an internal key:
    /// `t = H_TapTweak(P_x || merkle_root)`, with the root omitted for a
    /// key-path-only output.
    ///
    /// BIP341 always commits to the even-Y lift of `P_x`. If `internal_key`
    /// has odd Y, the returned tweak sets `negate` so that applying it
    /// still yields the BIP341 output key. MuSig aggregated keys are always
    /// even, so for them `negate` is false.
    ///
    /// Fails if the hash is not a valid nonzero scalar.
    pub fn taproot(
        internal_key: impl Into<Point>,
        merkle_root: Option<&[u8; 32]>,
    ) -> Result<OutputTweak, TweakError> {
        let internal_key: Point = internal_key.into();

        let mut hasher = tagged_hashes::TAPROOT_TWEAK_TAG_HASHER
            .clone()
            .chain_update(internal_key.serialize_xonly());
        if let Some(root) = merkle_root {
            hasher.update(root);
        }
        let hash: [u8; 32] = hasher.finalize().into();

        let tweak = Scalar::from_slice(&hash).map_err(|_| TweakError)?;
        Ok(OutputTweak {
            negate: internal_key.has_odd_y(),
            tweak,
        })
    }

    /// Applies this tweak to an internal key, returning the even-Y output
    /// key along with whether normalization negated it.
    ///
    /// Fails if `Q` is the point at infinity.
    pub fn output_key(&self, internal_key: impl Into<Point>) -> Result<TweakedKey, TweakError> {
        let internal_key: Point = internal_key.into();
        let base = if self.negate {
            -internal_key
        } else {
            internal_key
        };

        let tweaked = (base + self.tweak * G).not_inf()?;
        let parity_flipped = tweaked.has_odd_y();

        Ok(TweakedKey {
            output_key: tweaked.to_even_y(),
            parity_flipped,
        })
    }
}
