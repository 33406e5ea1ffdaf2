use secp::{MaybeScalar, Point, Scalar, G};

use crate::errors::{DeriveError, KeyAggError};
use crate::{MuSigAggregate, SignerKey};

use hmac::Mac as _;
use sha2::Sha512;

/// Child indexes at or above this value are hardened.
pub const HARDENED: u32 = 1 << 31;

fn hmac_sha512(key: &[u8], chunks: &[&[u8]]) -> ([u8; 32], [u8; 32]) {
    let mut mac =
        hmac::Hmac::<Sha512>::new_from_slice(key).expect("Hmac::new_from_slice never fails");
    for chunk in chunks {
        mac.update(chunk);
    }
    let output = mac.finalize().into_bytes();

    let mut left = [0u8; 32];
    let mut right = [0u8; 32];
    left.copy_from_slice(&output[..32]);
    right.copy_from_slice(&output[32..]);
    (left, right)
}

/// A BIP32 extended key: a [`SignerKey`] plus its chain code.
///
/// An extended `Signer` key derives both hardened and normal children. An
/// extended `Verifier` key, as held for a co-signer, derives only normal
/// children, which match the public keys of the co-signer's own children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedKey {
    key: SignerKey,
    chain_code: [u8; 32],
}

impl ExtendedKey {
    /// Constructs an extended key from its parts.
    pub fn new(key: impl Into<SignerKey>, chain_code: [u8; 32]) -> ExtendedKey {
        ExtendedKey {
            key: key.into(),
            chain_code,
        }
    }

    /// Derives the BIP32 master key for a seed.
    pub fn from_seed(seed: impl AsRef<[u8]>) -> Result<ExtendedKey, DeriveError> {
        let (secret, chain_code) = hmac_sha512(b"Bitcoin seed", &[seed.as_ref()]);
        let seckey = Scalar::from_slice(&secret).map_err(|_| DeriveError::InvalidSeed)?;
        Ok(ExtendedKey::new(seckey, chain_code))
    }

    /// Returns the key at this node.
    pub fn key(&self) -> &SignerKey {
        &self.key
    }

    /// Returns the chain code at this node.
    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    /// Returns a verify-only copy of this node, safe to hand to co-signers.
    pub fn neuter(&self) -> ExtendedKey {
        ExtendedKey {
            key: self.key.neuter(),
            chain_code: self.chain_code,
        }
    }

    /// Derives the child at `index`, returning it with the tweak `t` such
    /// that `child = parent + t` (and `child·G = parent·G + t·G`).
    pub fn child(&self, index: u32) -> Result<(ExtendedKey, Scalar), DeriveError> {
        let index_bytes = index.to_be_bytes();
        let (tweak_bytes, chain_code) = if index >= HARDENED {
            let seckey = self
                .key
                .seckey()
                .ok_or(DeriveError::HardenedFromPublic(index))?;
            hmac_sha512(&self.chain_code, &[&[0u8], &seckey.serialize(), &index_bytes])
        } else {
            hmac_sha512(
                &self.chain_code,
                &[&self.key.pubkey().serialize(), &index_bytes],
            )
        };

        let invalid = DeriveError::InvalidChild(index);
        let tweak = Scalar::from_slice(&tweak_bytes).map_err(|_| invalid)?;

        let key = match self.key {
            SignerKey::Signer(seckey) => {
                SignerKey::Signer((seckey + tweak).not_zero().map_err(|_| invalid)?)
            }
            SignerKey::Verifier(pubkey) => {
                SignerKey::Verifier((pubkey + tweak * G).not_inf().map_err(|_| invalid)?)
            }
        };

        Ok((ExtendedKey { key, chain_code }, tweak))
    }

    /// Derives the descendant along `path`, returning it with the sum of
    /// every tweak applied on the way. The parent key plus this sum recovers
    /// the child key.
    pub fn derive(&self, path: &[u32]) -> Result<(ExtendedKey, MaybeScalar), DeriveError> {
        let mut node = self.clone();
        let mut tweak_sum = MaybeScalar::Zero;
        for &index in path {
            let (child, tweak) = node.child(index)?;
            node = child;
            tweak_sum = tweak_sum + tweak;
        }
        Ok((node, tweak_sum))
    }
}

/// The master keys of a MuSig group, from which each signer independently
/// derives per-path keys and aggregates.
///
/// Each party typically holds its own extended `Signer` key and the neutered
/// extended keys of the others, so only normal (non-hardened) paths can be
/// derived by everyone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuSigBase {
    keys: Vec<ExtendedKey>,
}

impl MuSigBase {
    /// Constructs a base from an ordered list of extended master keys.
    pub fn new(keys: impl IntoIterator<Item = ExtendedKey>) -> Result<MuSigBase, KeyAggError> {
        let keys: Vec<ExtendedKey> = keys.into_iter().collect();
        if keys.is_empty() {
            return Err(KeyAggError::NoKeys);
        }
        Ok(MuSigBase { keys })
    }

    /// Returns the extended master keys in signer order.
    pub fn keys(&self) -> &[ExtendedKey] {
        &self.keys
    }

    /// Derives every signer's key along `path` and aggregates the children.
    ///
    /// Also returns each signer's tweak sum along the path, which recovers
    /// that signer's master key from the child key.
    pub fn derive(
        &self,
        path: &[u32],
    ) -> Result<(MuSigAggregate, Vec<MaybeScalar>), DeriveError> {
        let (children, tweaks): (Vec<SignerKey>, Vec<MaybeScalar>) = self
            .keys
            .iter()
            .map(|key| key.derive(path).map(|(child, tweak)| (child.key, tweak)))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .unzip();

        let musig = MuSigAggregate::new(children)?;
        log::debug!(
            "derived aggregate {} at path {:?}",
            musig.aggregated_pubkey::<Point>(),
            path
        );
        Ok((musig, tweaks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(bytes: [u8; 32]) -> String {
        base16ct::lower::encode_string(&bytes)
    }

    #[test]
    fn test_bip32_vector() {
        let seed = base16ct::lower::decode_vec("000102030405060708090a0b0c0d0e0f").unwrap();
        let master = ExtendedKey::from_seed(&seed).unwrap();

        assert_eq!(
            master.key().seckey().unwrap(),
            "e8f32e723decf4051aefac8e2c93c9c5b214313817cdb01a1494b917c8436b35"
                .parse::<Scalar>()
                .unwrap()
        );
        assert_eq!(
            hex(*master.chain_code()),
            "873dff81c02f525623fd1fe5167eac3a55a049de3d314bb42ee227ffed37d508"
        );

        // m/0H/1
        let (child, tweak) = master.derive(&[HARDENED, 1]).unwrap();
        assert_eq!(
            child.key().seckey().unwrap(),
            "3c6cb8d0f6a264c91ea8b5030fadaa8e538b020f0a387421a12de9319dc93368"
                .parse::<Scalar>()
                .unwrap()
        );
        assert_eq!(
            hex(*child.chain_code()),
            "2a7857631386ba23dacac34180dd1983734e444fdbf774041578e9b6adb37c19"
        );
        assert_eq!(
            MaybeScalar::from(master.key().seckey().unwrap()) + tweak,
            MaybeScalar::from(child.key().seckey().unwrap())
        );
    }

    #[test]
    fn test_public_derivation() {
        let master = ExtendedKey::from_seed([0x07; 32]).unwrap();
        let public = master.neuter();

        let (child, tweak) = master.derive(&[3, 9, 27]).unwrap();
        let (public_child, public_tweak) = public.derive(&[3, 9, 27]).unwrap();

        assert_eq!(tweak, public_tweak);
        assert_eq!(child.neuter(), public_child);
        assert!(!public_child.key().can_sign());

        assert_eq!(
            public.child(HARDENED + 4),
            Err(DeriveError::HardenedFromPublic(HARDENED + 4))
        );

        let (root, zero) = public.derive(&[]).unwrap();
        assert_eq!(root, public);
        assert_eq!(zero, MaybeScalar::Zero);
    }

    #[test]
    fn test_musig_base_derivation() {
        let masters = [
            ExtendedKey::from_seed([0x01; 32]).unwrap(),
            ExtendedKey::from_seed([0x02; 32]).unwrap(),
        ];
        assert_eq!(
            masters[0].key().pubkey().to_string(),
            "039822622cf330b98e52e7357135bc93e1e5606a57a9819408734598fe5677b134"
        );

        let base = MuSigBase::new(masters.clone()).unwrap();
        let (musig, tweaks) = base.derive(&[1, 5]).unwrap();

        assert_eq!(
            musig.pubkeys()[0].to_string(),
            "034d585b646c7d53194e2c63ed6a200e62dd87db183909446ff9b9ae6d3f9c828b"
        );
        assert_eq!(
            musig.pubkeys()[1].to_string(),
            "03a8b0424fb76e883c6abe2808dd30c22834313fe4f8c3f91bd54e25f9e7c26165"
        );
        assert_eq!(
            tweaks,
            vec![
                "554ebbef3b5148d6d2e5bd15c51df6f9bcb83952c5dfad8eed7df916bca69fd0"
                    .parse::<MaybeScalar>()
                    .unwrap(),
                "5c1eebb13f72c6fd02b2af9396ec9f8480daa897fd2ec7edfa1d25ff4f039f72"
                    .parse::<MaybeScalar>()
                    .unwrap(),
            ]
        );
        assert_eq!(
            musig.aggregated_pubkey::<Point>().to_string(),
            "02384e7642b1092128b8f95a2bad179aebbecb5fab0688f8a6cc4372d1aeab26ad"
        );

        // Tweaks recover the master keys from the children.
        for (i, master) in masters.iter().enumerate() {
            let child = musig.signer_keys()[i].seckey().unwrap();
            assert_eq!(
                MaybeScalar::from(master.key().seckey().unwrap()) + tweaks[i],
                MaybeScalar::from(child)
            );
        }

        // A co-signer holding only our public master key derives the same
        // aggregate.
        let theirs = MuSigBase::new([masters[0].neuter(), masters[1].clone()]).unwrap();
        let (their_musig, their_tweaks) = theirs.derive(&[1, 5]).unwrap();
        assert_eq!(their_musig, musig);
        assert_eq!(their_tweaks, tweaks);
        assert!(!their_musig.signer_keys()[0].can_sign());

        // Different paths give different aggregates.
        let (other, _) = base.derive(&[1, 6]).unwrap();
        assert_ne!(other.xonly(), musig.xonly());

        assert_eq!(
            theirs.derive(&[HARDENED]),
            Err(DeriveError::HardenedFromPublic(HARDENED))
        );
        assert_eq!(MuSigBase::new(Vec::new()), Err(KeyAggError::NoKeys));
    }
}
