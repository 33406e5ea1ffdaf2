//! Hash-chain secrets for revoking old channel states.
//!
//! A [`RevocableSecret`] is a ladder of values derived from a seed by
//! repeated SHA256. The value at level `i` is the hash of the value at
//! level `i + 1`, so revealing one level discloses that level and lets a
//! counterparty derive every lower level, but nothing above it. Revoking a
//! state means revealing its level; levels are consumed from the top of the
//! ladder downward.

use crate::errors::{CeilingError, LevelError};
use crate::DeterministicNonce;

use sha2::{Digest as _, Sha256};
use subtle::ConstantTimeEq as _;

/// The highest ceiling a [`RevocableSecret`] may have, bounding the number
/// of hashes any derivation performs.
pub const MAX_CEILING: u32 = 10000;

fn hash_chain(seed: [u8; 32], iterations: u32) -> [u8; 32] {
    (0..iterations).fold(seed, |d, _| Sha256::digest(d).into())
}

/// A hash ladder of secrets with levels `0..ceiling`.
///
/// ```
/// use musig2_ptlc::RevocableSecret;
///
/// let secret = RevocableSecret::new([0x11; 32], 100).unwrap();
/// let revealed = secret.reveal(80).unwrap();
///
/// // The revealed ladder is seeded with the secret at level 80 itself ...
/// let level_80 = secret.get(80).unwrap();
/// assert_eq!(revealed, RevocableSecret::new(level_80, 80).unwrap());
/// // ... so the counterparty can derive every level below 80.
/// assert_eq!(revealed.get(50), secret.get(50));
/// // `get` only answers below the ceiling, even though level 80 is disclosed.
/// assert!(revealed.get(80).is_err());
/// ```
#[derive(Clone)]
pub struct RevocableSecret {
    seed: [u8; 32],
    ceiling: u32,
}

impl RevocableSecret {
    /// Creates a ladder with the given ceiling. Fails if the ceiling
    /// exceeds [`MAX_CEILING`].
    pub fn new(seed: [u8; 32], ceiling: u32) -> Result<RevocableSecret, CeilingError> {
        if ceiling > MAX_CEILING {
            return Err(CeilingError { ceiling });
        }
        Ok(RevocableSecret { seed, ceiling })
    }

    /// Creates a ladder with a ceiling of [`MAX_CEILING`].
    pub fn with_max_ceiling(seed: [u8; 32]) -> RevocableSecret {
        RevocableSecret {
            seed,
            ceiling: MAX_CEILING,
        }
    }

    /// Returns the ceiling. Only levels strictly below it are derivable.
    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    /// Returns the secret at `level`, which is the seed hashed
    /// `ceiling - level` times.
    pub fn get(&self, level: u32) -> Result<[u8; 32], LevelError> {
        if level >= self.ceiling {
            return Err(LevelError {
                level,
                ceiling: self.ceiling,
            });
        }
        Ok(self.derive(level))
    }

    /// Returns the ladder handed to a counterparty when revoking `level`:
    /// the secret at `level`, used as a seed with `level` as the ceiling.
    ///
    /// This discloses the secret at `level` itself and every level below
    /// it. The returned ladder's `get` answers only for levels strictly below
    /// `level`, and nothing above `level` can be derived from it.
    pub fn reveal(&self, level: u32) -> Result<RevocableSecret, LevelError> {
        Ok(RevocableSecret {
            seed: self.get(level)?,
            ceiling: level,
        })
    }

    /// Like `get`, but also accepts `level == ceiling`, which yields the
    /// seed itself.
    fn derive(&self, level: u32) -> [u8; 32] {
        debug_assert!(level <= self.ceiling);
        hash_chain(self.seed, self.ceiling - level)
    }
}

impl PartialEq for RevocableSecret {
    /// Two ladders are equal if they agree at the lower of their ceilings,
    /// and hence at every level below it.
    fn eq(&self, other: &Self) -> bool {
        let level = self.ceiling.min(other.ceiling);
        bool::from(self.derive(level).ct_eq(&other.derive(level)))
    }
}

impl Eq for RevocableSecret {}

impl std::fmt::Debug for RevocableSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("RevocableSecret")
            .field("ceiling", &self.ceiling)
            .finish_non_exhaustive()
    }
}

/// A two-level ladder: each level `i` of a top ladder seeds its own
/// sub-ladder of [`MAX_CEILING`] levels.
///
/// The top ladder has ceiling `i`, and the sub-ladder for top level `i`
/// itself is held separately with its own seed and ceiling `j`. This lets one
/// party revoke states at two granularities, such as funding versions and
/// balance updates within each.
#[derive(Clone, Debug)]
pub struct NestedRevocableSecret {
    top: RevocableSecret,
    current: RevocableSecret,
}

impl NestedRevocableSecret {
    /// Creates a nested ladder from a top ladder `(top_seed, top_ceiling)`
    /// and the current sub-ladder `(sub_seed, sub_ceiling)`.
    pub fn new(
        top_seed: [u8; 32],
        top_ceiling: u32,
        sub_seed: [u8; 32],
        sub_ceiling: u32,
    ) -> Result<NestedRevocableSecret, CeilingError> {
        Ok(NestedRevocableSecret {
            top: RevocableSecret::new(top_seed, top_ceiling)?,
            current: RevocableSecret::new(sub_seed, sub_ceiling)?,
        })
    }

    /// Returns the top ladder.
    pub fn top(&self) -> &RevocableSecret {
        &self.top
    }

    /// Returns the current sub-ladder, which belongs to top level
    /// `top().ceiling()`.
    pub fn current(&self) -> &RevocableSecret {
        &self.current
    }

    /// Returns the top-level secret at `level`.
    pub fn get(&self, level: u32) -> Result<[u8; 32], LevelError> {
        self.top.get(level)
    }

    /// Returns the sub-ladder seeded by top level `level`, which must be
    /// below the top ceiling.
    pub fn sub_ladder(&self, level: u32) -> Result<RevocableSecret, LevelError> {
        Ok(RevocableSecret::with_max_ceiling(self.top.get(level)?))
    }

    /// Returns the secret at `sub_level` in the sub-ladder of top level
    /// `level`. At `level == top().ceiling()` this reads the current
    /// sub-ladder.
    pub fn get_nested(&self, level: u32, sub_level: u32) -> Result<[u8; 32], LevelError> {
        if level == self.top.ceiling {
            self.current.get(sub_level)
        } else {
            self.sub_ladder(level)?.get(sub_level)
        }
    }
}

impl PartialEq for NestedRevocableSecret {
    /// Equal top ladders, and equal sub-ladders at the lower top ceiling.
    /// The party further ahead re-derives that sub-ladder from its top ladder.
    fn eq(&self, other: &Self) -> bool {
        if self.top != other.top {
            return false;
        }

        use std::cmp::Ordering;
        match self.top.ceiling.cmp(&other.top.ceiling) {
            Ordering::Equal => self.current == other.current,
            Ordering::Less => other
                .sub_ladder(self.top.ceiling)
                .is_ok_and(|ladder| self.current == ladder),
            Ordering::Greater => self
                .sub_ladder(other.top.ceiling)
                .is_ok_and(|ladder| ladder == other.current),
        }
    }
}

impl Eq for NestedRevocableSecret {}

/// The per-channel secrets one party derives from a single channel seed:
/// a [`DeterministicNonce`] ladder seeded with `seed || "det"`, and a
/// balance [`RevocableSecret`] of maximum ceiling seeded with
/// `SHA256(seed || "rec")`.
#[derive(Clone, Debug)]
pub struct ChannelSecrets {
    deterministic_nonce: DeterministicNonce,
    balance_secret: RevocableSecret,
}

impl ChannelSecrets {
    /// Derives the channel secrets from a seed.
    pub fn new(seed: impl AsRef<[u8]>) -> ChannelSecrets {
        let seed = seed.as_ref();

        let mut nonce_seed = Vec::with_capacity(seed.len() + 3);
        nonce_seed.extend_from_slice(seed);
        nonce_seed.extend_from_slice(b"det");

        let balance_seed: [u8; 32] = Sha256::new()
            .chain_update(seed)
            .chain_update(b"rec")
            .finalize()
            .into();

        ChannelSecrets {
            deterministic_nonce: DeterministicNonce::new(nonce_seed),
            balance_secret: RevocableSecret::with_max_ceiling(balance_seed),
        }
    }

    /// Returns the nonce ladder for this channel.
    pub fn deterministic_nonce(&self) -> &DeterministicNonce {
        &self.deterministic_nonce
    }

    /// Returns the balance revocation ladder for this channel.
    pub fn balance_secret(&self) -> &RevocableSecret {
        &self.balance_secret
    }
}
