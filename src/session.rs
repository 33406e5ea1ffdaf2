use crate::errors::{SessionError, SignerIndexError, TweakError};
use crate::{
    compute_aggregate_nonce, compute_binding_coefficient, sign_partial_schnorr,
    verify_partial_schnorr, verify_single, CompactSignature, MuSigAggregate, OutputTweak,
    PartialSignature, PubNonce, SecNonce, TweakedKey,
};

use secp::{MaybePoint, MaybeScalar, Point};
use subtle::Choice;

/// The progress of a [`SigningSession`], derived from which of its slots are
/// filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No public nonces have been received.
    Empty,

    /// Some, but not all, signers' public nonces have been received.
    NoncesPartial,

    /// Every signer's public nonce is known, and no partial signatures yet.
    NoncesComplete,

    /// Some, but not all, partial signatures have been received.
    PartialsPartial,

    /// Every partial signature is in. The final signature can be computed.
    Complete,
}

/// The binding coefficient and final nonce, cached once all public nonces and
/// the message are known.
#[derive(Debug, Clone, Copy)]
struct FinalNonce {
    binding_coeff: MaybeScalar,
    nonce: Point,
}

/// Tracks one MuSig2 signing attempt for a fixed [`MuSigAggregate`].
///
/// Unlike a strictly linear protocol runner, a session can be edited at any
/// point: setting the message, the output tweak, or any nonce discards the
/// cached binding coefficient, aggregate nonce and every partial signature
/// collected so far, since none of them would be valid any more. The current
/// phase is always available from [`state`][Self::state].
///
/// A session may hold secret nonces for several local signers at once,
/// which is convenient for tests and for a party controlling more than one
/// key in the group. Each secret nonce is consumed by
/// [`sign_partial`][Self::sign_partial] and can never sign twice.
///
/// `SigningSession` implements neither `Clone` nor `Debug`, as it may hold
/// secret nonces.
pub struct SigningSession {
    musig: MuSigAggregate,
    message: Option<[u8; 32]>,
    tweak: Option<OutputTweak>,
    output: TweakedKey,
    secnonces: Vec<Option<SecNonce>>,
    pubnonces: Vec<Option<PubNonce>>,
    final_nonce: Option<FinalNonce>,
    partials: Vec<Option<PartialSignature>>,
}

fn open_slots<T>(slots: &[Option<T>]) -> Vec<usize> {
    slots
        .iter()
        .enumerate()
        .filter(|(_, slot)| slot.is_none())
        .map(|(i, _)| i)
        .collect()
}

impl SigningSession {
    /// Starts an empty session for the given aggregate.
    pub fn new(musig: MuSigAggregate) -> SigningSession {
        let n_signers = musig.n_signers();
        let output = TweakedKey {
            output_key: musig.aggregated_pubkey(),
            parity_flipped: false,
        };

        let mut secnonces = Vec::with_capacity(n_signers);
        secnonces.resize_with(n_signers, || None);

        SigningSession {
            musig,
            message: None,
            tweak: None,
            output,
            secnonces,
            pubnonces: vec![None; n_signers],
            final_nonce: None,
            partials: vec![None; n_signers],
        }
    }

    /// Returns the aggregate this session signs for.
    pub fn musig(&self) -> &MuSigAggregate {
        &self.musig
    }

    /// Returns the 32-byte message, if one was set.
    pub fn message(&self) -> Option<&[u8; 32]> {
        self.message.as_ref()
    }

    /// Returns the output tweak, if one was set.
    pub fn tweak(&self) -> Option<&OutputTweak> {
        self.tweak.as_ref()
    }

    /// Returns the key the final signature will verify against: the
    /// aggregated key, or the tweaked output key if a tweak is set.
    pub fn output_pubkey<T: From<Point>>(&self) -> T {
        T::from(self.output.output_key)
    }

    /// Returns the public nonce on file for a signer.
    pub fn public_nonce(&self, signer_index: usize) -> Option<PubNonce> {
        self.pubnonces.get(signer_index).copied().flatten()
    }

    /// Returns the partial signature on file for a signer.
    pub fn partial_signature(&self, signer_index: usize) -> Option<PartialSignature> {
        self.partials.get(signer_index).copied().flatten()
    }

    /// Returns the cached binding coefficient `b`, once computed.
    pub fn binding_coefficient(&self) -> Option<MaybeScalar> {
        self.final_nonce.map(|f| f.binding_coeff)
    }

    /// Returns the cached aggregate nonce `R`, once computed. It may have
    /// either parity; only its X coordinate appears in the signature.
    pub fn aggregate_nonce(&self) -> Option<Point> {
        self.final_nonce.map(|f| f.nonce)
    }

    /// Returns the current phase of the session.
    pub fn state(&self) -> SessionState {
        let missing_nonces = self.pubnonces.iter().filter(|n| n.is_none()).count();
        if missing_nonces == self.pubnonces.len() {
            return SessionState::Empty;
        } else if missing_nonces > 0 {
            return SessionState::NoncesPartial;
        }

        let received_partials = self.partials.iter().filter(|s| s.is_some()).count();
        if received_partials == 0 {
            SessionState::NoncesComplete
        } else if received_partials < self.partials.len() {
            SessionState::PartialsPartial
        } else {
            SessionState::Complete
        }
    }

    /// Returns the indexes of signers we are waiting on: those missing a
    /// public nonce while nonces are still being collected, and after that,
    /// those missing a partial signature.
    pub fn holdouts(&self) -> Vec<usize> {
        let nonce_holdouts = open_slots(&self.pubnonces);
        if !nonce_holdouts.is_empty() {
            return nonce_holdouts;
        }
        open_slots(&self.partials)
    }

    /// Returns true once every partial signature has been received.
    pub fn is_complete(&self) -> bool {
        self.state() == SessionState::Complete
    }

    /// Sets the message to sign.
    pub fn set_message(&mut self, message: [u8; 32]) {
        self.message = Some(message);
        self.reset("message changed");
    }

    /// Sets or clears the output tweak. On error the session is left
    /// untouched.
    pub fn set_tweak(&mut self, tweak: Option<OutputTweak>) -> Result<(), TweakError> {
        self.output = match tweak {
            Some(tweak) => tweak.output_key(self.musig.aggregated_pubkey::<Point>())?,
            None => TweakedKey {
                output_key: self.musig.aggregated_pubkey(),
                parity_flipped: false,
            },
        };
        self.tweak = tweak;
        self.reset("tweak changed");
        Ok(())
    }

    /// Stores a secret nonce for a local signer, and records its public nonce.
    pub fn set_secret_nonce(
        &mut self,
        signer_index: usize,
        secnonce: SecNonce,
    ) -> Result<(), SignerIndexError> {
        self.check_index(signer_index)?;
        self.pubnonces[signer_index] = Some(secnonce.public_nonce());
        self.secnonces[signer_index] = Some(secnonce);
        log::debug!("stored secret nonce for signer {}", signer_index);
        self.reset("nonce changed");
        Ok(())
    }

    /// Records a signer's public nonce.
    ///
    /// A secret nonce we hold for the same signer is discarded unless its
    /// public nonce matches, since it could no longer produce a valid
    /// partial signature.
    pub fn set_nonce(
        &mut self,
        signer_index: usize,
        pubnonce: PubNonce,
    ) -> Result<(), SignerIndexError> {
        self.check_index(signer_index)?;

        let mismatched = self.secnonces[signer_index]
            .as_ref()
            .is_some_and(|secnonce| secnonce.public_nonce() != pubnonce);
        if mismatched {
            log::debug!("discarding stale secret nonce for signer {}", signer_index);
            self.secnonces[signer_index] = None;
        }

        self.pubnonces[signer_index] = Some(pubnonce);
        log::debug!("received public nonce from signer {}", signer_index);
        self.reset("nonce changed");
        Ok(())
    }

    /// Computes and caches the binding coefficient `b` and aggregate nonce
    /// `R`. Requires the message and every public nonce.
    ///
    /// Signing and receiving partial signatures call this implicitly, so
    /// callers only need it to inspect `b` or `R` early.
    pub fn finalize_nonces(&mut self) -> Result<(), SessionError> {
        self.final_nonce()?;
        Ok(())
    }

    fn final_nonce(&mut self) -> Result<FinalNonce, SessionError> {
        if let Some(final_nonce) = self.final_nonce {
            return Ok(final_nonce);
        }

        let message = self.message.ok_or(SessionError::MissingMessage)?;
        let pubnonces: Vec<PubNonce> = self
            .pubnonces
            .iter()
            .copied()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| SessionError::MissingNonces(open_slots(&self.pubnonces)))?;

        let binding_coeff: MaybeScalar =
            compute_binding_coefficient(self.musig.aggregated_pubkey::<Point>(), &pubnonces, message);
        let nonce = compute_aggregate_nonce(&pubnonces, binding_coeff)?;

        log::debug!("finalized aggregate nonce {}", nonce);
        let final_nonce = FinalNonce {
            binding_coeff,
            nonce,
        };
        self.final_nonce = Some(final_nonce);
        Ok(final_nonce)
    }

    /// Creates the partial signature of a local signer, and records it.
    ///
    /// The signer's secret nonce is consumed whether or not signing
    /// succeeds, so a second call for the same signer fails with
    /// [`SessionError::MissingSecretNonce`] until a fresh nonce is set.
    pub fn sign_partial<T: From<PartialSignature>>(
        &mut self,
        signer_index: usize,
    ) -> Result<T, SessionError> {
        self.check_index(signer_index)?;
        if !self.musig.signer_keys()[signer_index].can_sign() {
            return Err(SessionError::VerifyOnlySigner(signer_index));
        }

        let FinalNonce {
            binding_coeff,
            nonce,
        } = self.final_nonce()?;
        let message = self.message.ok_or(SessionError::MissingMessage)?;

        let secnonce = self.secnonces[signer_index]
            .take()
            .ok_or(SessionError::MissingSecretNonce(signer_index))?;

        let negate_key = Choice::from(self.tweak.is_some_and(|t| t.negate) as u8);
        let partial_key = self
            .musig
            .contribution_key(signer_index)
            .ok_or(SessionError::VerifyOnlySigner(signer_index))?
            .not_zero()?
            .negate_if(negate_key);

        let partial_nonce = (secnonce.r1 + binding_coeff * secnonce.r2)
            .not_zero()?
            .negate_if(self.nonce_parity(nonce));

        let partial_signature: PartialSignature = sign_partial_schnorr(
            &nonce.serialize_xonly(),
            &self.output.xonly(),
            message,
            partial_key,
            Some(partial_nonce),
        )?;

        self.verify_partial(signer_index, partial_signature)?;
        self.partials[signer_index] = Some(partial_signature);
        log::debug!("created partial signature for signer {}", signer_index);

        Ok(T::from(partial_signature))
    }

    /// Verifies and records a partial signature received from a signer.
    ///
    /// An invalid partial signature is rejected and the session is left as
    /// it was.
    pub fn set_partial(
        &mut self,
        signer_index: usize,
        partial_signature: impl Into<PartialSignature>,
    ) -> Result<(), SessionError> {
        self.check_index(signer_index)?;
        let partial_signature: PartialSignature = partial_signature.into();

        if let Err(e) = self.verify_partial(signer_index, partial_signature) {
            log::warn!("rejected partial signature from signer {}", signer_index);
            return Err(e);
        }

        self.partials[signer_index] = Some(partial_signature);
        log::debug!("accepted partial signature from signer {}", signer_index);
        Ok(())
    }

    /// Checks `s_i·G == ±(R1_i + b·R2_i) + e·(±mul_i·X_i)`, applying the same
    /// sign corrections a signer applies to their secret values.
    fn verify_partial(
        &mut self,
        signer_index: usize,
        partial_signature: PartialSignature,
    ) -> Result<(), SessionError> {
        let FinalNonce {
            binding_coeff,
            nonce,
        } = self.final_nonce()?;
        let message = self.message.ok_or(SessionError::MissingMessage)?;

        let pubnonce = self.pubnonces[signer_index]
            .ok_or_else(|| SessionError::MissingNonces(vec![signer_index]))?;
        let effective_nonce = pubnonce
            .effective_nonce(binding_coeff)
            .negate_if(self.nonce_parity(nonce));

        let mut contribution_point: MaybePoint = self.musig.contribution_points[signer_index];
        if self.tweak.is_some_and(|t| t.negate) {
            contribution_point = -contribution_point;
        }

        verify_partial_schnorr(
            &nonce.serialize_xonly(),
            &self.output.xonly(),
            message,
            contribution_point,
            effective_nonce,
            partial_signature,
        )
        .map_err(|_| SessionError::InvalidPartial(signer_index))
    }

    /// Combines every partial signature into the final BIP340 signature on
    /// the output key, and verifies it before returning.
    pub fn signature<T: From<CompactSignature>>(&self) -> Result<T, SessionError> {
        let message = self.message.ok_or(SessionError::MissingMessage)?;
        let final_nonce = match self.final_nonce {
            Some(final_nonce) => final_nonce,
            None => {
                let nonce_holdouts = open_slots(&self.pubnonces);
                if !nonce_holdouts.is_empty() {
                    return Err(SessionError::MissingNonces(nonce_holdouts));
                }
                return Err(SessionError::MissingPartials(open_slots(&self.partials)));
            }
        };

        let partials: Vec<PartialSignature> = self
            .partials
            .iter()
            .copied()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| SessionError::MissingPartials(open_slots(&self.partials)))?;

        let nonce_xonly = final_nonce.nonce.serialize_xonly();
        let mut s: MaybeScalar = partials.into_iter().sum();

        if let Some(tweak) = self.tweak {
            let tweak_term: PartialSignature = sign_partial_schnorr(
                &nonce_xonly,
                &self.output.xonly(),
                message,
                tweak.tweak,
                None,
            )?;
            s = (s + tweak_term).negate_if(Choice::from(self.output.parity_flipped as u8));
        }

        let signature = CompactSignature { rx: nonce_xonly, s };
        verify_single(self.output.output_key, signature, message)?;

        log::debug!("combined final signature {}", signature);
        Ok(T::from(signature))
    }

    /// Partial nonces are negated when exactly one of the aggregate nonce `R`
    /// or the raw tweaked key `Q` has odd Y.
    fn nonce_parity(&self, nonce: Point) -> Choice {
        nonce.parity() ^ Choice::from(self.output.parity_flipped as u8)
    }

    fn check_index(&self, signer_index: usize) -> Result<(), SignerIndexError> {
        if signer_index >= self.musig.n_signers() {
            return Err(SignerIndexError::new(signer_index, self.musig.n_signers()));
        }
        Ok(())
    }

    fn reset(&mut self, reason: &str) {
        if self.final_nonce.is_some() || self.partials.iter().any(Option::is_some) {
            log::trace!("resetting signing state: {}", reason);
        }
        self.final_nonce = None;
        self.partials.iter_mut().for_each(|slot| *slot = None);
    }
}
