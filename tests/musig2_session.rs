use musig2_ptlc::{
    errors::SessionError, verify_single, ChannelSecrets, CompactSignature, ExtendedKey,
    MuSigAggregate, MuSigBase, OutputTweak, PartialSignature, PubNonce, SessionState, SignerKey,
    SigningSession,
};
use secp::{MaybeScalar, Point, Scalar};

const N_SIGNERS: usize = 3;

/// One session per party. Each party holds its own secret key and only the
/// public keys of the others.
fn party_sessions(seckeys: &[Scalar]) -> Vec<SigningSession> {
    let signer_keys: Vec<SignerKey> = seckeys.iter().copied().map(SignerKey::from).collect();

    (0..seckeys.len())
        .map(|me| {
            let keys = signer_keys.iter().enumerate().map(|(i, key)| {
                if i == me {
                    key.clone()
                } else {
                    key.neuter()
                }
            });
            SigningSession::new(MuSigAggregate::new(keys).unwrap())
        })
        .collect()
}

fn random_seckeys() -> Vec<Scalar> {
    (0..N_SIGNERS)
        .map(|_| Scalar::random(&mut rand::rng()))
        .collect()
}

fn run_protocol(sessions: &mut [SigningSession], channels: &[ChannelSecrets], path: &[u32]) {
    for (me, session) in sessions.iter_mut().enumerate() {
        let secnonce = channels[me].deterministic_nonce().secnonce(path).unwrap();
        session.set_secret_nonce(me, secnonce).unwrap();
    }

    let pubnonces: Vec<PubNonce> = sessions
        .iter()
        .enumerate()
        .map(|(me, session)| session.public_nonce(me).unwrap())
        .collect();
    for (me, session) in sessions.iter_mut().enumerate() {
        for (i, &pubnonce) in pubnonces.iter().enumerate() {
            if i != me {
                session.set_nonce(i, pubnonce).unwrap();
            }
        }
        assert_eq!(session.state(), SessionState::NoncesComplete);
    }

    let partials: Vec<PartialSignature> = sessions
        .iter_mut()
        .enumerate()
        .map(|(me, session)| session.sign_partial(me).unwrap())
        .collect();
    for (me, session) in sessions.iter_mut().enumerate() {
        for (i, &partial) in partials.iter().enumerate() {
            if i != me {
                session.set_partial(i, partial).unwrap();
            }
        }
        assert!(session.is_complete());
    }
}

fn channel_secrets() -> Vec<ChannelSecrets> {
    (0..N_SIGNERS)
        .map(|i| ChannelSecrets::new(format!("channel seed {}", i)))
        .collect()
}

#[test]
fn three_party_signing() {
    let seckeys = random_seckeys();
    let channels = channel_secrets();
    let mut sessions = party_sessions(&seckeys);

    let message = [0x42; 32];
    for session in sessions.iter_mut() {
        session.set_message(message);
    }
    run_protocol(&mut sessions, &channels, &[0, 1]);

    let signatures: Vec<CompactSignature> = sessions
        .iter()
        .map(|session| session.signature().unwrap())
        .collect();
    assert!(signatures.windows(2).all(|w| w[0] == w[1]));

    let aggregated_pubkey: Point = sessions[0].musig().aggregated_pubkey();
    assert!(aggregated_pubkey.has_even_y());
    verify_single(aggregated_pubkey, signatures[0], message).unwrap();
}

#[test]
fn three_party_taproot_signing() {
    let seckeys = random_seckeys();
    let channels = channel_secrets();
    let mut sessions = party_sessions(&seckeys);

    let internal_key: Point = sessions[0].musig().aggregated_pubkey();
    let tweak = OutputTweak::taproot(internal_key, Some(&[0x77; 32])).unwrap();

    let message = [0x99; 32];
    for session in sessions.iter_mut() {
        session.set_message(message);
        session.set_tweak(Some(tweak)).unwrap();
    }
    run_protocol(&mut sessions, &channels, &[3]);

    let signature: CompactSignature = sessions[2].signature().unwrap();
    let output_key: Point = sessions[2].output_pubkey();
    assert_eq!(output_key, tweak.output_key(internal_key).unwrap().output_key);
    verify_single(output_key, signature, message).unwrap();

    // The signature is not valid for the untweaked key.
    assert!(verify_single(internal_key, signature, message).is_err());
}

#[test]
fn three_party_negated_tweak_signing() {
    for round in 0..8u32 {
        let seckeys = random_seckeys();
        let channels = channel_secrets();
        let mut sessions = party_sessions(&seckeys);

        let internal_key: Point = sessions[0].musig().aggregated_pubkey();
        let tweak = OutputTweak::new(true, Scalar::random(&mut rand::rng()));

        let message = [0x5c; 32];
        for session in sessions.iter_mut() {
            session.set_message(message);
            session.set_tweak(Some(tweak)).unwrap();
        }

        // Every party verifies the partials of the other two against
        // negated contribution points.
        run_protocol(&mut sessions, &channels, &[11, round]);

        let output_key: Point = sessions[1].output_pubkey();
        assert_eq!(output_key, tweak.output_key(internal_key).unwrap().output_key);
        for session in sessions.iter() {
            let signature: CompactSignature = session.signature().unwrap();
            verify_single(output_key, signature, message).unwrap();
        }
    }
}

#[test]
fn three_party_signing_with_derived_keys() {
    let masters: Vec<ExtendedKey> = (0..N_SIGNERS as u8)
        .map(|i| ExtendedKey::from_seed([i + 1; 32]).unwrap())
        .collect();
    let channels = channel_secrets();

    // Each party holds its own master secret and the others' public masters.
    let bases: Vec<MuSigBase> = (0..N_SIGNERS)
        .map(|me| {
            let keys = masters.iter().enumerate().map(|(i, master)| {
                if i == me {
                    master.clone()
                } else {
                    master.neuter()
                }
            });
            MuSigBase::new(keys).unwrap()
        })
        .collect();

    for balance_version in [0, 1, 2] {
        let path = [1, balance_version];
        let mut sessions: Vec<SigningSession> = bases
            .iter()
            .map(|base| SigningSession::new(base.derive(&path).unwrap().0))
            .collect();

        let message = [0x10 + balance_version as u8; 32];
        for session in sessions.iter_mut() {
            session.set_message(message);
        }
        run_protocol(&mut sessions, &channels, &path);

        let aggregated_pubkey: Point = sessions[0].musig().aggregated_pubkey();
        for session in sessions.iter() {
            assert_eq!(session.musig().aggregated_pubkey::<Point>(), aggregated_pubkey);
            let signature: CompactSignature = session.signature().unwrap();
            verify_single(aggregated_pubkey, signature, message).unwrap();
        }
    }
}

#[test]
fn forged_partial_signature_is_rejected() {
    let seckeys = random_seckeys();
    let channels = channel_secrets();
    let mut sessions = party_sessions(&seckeys);
    for session in sessions.iter_mut() {
        session.set_message([0x01; 32]);
    }
    run_protocol(&mut sessions, &channels, &[7]);

    let honest = sessions[0].partial_signature(1).unwrap();
    let forged = honest + MaybeScalar::one();
    assert_eq!(
        sessions[0].set_partial(1, forged),
        Err(SessionError::InvalidPartial(1))
    );

    // The honest partial signature is still in place.
    assert_eq!(sessions[0].partial_signature(1), Some(honest));
    sessions[0].signature::<CompactSignature>().unwrap();
}

#[test]
fn cancelling_nonces_are_degenerate() {
    let seckeys = random_seckeys();
    let channels = channel_secrets();
    let mut session = party_sessions(&seckeys).remove(0);
    session.set_message([0x02; 32]);

    let secnonce = channels[0].deterministic_nonce().secnonce(&[1]).unwrap();
    let pubnonce = secnonce.public_nonce();
    session.set_secret_nonce(0, secnonce).unwrap();

    // Signer 2 cancels out the nonces of signers 0 and 1.
    let other = channels[1].deterministic_nonce().secnonce(&[1]).unwrap();
    let other = other.public_nonce();
    session.set_nonce(1, other).unwrap();
    let cancelling = PubNonce::new(
        -(pubnonce.R1 + other.R1).not_inf().unwrap(),
        -(pubnonce.R2 + other.R2).not_inf().unwrap(),
    );
    session.set_nonce(2, cancelling).unwrap();

    assert_eq!(session.finalize_nonces(), Err(SessionError::DegenerateNonce));
    assert_eq!(
        session.sign_partial::<PartialSignature>(0),
        Err(SessionError::DegenerateNonce)
    );
}

#[test]
fn signing_waits_for_every_nonce() {
    let seckeys = random_seckeys();
    let channels = channel_secrets();
    let mut session = party_sessions(&seckeys).remove(1);
    session.set_message([0x03; 32]);

    let secnonce = channels[1].deterministic_nonce().secnonce(&[9]).unwrap();
    session.set_secret_nonce(1, secnonce).unwrap();
    assert_eq!(session.state(), SessionState::NoncesPartial);
    assert_eq!(session.holdouts(), vec![0, 2]);

    assert_eq!(
        session.sign_partial::<PartialSignature>(1),
        Err(SessionError::MissingNonces(vec![0, 2]))
    );
    assert_eq!(
        session.sign_partial::<PartialSignature>(0),
        Err(SessionError::VerifyOnlySigner(0))
    );
}
