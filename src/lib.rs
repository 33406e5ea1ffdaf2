#![doc = include_str!("../README.md")]
#![allow(non_snake_case)]
#![warn(missing_docs)]

#[cfg(all(not(feature = "secp256k1"), not(feature = "k256")))]
compile_error!("At least one of the `secp256k1` or `k256` features must be enabled.");

#[macro_use]
mod binary_encoding;

mod bip340;
mod derivation;
mod key_agg;
mod nonces;
mod session;
mod signature;
mod signing;
mod tweak;

pub mod errors;
pub mod revocation;
pub mod tagged_hashes;

pub use binary_encoding::*;
pub use bip340::*;
pub use derivation::*;
pub use key_agg::*;
pub use nonces::*;
pub use revocation::{
    ChannelSecrets, NestedRevocableSecret, RevocableSecret, MAX_CEILING,
};
pub use session::*;
pub use signature::*;
pub use signing::*;
pub use tweak::*;

/// Re-export of the inner types used to represent curve points and scalars.
pub use secp;

#[cfg(feature = "secp256k1")]
pub use secp256k1;

#[cfg(feature = "k256")]
pub use k256;
