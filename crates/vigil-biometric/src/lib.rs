//! Biometric vector handling for the Vigil decision core.
//!
//! Face embeddings enter this crate as fixed-length numeric vectors produced
//! by an external capture pipeline. Everything here is about trusting them
//! safely: validation before any comparison, AES-256-GCM sealing at rest,
//! and distance-based matching that fails safe on crypto errors.

pub mod error;
pub mod matcher;
pub mod seal;
pub mod vector;

pub use error::{BiometricError, BiometricResult};
pub use matcher::{FaceMatcher, MatchOutcome, MatchVerdict};
pub use seal::{derive_sealing_key, seal_vector, unseal_vector, SealingKey};
pub use vector::{BiometricVector, EMBEDDING_DIM};
