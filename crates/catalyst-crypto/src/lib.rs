//! Cryptographic primitives for the Catalyst content engine.
//!
//! Provides domain-separated BLAKE3 content addressing, Ed25519 signing and
//! the signature verification seam used by the deployment pipeline, and a
//! binary Merkle tree for history snapshots.
//!
//! All crypto operations wrap established libraries. No custom cryptography.

pub mod hasher;
pub mod hashing;
pub mod merkle;
pub mod signer;

pub use hasher::{ContentHasher, HasherError};
pub use hashing::{hash_all, hash_file};
pub use merkle::MerkleTree;
pub use signer::{
    entity_message, Ed25519Verifier, Signature, SignatureError, SignatureVerifier, SigningKey,
    VerifyingKey,
};
