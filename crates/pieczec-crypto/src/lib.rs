#![forbid(unsafe_code)]

//! Cryptographic primitives for Pieczec: SHA-256 digests, RSA and ECDSA
//! P-256 signing, and the DER ⇄ raw `r‖s` ECDSA signature encodings.

pub mod digest;
pub mod ecdsa;
pub mod sign;

pub use sign::{PrimitiveSignature, SigningKey};
