#![forbid(unsafe_code)]

//! Key and certificate loading for Pieczec.
//!
//! Private keys decide the signature algorithm, so the key type is settled
//! here: anything other than RSA or EC P-256 is rejected with
//! `Error::UnsupportedKeyType` before signing starts.

pub mod loader;
pub mod x509;

pub use loader::{load_signing_key_der, load_signing_key_file, load_signing_key_pem};
pub use x509::X509Certificate;
