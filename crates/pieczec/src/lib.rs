#![forbid(unsafe_code)]

//! Pieczec: XAdES-BES enveloped signatures for KSeF documents.
//!
//! ```no_run
//! use pieczec::keys::{load_signing_key_file, X509Certificate};
//! use pieczec::xades::{SigningRequest, XadesSigner};
//!
//! # fn main() -> Result<(), pieczec::core::Error> {
//! let key = load_signing_key_file("signer-key.pem".as_ref())?;
//! let certificate = X509Certificate::from_file("signer-cert.pem".as_ref())?;
//! let signed = XadesSigner::new().sign(&SigningRequest {
//!     document: "<Faktura/>",
//!     certificate: &certificate,
//!     key: &key,
//! })?;
//! # let _ = signed;
//! # Ok(())
//! # }
//! ```

pub use pieczec_core as core;
pub use pieczec_xml as xml;
pub use pieczec_c14n as c14n;
pub use pieczec_crypto as crypto;
pub use pieczec_keys as keys;
pub use pieczec_xades as xades;
