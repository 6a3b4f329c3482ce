#![forbid(unsafe_code)]

//! XAdES-BES enveloped signatures for Pieczec.
//!
//! [`XadesSigner`] appends a `ds:Signature` to the document element. Its
//! `SignedInfo` references the whole document (enveloped-signature and
//! exclusive C14N transforms) and the `xades:SignedProperties` carried in
//! `ds:Object`. The signing pipeline lives in [`stages`].

pub mod auth;
pub mod clock;
pub mod context;
pub mod ids;
pub mod signer;
pub mod stages;
pub mod template;

pub use auth::{AuthTokenRequest, Nip, SubjectIdentifierType};
pub use clock::{Clock, FixedClock, SystemClock};
pub use context::SignatureContext;
pub use ids::{IdGenerator, SequentialIdGenerator, UuidIdGenerator};
pub use signer::{sign, SigningRequest, XadesSigner};
