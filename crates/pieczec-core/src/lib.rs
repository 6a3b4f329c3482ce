#![forbid(unsafe_code)]

//! Shared building blocks for Pieczec: the error type, algorithm URIs and
//! namespace/element name constants.

pub mod algorithm;
pub mod error;
pub mod ns;

pub use error::{Error, Result};
