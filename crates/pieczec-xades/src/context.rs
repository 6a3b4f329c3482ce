#![forbid(unsafe_code)]

//! Per-signature identifier context.

use crate::ids::IdGenerator;
use pieczec_core::Error;
use std::collections::HashSet;

/// Attempts per identifier before giving up on a generator that keeps
/// returning values already in use.
const MAX_ID_ATTEMPTS: usize = 16;

/// The nine `Id` values of one signature. All distinct, and none equal to an
/// `Id` already present in the signed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureContext {
    pub signature_id: String,
    pub signed_info_id: String,
    pub signature_value_id: String,
    pub key_info_id: String,
    pub reference_doc_id: String,
    pub reference_sp_id: String,
    pub object_id: String,
    pub qualifying_properties_id: String,
    pub signed_properties_id: String,
}

impl SignatureContext {
    /// Draw nine fresh identifiers, skipping any in `taken`.
    pub fn generate(generator: &dyn IdGenerator, taken: &HashSet<String>) -> Result<Self, Error> {
        let mut used = taken.clone();
        let mut next = || -> Result<String, Error> {
            for _ in 0..MAX_ID_ATTEMPTS {
                let id = generator.next_id();
                if used.insert(id.clone()) {
                    return Ok(id);
                }
                tracing::debug!(id = %id, "generated id already in use, drawing another");
            }
            Err(Error::Other(
                "identifier generator keeps returning identifiers already in use".into(),
            ))
        };

        Ok(Self {
            signature_id: next()?,
            signed_info_id: next()?,
            signature_value_id: next()?,
            key_info_id: next()?,
            reference_doc_id: next()?,
            reference_sp_id: next()?,
            object_id: next()?,
            qualifying_properties_id: next()?,
            signed_properties_id: next()?,
        })
    }

    /// All identifiers in document order of their elements.
    pub fn all(&self) -> [&str; 9] {
        [
            self.signature_id.as_str(),
            self.signed_info_id.as_str(),
            self.reference_doc_id.as_str(),
            self.reference_sp_id.as_str(),
            self.signature_value_id.as_str(),
            self.key_info_id.as_str(),
            self.object_id.as_str(),
            self.qualifying_properties_id.as_str(),
            self.signed_properties_id.as_str(),
        ]
    }
}
