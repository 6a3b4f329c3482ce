#![forbid(unsafe_code)]

//! The signing pipeline as a chain of stage types.
//!
//! ```text
//! Skeleton -> DocumentDigested -> PropertiesBuilt -> PropertiesDigested
//!          -> SignedInfoSigned -> signed document text
//! ```
//!
//! Each transition consumes the previous stage, so a stage cannot be skipped
//! or repeated. Every stage re-splices the current [`SignatureTree`] into the
//! untouched input text and works on a fresh parse of the result, which keeps
//! canonicalization in the exact namespace context the verifier will see.

use crate::clock::{format_signing_time, Clock};
use crate::context::SignatureContext;
use crate::ids::IdGenerator;
use crate::template::{SignatureTree, SignedPropertiesValues};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pieczec_c14n::C14nMode;
use pieczec_core::Error;
use pieczec_crypto::{digest, SigningKey};
use pieczec_keys::X509Certificate;
use pieczec_xml::{Envelope, NodeSet, XmlDocument};

/// Splice the rendered tree into the input document.
fn splice(envelope: &Envelope, tree: &SignatureTree) -> Result<String, Error> {
    Ok(envelope.wrap(&tree.render()?))
}

/// Find the element with `Id="<id>"` in a spliced document.
fn require_by_id<'a, 'input>(
    doc: &'a roxmltree::Document<'input>,
    id: &str,
    what: &str,
) -> Result<roxmltree::Node<'a, 'input>, Error> {
    XmlDocument::find_by_id(doc, id).ok_or_else(|| {
        Error::CanonicalizationFailure(format!("{what} with Id=\"{id}\" not found"))
    })
}

/// The input document with an empty signature appended to its root element.
#[derive(Debug)]
pub struct Skeleton {
    envelope: Envelope,
    tree: SignatureTree,
}

impl Skeleton {
    /// Parse `document`, draw fresh identifiers and lay out the empty
    /// signature for `key` and `certificate`.
    pub fn build(
        document: &str,
        ids: &dyn IdGenerator,
        key: &SigningKey,
        certificate: &X509Certificate,
    ) -> Result<Self, Error> {
        let input = XmlDocument::parse(document.to_owned())?;
        let taken = XmlDocument::id_values(&input.parse_doc()?);
        let ctx = SignatureContext::generate(ids, &taken)?;
        let envelope = input.envelope()?;
        tracing::debug!(
            signature_id = %ctx.signature_id,
            signed_properties_id = %ctx.signed_properties_id,
            algorithm = key.algorithm_uri(),
            "built signature skeleton"
        );
        let tree = SignatureTree::new(ctx, key.algorithm_uri(), certificate.to_base64());
        Ok(Self { envelope, tree })
    }

    pub fn context(&self) -> &SignatureContext {
        self.tree.context()
    }

    /// The document text at this stage.
    pub fn document(&self) -> Result<String, Error> {
        splice(&self.envelope, &self.tree)
    }

    /// Digest the whole document minus the signature subtree, exclusive C14N.
    pub fn compute_document_digest(self) -> Result<DocumentDigested, Error> {
        let text = self.document()?;
        let doc = pieczec_xml::parse(&text)?;
        let signature = require_by_id(&doc, &self.context().signature_id, "Signature")?;

        let mut node_set = NodeSet::all_without_comments(&doc);
        node_set.remove_subtree(signature);
        let canonical = pieczec_c14n::canonicalize_doc(&doc, C14nMode::Exclusive, Some(&node_set))?;
        let value = digest::sha256_base64(&canonical);
        tracing::debug!(
            reference = %self.context().reference_doc_id,
            canonical_bytes = canonical.len(),
            digest = %value,
            "computed document digest"
        );

        Ok(DocumentDigested {
            envelope: self.envelope,
            tree: self.tree.with_document_digest(value),
        })
    }
}

/// The document reference carries its digest.
#[derive(Debug)]
pub struct DocumentDigested {
    envelope: Envelope,
    tree: SignatureTree,
}

impl DocumentDigested {
    pub fn context(&self) -> &SignatureContext {
        self.tree.context()
    }

    /// Fill `xades:SignedSignatureProperties`. The clock is read exactly once.
    pub fn build_signed_properties(
        self,
        certificate: &X509Certificate,
        clock: &dyn Clock,
    ) -> Result<PropertiesBuilt, Error> {
        let signing_time = format_signing_time(&clock.now());
        tracing::debug!(
            signing_time = %signing_time,
            issuer = certificate.issuer_name(),
            serial = certificate.serial_number(),
            "built signed properties"
        );
        let values = SignedPropertiesValues {
            signing_time,
            certificate_digest: certificate.digest_base64(),
            issuer_name: certificate.issuer_name().to_owned(),
            serial_number: certificate.serial_number().to_owned(),
        };
        Ok(PropertiesBuilt {
            envelope: self.envelope,
            tree: self.tree.with_signed_properties(values),
        })
    }
}

/// `xades:SignedProperties` is complete.
#[derive(Debug)]
pub struct PropertiesBuilt {
    envelope: Envelope,
    tree: SignatureTree,
}

impl PropertiesBuilt {
    pub fn context(&self) -> &SignatureContext {
        self.tree.context()
    }

    /// Digest `xades:SignedProperties` in place, exclusive C14N.
    pub fn compute_signed_properties_digest(self) -> Result<PropertiesDigested, Error> {
        let text = splice(&self.envelope, &self.tree)?;
        let doc = pieczec_xml::parse(&text)?;
        let signed_properties =
            require_by_id(&doc, &self.context().signed_properties_id, "SignedProperties")?;

        let canonical = pieczec_c14n::canonicalize_subtree(signed_properties, C14nMode::Exclusive)?;
        let value = digest::sha256_base64(&canonical);
        tracing::debug!(
            reference = %self.context().reference_sp_id,
            canonical_bytes = canonical.len(),
            digest = %value,
            "computed signed properties digest"
        );

        Ok(PropertiesDigested {
            envelope: self.envelope,
            tree: self.tree.with_signed_properties_digest(value),
        })
    }
}

/// Both references carry their digests; `ds:SignedInfo` is final.
#[derive(Debug)]
pub struct PropertiesDigested {
    envelope: Envelope,
    tree: SignatureTree,
}

impl PropertiesDigested {
    pub fn context(&self) -> &SignatureContext {
        self.tree.context()
    }

    /// Canonicalize `ds:SignedInfo` in place (inclusive C14N) and sign it.
    pub fn sign_signed_info(self, key: &SigningKey) -> Result<SignedInfoSigned, Error> {
        let text = splice(&self.envelope, &self.tree)?;
        let doc = pieczec_xml::parse(&text)?;
        let signed_info = require_by_id(&doc, &self.context().signed_info_id, "SignedInfo")?;

        let canonical = pieczec_c14n::canonicalize_subtree(signed_info, C14nMode::Inclusive)?;
        let signature = key.sign(&canonical)?;
        tracing::debug!(
            canonical_bytes = canonical.len(),
            signature_bytes = signature.len(),
            "signed SignedInfo"
        );

        Ok(SignedInfoSigned {
            envelope: self.envelope,
            tree: self.tree,
            signature,
        })
    }
}

/// The signature value is computed but not yet in the tree.
#[derive(Debug)]
pub struct SignedInfoSigned {
    envelope: Envelope,
    tree: SignatureTree,
    signature: Vec<u8>,
}

impl SignedInfoSigned {
    pub fn context(&self) -> &SignatureContext {
        self.tree.context()
    }

    /// Raw signature bytes as they will appear base64-encoded.
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Write the base64 signature value and return the signed document.
    pub fn embed_signature_value(self) -> Result<String, Error> {
        let value = STANDARD.encode(&self.signature);
        let tree = self.tree.with_signature_value(value);
        splice(&self.envelope, &tree)
    }
}
