#![forbid(unsafe_code)]

//! The `ds:Signature` subtree as an immutable value.
//!
//! Each pipeline stage produces a new [`SignatureTree`] with one more value
//! filled in and re-renders it. Values not yet known render as empty
//! elements, so every stage sees the same element layout and the same
//! identifiers.

use crate::context::SignatureContext;
use pieczec_core::{algorithm, ns, Error};
use pieczec_xml::XmlWriter;

/// Values of `xades:SignedSignatureProperties`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPropertiesValues {
    /// `YYYY-MM-DDThh:mm:ssZ`
    pub signing_time: String,
    /// Base64 SHA-256 of the certificate DER.
    pub certificate_digest: String,
    pub issuer_name: String,
    /// Decimal serial number.
    pub serial_number: String,
}

/// The signature subtree, possibly incomplete.
#[derive(Debug, Clone)]
pub struct SignatureTree {
    ctx: SignatureContext,
    signature_method: &'static str,
    certificate: String,
    document_digest: Option<String>,
    signed_properties: Option<SignedPropertiesValues>,
    signed_properties_digest: Option<String>,
    signature_value: Option<String>,
}

fn ds(local: &str) -> String {
    format!("{}:{local}", ns::DSIG_PREFIX)
}

fn xades(local: &str) -> String {
    format!("{}:{local}", ns::XADES_PREFIX)
}

impl SignatureTree {
    /// A skeleton with every digest and the signature value empty.
    pub fn new(ctx: SignatureContext, signature_method: &'static str, certificate: String) -> Self {
        Self {
            ctx,
            signature_method,
            certificate,
            document_digest: None,
            signed_properties: None,
            signed_properties_digest: None,
            signature_value: None,
        }
    }

    pub fn context(&self) -> &SignatureContext {
        &self.ctx
    }

    pub fn with_document_digest(self, digest: String) -> Self {
        Self {
            document_digest: Some(digest),
            ..self
        }
    }

    pub fn with_signed_properties(self, values: SignedPropertiesValues) -> Self {
        Self {
            signed_properties: Some(values),
            ..self
        }
    }

    pub fn with_signed_properties_digest(self, digest: String) -> Self {
        Self {
            signed_properties_digest: Some(digest),
            ..self
        }
    }

    pub fn with_signature_value(self, value: String) -> Self {
        Self {
            signature_value: Some(value),
            ..self
        }
    }

    /// Render the subtree as compact markup.
    ///
    /// `xmlns:ds` is declared on `ds:Signature` and `xmlns:xades` on
    /// `xades:QualifyingProperties`.
    pub fn render(&self) -> Result<String, Error> {
        let mut w = XmlWriter::new();
        let ctx = &self.ctx;
        let signature = ds(ns::node::SIGNATURE);
        let xmlns_ds = format!("xmlns:{}", ns::DSIG_PREFIX);

        w.start_element(
            &signature,
            &[(xmlns_ds.as_str(), ns::DSIG), (ns::attr::ID, ctx.signature_id.as_str())],
        )?;
        self.render_signed_info(&mut w)?;
        w.text_element(
            &ds(ns::node::SIGNATURE_VALUE),
            &[(ns::attr::ID, ctx.signature_value_id.as_str())],
            self.signature_value.as_deref().unwrap_or(""),
        )?;
        self.render_key_info(&mut w)?;
        self.render_object(&mut w)?;
        w.end_element(&signature)?;
        w.into_string()
    }

    fn render_signed_info(&self, w: &mut XmlWriter) -> Result<(), Error> {
        let ctx = &self.ctx;
        let signed_info = ds(ns::node::SIGNED_INFO);
        w.start_element(&signed_info, &[(ns::attr::ID, ctx.signed_info_id.as_str())])?;
        w.empty_element(
            &ds(ns::node::CANONICALIZATION_METHOD),
            &[(ns::attr::ALGORITHM, algorithm::C14N)],
        )?;
        w.empty_element(
            &ds(ns::node::SIGNATURE_METHOD),
            &[(ns::attr::ALGORITHM, self.signature_method)],
        )?;

        let sp_uri = format!("#{}", ctx.signed_properties_id);
        render_reference(
            w,
            &[(ns::attr::ID, ctx.reference_doc_id.as_str()), (ns::attr::URI, "")],
            &[algorithm::ENVELOPED_SIGNATURE, algorithm::EXC_C14N],
            self.document_digest.as_deref(),
        )?;
        render_reference(
            w,
            &[
                (ns::attr::ID, ctx.reference_sp_id.as_str()),
                (ns::attr::TYPE, algorithm::XADES_SIGNED_PROPERTIES),
                (ns::attr::URI, sp_uri.as_str()),
            ],
            &[algorithm::EXC_C14N],
            self.signed_properties_digest.as_deref(),
        )?;
        w.end_element(&signed_info)
    }

    fn render_key_info(&self, w: &mut XmlWriter) -> Result<(), Error> {
        let key_info = ds(ns::node::KEY_INFO);
        let x509_data = ds(ns::node::X509_DATA);
        w.start_element(&key_info, &[(ns::attr::ID, self.ctx.key_info_id.as_str())])?;
        w.start_element(&x509_data, &[])?;
        w.text_element(&ds(ns::node::X509_CERTIFICATE), &[], &self.certificate)?;
        w.end_element(&x509_data)?;
        w.end_element(&key_info)
    }

    fn render_object(&self, w: &mut XmlWriter) -> Result<(), Error> {
        let ctx = &self.ctx;
        let object = ds(ns::node::OBJECT);
        let qualifying = xades(ns::node::QUALIFYING_PROPERTIES);
        let signed_properties = xades(ns::node::SIGNED_PROPERTIES);
        let xmlns_xades = format!("xmlns:{}", ns::XADES_PREFIX);
        let target = format!("#{}", ctx.signature_id);

        w.start_element(&object, &[(ns::attr::ID, ctx.object_id.as_str())])?;
        w.start_element(
            &qualifying,
            &[
                (xmlns_xades.as_str(), ns::XADES),
                (ns::attr::ID, ctx.qualifying_properties_id.as_str()),
                (ns::attr::TARGET, target.as_str()),
            ],
        )?;
        w.start_element(&signed_properties, &[(ns::attr::ID, ctx.signed_properties_id.as_str())])?;
        if let Some(values) = &self.signed_properties {
            render_signed_signature_properties(w, values)?;
        }
        w.end_element(&signed_properties)?;
        w.end_element(&qualifying)?;
        w.end_element(&object)
    }
}

fn render_reference(
    w: &mut XmlWriter,
    attrs: &[(&str, &str)],
    transforms: &[&str],
    digest: Option<&str>,
) -> Result<(), Error> {
    let reference = ds(ns::node::REFERENCE);
    let transforms_name = ds(ns::node::TRANSFORMS);
    let transform = ds(ns::node::TRANSFORM);

    w.start_element(&reference, attrs)?;
    w.start_element(&transforms_name, &[])?;
    for &uri in transforms {
        w.empty_element(&transform, &[(ns::attr::ALGORITHM, uri)])?;
    }
    w.end_element(&transforms_name)?;
    render_digest(w, digest.unwrap_or(""))?;
    w.end_element(&reference)
}

fn render_digest(w: &mut XmlWriter, value: &str) -> Result<(), Error> {
    w.empty_element(
        &ds(ns::node::DIGEST_METHOD),
        &[(ns::attr::ALGORITHM, algorithm::SHA256)],
    )?;
    w.text_element(&ds(ns::node::DIGEST_VALUE), &[], value)
}

fn render_signed_signature_properties(
    w: &mut XmlWriter,
    values: &SignedPropertiesValues,
) -> Result<(), Error> {
    let ssp = xades(ns::node::SIGNED_SIGNATURE_PROPERTIES);
    let signing_certificate = xades(ns::node::SIGNING_CERTIFICATE);
    let cert = xades(ns::node::CERT);
    let cert_digest = xades(ns::node::CERT_DIGEST);
    let issuer_serial = xades(ns::node::ISSUER_SERIAL);

    w.start_element(&ssp, &[])?;
    w.text_element(&xades(ns::node::SIGNING_TIME), &[], &values.signing_time)?;
    w.start_element(&signing_certificate, &[])?;
    w.start_element(&cert, &[])?;

    w.start_element(&cert_digest, &[])?;
    render_digest(w, &values.certificate_digest)?;
    w.end_element(&cert_digest)?;

    w.start_element(&issuer_serial, &[])?;
    w.text_element(&ds(ns::node::X509_ISSUER_NAME), &[], &values.issuer_name)?;
    w.text_element(&ds(ns::node::X509_SERIAL_NUMBER), &[], &values.serial_number)?;
    w.end_element(&issuer_serial)?;

    w.end_element(&cert)?;
    w.end_element(&signing_certificate)?;
    w.end_element(&ssp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIdGenerator;
    use std::collections::HashSet;

    fn tree() -> SignatureTree {
        let ctx = SignatureContext::generate(&SequentialIdGenerator::default(), &HashSet::new())
            .unwrap();
        SignatureTree::new(ctx, algorithm::RSA_SHA256, "MIIB".into())
    }

    #[test]
    fn test_skeleton_layout() {
        let xml = tree().render().unwrap();
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let root = doc.root_element();
        assert_eq!(root.tag_name().namespace(), Some(ns::DSIG));
        assert_eq!(root.attribute("Id"), Some("id-1"));

        let children: Vec<&str> = root
            .children()
            .filter(|n| n.is_element())
            .map(|n| n.tag_name().name())
            .collect();
        assert_eq!(children, ["SignedInfo", "SignatureValue", "KeyInfo", "Object"]);

        let digests: Vec<_> = doc
            .descendants()
            .filter(|n| n.has_tag_name((ns::DSIG, "DigestValue")))
            .collect();
        assert_eq!(digests.len(), 2);
        assert!(digests.iter().all(|n| n.text().is_none()));

        let sp = doc
            .descendants()
            .find(|n| n.has_tag_name((ns::XADES, "SignedProperties")))
            .unwrap();
        assert_eq!(sp.attribute("Id"), Some("id-9"));
        assert!(sp.first_child().is_none());
        assert!(xml.contains(r##"URI="#id-9""##));
        assert!(xml.contains(r##"Target="#id-1""##));
    }

    #[test]
    fn test_filled_values() {
        let xml = tree()
            .with_document_digest("DOC=".into())
            .with_signed_properties(SignedPropertiesValues {
                signing_time: "2025-01-01T00:00:00Z".into(),
                certificate_digest: "CERT=".into(),
                issuer_name: "CN=A & B,C=PL".into(),
                serial_number: "4660".into(),
            })
            .with_signed_properties_digest("SP=".into())
            .with_signature_value("SIG=".into())
            .render()
            .unwrap();
        assert!(xml.contains("<ds:DigestValue>DOC=</ds:DigestValue>"));
        assert!(xml.contains("<ds:DigestValue>SP=</ds:DigestValue>"));
        assert!(xml.contains("<ds:DigestValue>CERT=</ds:DigestValue>"));
        assert!(xml.contains(r#"<ds:SignatureValue Id="id-3">SIG=</ds:SignatureValue>"#));
        assert!(xml.contains("<xades:SigningTime>2025-01-01T00:00:00Z</xades:SigningTime>"));
        assert!(xml.contains("<ds:X509IssuerName>CN=A &amp; B,C=PL</ds:X509IssuerName>"));
        assert!(xml.contains("<ds:X509SerialNumber>4660</ds:X509SerialNumber>"));
        roxmltree::Document::parse(&xml).unwrap();
    }
}
