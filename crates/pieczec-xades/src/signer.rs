#![forbid(unsafe_code)]

//! XAdES-BES enveloped signature creation.

use crate::clock::{Clock, SystemClock};
use crate::ids::{IdGenerator, UuidIdGenerator};
use crate::stages::Skeleton;
use pieczec_core::Error;
use pieczec_crypto::SigningKey;
use pieczec_keys::X509Certificate;
use std::sync::Arc;

/// Everything one signature needs from the caller.
#[derive(Debug, Clone, Copy)]
pub struct SigningRequest<'a> {
    /// UTF-8 XML text of the document to sign.
    pub document: &'a str,
    pub certificate: &'a X509Certificate,
    pub key: &'a SigningKey,
}

/// Signs documents with an enveloped XAdES-BES signature.
///
/// Holds only the identifier generator and the clock, both shared and
/// thread-safe, so one signer can serve concurrent callers.
#[derive(Clone)]
pub struct XadesSigner {
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl XadesSigner {
    /// UUID identifiers and the system clock.
    pub fn new() -> Self {
        Self {
            ids: Arc::new(UuidIdGenerator),
            clock: Arc::new(SystemClock),
        }
    }

    /// Use `ids` for the signature element identifiers.
    pub fn with_id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    /// Use `clock` for `xades:SigningTime`.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Sign `request.document` and return it with a `ds:Signature` appended
    /// as the last child of the document element.
    ///
    /// Nothing is returned unless every stage succeeds.
    pub fn sign(&self, request: &SigningRequest<'_>) -> Result<String, Error> {
        let skeleton = Skeleton::build(
            request.document,
            self.ids.as_ref(),
            request.key,
            request.certificate,
        )?;
        let signed = skeleton
            .compute_document_digest()?
            .build_signed_properties(request.certificate, self.clock.as_ref())?
            .compute_signed_properties_digest()?
            .sign_signed_info(request.key)?;

        let signature_id = signed.context().signature_id.clone();
        let document = signed.embed_signature_value()?;
        tracing::info!(
            signature_id = %signature_id,
            key = %request.key.describe(),
            subject = request.certificate.subject_name(),
            "document signed"
        );
        Ok(document)
    }
}

impl Default for XadesSigner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for XadesSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XadesSigner").finish_non_exhaustive()
    }
}

/// Sign with UUID identifiers and the system clock.
pub fn sign(
    document: &str,
    certificate: &X509Certificate,
    key: &SigningKey,
) -> Result<String, Error> {
    XadesSigner::new().sign(&SigningRequest {
        document,
        certificate,
        key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::ids::SequentialIdGenerator;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use chrono::{TimeZone, Utc};
    use pieczec_c14n::C14nMode;
    use pieczec_core::{algorithm, ns};
    use pieczec_crypto::digest;
    use pieczec_xml::NodeSet;
    use signature::Verifier;

    const INVOICE: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<!-- invoice -->\n\
<Faktura xmlns=\"http://crd.gov.pl/wzor/2023/06/29/12648/\" xmlns:etd=\"urn:etd\">\n  \
<Naglowek><KodFormularza kodSystemowy=\"FA (2)\">FA</KodFormularza></Naglowek>\n  \
<Podmiot1 etd:rola=\"1\"><NIP>1111111111</NIP><Nazwa>A &amp; B</Nazwa></Podmiot1>\n\
</Faktura>\n";

    fn fixture(name: &str) -> std::path::PathBuf {
        std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../test-data/keys")
            .join(name)
    }

    fn rsa() -> (SigningKey, X509Certificate) {
        (
            pieczec_keys::load_signing_key_file(&fixture("rsa-key.pem")).unwrap(),
            X509Certificate::from_file(&fixture("rsa-cert.pem")).unwrap(),
        )
    }

    fn ec() -> (SigningKey, X509Certificate) {
        (
            pieczec_keys::load_signing_key_file(&fixture("ec-key.pem")).unwrap(),
            X509Certificate::from_file(&fixture("ec-cert.pem")).unwrap(),
        )
    }

    fn deterministic() -> XadesSigner {
        XadesSigner::new()
            .with_id_generator(SequentialIdGenerator::default())
            .with_clock(FixedClock(Utc.with_ymd_and_hms(2025, 5, 1, 8, 30, 0).unwrap()))
    }

    fn sign_with(
        signer: &XadesSigner,
        document: &str,
        (key, cert): &(SigningKey, X509Certificate),
    ) -> String {
        signer
            .sign(&SigningRequest {
                document,
                certificate: cert,
                key,
            })
            .unwrap()
    }

    fn child<'a, 'input>(
        node: roxmltree::Node<'a, 'input>,
        namespace: &str,
        name: &str,
    ) -> roxmltree::Node<'a, 'input> {
        node.children()
            .find(|n| n.has_tag_name((namespace, name)))
            .unwrap_or_else(|| panic!("missing {name}"))
    }

    fn element_children<'a, 'input>(node: roxmltree::Node<'a, 'input>) -> Vec<&'a str> {
        node.children()
            .filter(|n| n.is_element())
            .map(|n| n.tag_name().name())
            .collect()
    }

    /// Recompute both reference digests from the signed output.
    fn check_digests(signed: &str) {
        let doc = pieczec_xml::parse(signed).unwrap();
        let signature = doc
            .descendants()
            .find(|n| n.has_tag_name((ns::DSIG, "Signature")))
            .unwrap();
        let signed_info = child(signature, ns::DSIG, "SignedInfo");
        let refs: Vec<_> = signed_info
            .children()
            .filter(|n| n.has_tag_name((ns::DSIG, "Reference")))
            .collect();
        assert_eq!(refs.len(), 2);

        let mut node_set = NodeSet::all_without_comments(&doc);
        node_set.remove_subtree(signature);
        let canonical =
            pieczec_c14n::canonicalize_doc(&doc, C14nMode::Exclusive, Some(&node_set)).unwrap();
        assert_eq!(
            child(refs[0], ns::DSIG, "DigestValue").text(),
            Some(digest::sha256_base64(&canonical).as_str())
        );

        let sp_id = refs[1].attribute("URI").unwrap().trim_start_matches('#');
        let sp = pieczec_xml::XmlDocument::find_by_id(&doc, sp_id).unwrap();
        assert!(sp.has_tag_name((ns::XADES, "SignedProperties")));
        let canonical = pieczec_c14n::canonicalize_subtree(sp, C14nMode::Exclusive).unwrap();
        assert_eq!(
            child(refs[1], ns::DSIG, "DigestValue").text(),
            Some(digest::sha256_base64(&canonical).as_str())
        );
    }

    /// `DigestValue` texts of the document and SignedProperties references.
    fn reference_digests(signed: &str) -> (String, String) {
        let doc = pieczec_xml::parse(signed).unwrap();
        let signed_info = doc
            .descendants()
            .find(|n| n.has_tag_name((ns::DSIG, "SignedInfo")))
            .unwrap();
        let values: Vec<String> = signed_info
            .children()
            .filter(|n| n.has_tag_name((ns::DSIG, "Reference")))
            .map(|r| child(r, ns::DSIG, "DigestValue").text().unwrap().to_owned())
            .collect();
        assert_eq!(values.len(), 2);
        (values[0].clone(), values[1].clone())
    }

    /// Canonical SignedInfo and decoded SignatureValue of the signed output.
    fn signed_info_and_value(signed: &str) -> (Vec<u8>, Vec<u8>) {
        let doc = pieczec_xml::parse(signed).unwrap();
        let signature = doc
            .descendants()
            .find(|n| n.has_tag_name((ns::DSIG, "Signature")))
            .unwrap();
        let canonical = pieczec_c14n::canonicalize_subtree(
            child(signature, ns::DSIG, "SignedInfo"),
            C14nMode::Inclusive,
        )
        .unwrap();
        let value = child(signature, ns::DSIG, "SignatureValue").text().unwrap();
        (canonical, STANDARD.decode(value).unwrap())
    }

    #[test]
    fn test_structure() {
        let signed = sign_with(&deterministic(), INVOICE, &rsa());
        let doc = pieczec_xml::parse(&signed).unwrap();
        let root = doc.root_element();
        let signature = root.last_element_child().unwrap();
        assert!(signature.has_tag_name((ns::DSIG, "Signature")));
        assert_eq!(
            element_children(signature),
            ["SignedInfo", "SignatureValue", "KeyInfo", "Object"]
        );

        let signed_info = child(signature, ns::DSIG, "SignedInfo");
        assert_eq!(
            element_children(signed_info),
            ["CanonicalizationMethod", "SignatureMethod", "Reference", "Reference"]
        );
        assert_eq!(
            child(signed_info, ns::DSIG, "CanonicalizationMethod").attribute("Algorithm"),
            Some(algorithm::C14N)
        );
        assert_eq!(
            child(signed_info, ns::DSIG, "SignatureMethod").attribute("Algorithm"),
            Some(algorithm::RSA_SHA256)
        );

        let refs: Vec<_> = signed_info
            .children()
            .filter(|n| n.has_tag_name((ns::DSIG, "Reference")))
            .collect();
        assert_eq!(refs[0].attribute("URI"), Some(""));
        let transforms: Vec<_> = child(refs[0], ns::DSIG, "Transforms")
            .children()
            .filter_map(|n| n.attribute("Algorithm"))
            .collect();
        assert_eq!(transforms, [algorithm::ENVELOPED_SIGNATURE, algorithm::EXC_C14N]);
        assert_eq!(refs[1].attribute("Type"), Some(algorithm::XADES_SIGNED_PROPERTIES));

        let object = child(signature, ns::DSIG, "Object");
        let qp = child(object, ns::XADES, "QualifyingProperties");
        assert_eq!(qp.attribute("Target"), Some("#id-1"));
        let sp = child(qp, ns::XADES, "SignedProperties");
        let sp_uri = format!("#{}", sp.attribute("Id").unwrap());
        assert_eq!(refs[1].attribute("URI"), Some(sp_uri.as_str()));

        let ssp = child(sp, ns::XADES, "SignedSignatureProperties");
        assert_eq!(child(ssp, ns::XADES, "SigningTime").text(), Some("2025-05-01T08:30:00Z"));
        let cert = child(child(ssp, ns::XADES, "SigningCertificate"), ns::XADES, "Cert");
        let issuer_serial = child(cert, ns::XADES, "IssuerSerial");
        assert_eq!(
            child(issuer_serial, ns::DSIG, "X509SerialNumber").text(),
            Some("2246800662264969608")
        );
        assert_eq!(
            child(child(cert, ns::XADES, "CertDigest"), ns::DSIG, "DigestValue").text(),
            Some("kHGAHMHyKLxk5zsJsDgEM60s9ip04lK/+mCIeI6H7AI=")
        );

        let x509_data = child(child(signature, ns::DSIG, "KeyInfo"), ns::DSIG, "X509Data");
        let x509 = child(x509_data, ns::DSIG, "X509Certificate");
        assert_eq!(x509.text(), Some(rsa().1.to_base64().as_str()));
        assert!(!x509.text().unwrap().contains(char::is_whitespace));
    }

    #[test]
    fn test_ids_are_distinct() {
        let signed = sign(INVOICE, &rsa().1, &rsa().0).unwrap();
        let doc = pieczec_xml::parse(&signed).unwrap();
        let ids: Vec<&str> = doc.descendants().filter_map(|n| n.attribute("Id")).collect();
        assert_eq!(ids.len(), 9);
        let unique: std::collections::HashSet<&str> = ids.iter().copied().collect();
        assert_eq!(unique.len(), 9);
        assert!(ids.iter().all(|id| id.starts_with("id-")));
    }

    #[test]
    fn test_digests_match_rsa() {
        check_digests(&sign_with(&deterministic(), INVOICE, &rsa()));
    }

    #[test]
    fn test_digests_match_ec() {
        check_digests(&sign_with(&deterministic(), INVOICE, &ec()));
    }

    #[test]
    fn test_rsa_signature_verifies() {
        let (key, cert) = rsa();
        let signed = sign_with(&deterministic(), INVOICE, &(key.clone(), cert));
        let (canonical, value) = signed_info_and_value(&signed);
        let SigningKey::Rsa(private_key) = key else {
            panic!("expected RSA key")
        };
        let vk = rsa::pkcs1v15::VerifyingKey::<sha2::Sha256>::new(private_key.to_public_key());
        let sig = rsa::pkcs1v15::Signature::try_from(value.as_slice()).unwrap();
        vk.verify(&canonical, &sig).unwrap();
    }

    #[test]
    fn test_ec_signature_verifies() {
        let (key, cert) = ec();
        let signed = sign_with(&deterministic(), INVOICE, &(key.clone(), cert));
        assert!(signed.contains(algorithm::ECDSA_SHA256));
        let (canonical, value) = signed_info_and_value(&signed);
        assert_eq!(value.len(), 64);
        let SigningKey::EcP256(sk) = key else {
            panic!("expected EC key")
        };
        let sig = p256::ecdsa::Signature::from_slice(&value).unwrap();
        sk.verifying_key().verify(&canonical, &sig).unwrap();
    }

    #[test]
    fn test_signed_info_inherits_document_namespaces() {
        let signed = sign_with(&deterministic(), INVOICE, &rsa());
        let (canonical, _) = signed_info_and_value(&signed);
        let canonical = String::from_utf8(canonical).unwrap();
        assert!(canonical.starts_with(
            "<ds:SignedInfo xmlns=\"http://crd.gov.pl/wzor/2023/06/29/12648/\" \
             xmlns:ds=\"http://www.w3.org/2000/09/xmldsig#\" xmlns:etd=\"urn:etd\" Id=\"id-2\">"
        ));
        assert!(canonical.contains("></ds:CanonicalizationMethod>"));
    }

    #[test]
    fn test_deterministic_given_ids_and_time() {
        let a = sign_with(&deterministic(), INVOICE, &ec());
        let b = sign_with(&deterministic(), INVOICE, &ec());
        assert_eq!(a, b);

        let later = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let c = sign_with(&deterministic().with_clock(FixedClock(later)), INVOICE, &ec());
        assert_ne!(a, c);
        assert!(c.contains("<xades:SigningTime>2026-01-01T00:00:00Z</xades:SigningTime>"));

        // Only the signing time, and what covers it, moves.
        let (doc_a, sp_a) = reference_digests(&a);
        let (doc_c, sp_c) = reference_digests(&c);
        assert_eq!(doc_a, doc_c);
        assert_ne!(sp_a, sp_c);
        assert_eq!(
            c.replace("2026-01-01T00:00:00Z", "").len(),
            a.replace("2025-05-01T08:30:00Z", "").len()
        );
    }

    #[test]
    fn test_input_preserved_outside_signature() {
        let signed = sign_with(&deterministic(), INVOICE, &rsa());
        let start = signed.find("<ds:Signature ").unwrap();
        let end = signed.find("</ds:Signature>").unwrap() + "</ds:Signature>".len();
        assert_eq!(format!("{}{}", &signed[..start], &signed[end..]), INVOICE);
        assert!(signed[end..].starts_with("</Faktura>"));
    }

    #[test]
    fn test_self_closing_root() {
        let signed = sign_with(&deterministic(), "<p:Doc xmlns:p=\"urn:p\" a=\"1\"/>", &ec());
        assert!(signed.starts_with("<p:Doc xmlns:p=\"urn:p\" a=\"1\"><ds:Signature "));
        assert!(signed.ends_with("</ds:Signature></p:Doc>"));
        check_digests(&signed);
    }

    #[test]
    fn test_existing_ids_are_avoided() {
        let document = r#"<r Id="id-1"><x Id="id-2"/></r>"#;
        let signed = sign_with(&deterministic(), document, &rsa());
        let doc = pieczec_xml::parse(&signed).unwrap();
        let signature = doc.root_element().last_element_child().unwrap();
        assert_eq!(signature.attribute("Id"), Some("id-3"));
        let ids: Vec<&str> = doc.descendants().filter_map(|n| n.attribute("Id")).collect();
        let unique: std::collections::HashSet<&str> = ids.iter().copied().collect();
        assert_eq!(ids.len(), unique.len());
        check_digests(&signed);
    }

    #[test]
    fn test_malformed_input() {
        let (key, cert) = rsa();
        let err = sign("<r><unclosed></r>", &cert, &key).unwrap_err();
        assert!(matches!(err, Error::MalformedInputXml(_)));
    }

    #[test]
    fn test_concurrent_signing() {
        let signer = XadesSigner::new();
        let material = ec();
        let outputs: Vec<String> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let signer = &signer;
                    let material = &material;
                    s.spawn(move || sign_with(signer, &format!("<doc n=\"{i}\"/>"), material))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for (i, signed) in outputs.iter().enumerate() {
            assert!(signed.starts_with(&format!("<doc n=\"{i}\">")));
            check_digests(signed);
        }
    }
}
