#![forbid(unsafe_code)]

//! KSeF `AuthTokenRequest`, the document signed for certificate-based
//! authentication.

use crate::signer::{SigningRequest, XadesSigner};
use pieczec_core::{ns, Error};
use pieczec_crypto::SigningKey;
use pieczec_keys::X509Certificate;
use pieczec_xml::XmlWriter;
use std::fmt;

/// NIP checksum weights for the first nine digits.
const NIP_WEIGHTS: [u32; 9] = [6, 5, 7, 2, 3, 4, 5, 6, 7];

/// Identifiers the KSeF test environment accepts without a valid checksum.
const TEST_NIPS: [&str; 3] = ["1111111111", "1234567890", "2222222222"];

/// A Polish tax identification number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Nip(String);

impl Nip {
    /// Parse a NIP, ignoring separators such as `-` and spaces.
    pub fn parse(value: &str) -> Result<Self, Error> {
        let digits: String = value.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return Err(Error::Other("NIP cannot be empty".into()));
        }
        if digits.len() != 10 {
            return Err(Error::Other(format!("NIP must be 10 digits, got {}", digits.len())));
        }
        if !TEST_NIPS.contains(&digits.as_str()) && !checksum_ok(&digits) {
            return Err(Error::Other(format!("NIP {digits} has an invalid checksum")));
        }
        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Nip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn checksum_ok(digits: &str) -> bool {
    let values: Vec<u32> = digits.bytes().map(|b| u32::from(b - b'0')).collect();
    let sum: u32 = values.iter().zip(NIP_WEIGHTS).map(|(d, w)| d * w).sum();
    let check = sum % 11;
    check != 10 && check == values[9]
}

/// How KSeF matches the signing certificate to the authenticating subject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubjectIdentifierType {
    #[default]
    CertificateSubject,
    CertificateFingerprint,
}

impl SubjectIdentifierType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CertificateSubject => "certificateSubject",
            Self::CertificateFingerprint => "certificateFingerprint",
        }
    }
}

/// Challenge response document for `POST /auth/xades-signature`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthTokenRequest {
    pub challenge: String,
    pub nip: Nip,
    pub subject_identifier_type: SubjectIdentifierType,
}

impl AuthTokenRequest {
    pub fn new(challenge: impl Into<String>, nip: Nip) -> Self {
        Self {
            challenge: challenge.into(),
            nip,
            subject_identifier_type: SubjectIdentifierType::default(),
        }
    }

    pub fn with_subject_identifier_type(mut self, kind: SubjectIdentifierType) -> Self {
        self.subject_identifier_type = kind;
        self
    }

    /// The unsigned request document, with an XML declaration.
    pub fn to_xml(&self) -> Result<String, Error> {
        let mut w = XmlWriter::new();
        w.declaration()?;
        w.start_element("AuthTokenRequest", &[("xmlns", ns::KSEF_AUTH)])?;
        w.text_element("Challenge", &[], &self.challenge)?;
        w.start_element("ContextIdentifier", &[])?;
        w.text_element("Nip", &[], self.nip.as_str())?;
        w.end_element("ContextIdentifier")?;
        w.text_element("SubjectIdentifierType", &[], self.subject_identifier_type.as_str())?;
        w.end_element("AuthTokenRequest")?;
        w.into_string()
    }

    /// Render and sign the request.
    pub fn sign(
        &self,
        signer: &XadesSigner,
        certificate: &X509Certificate,
        key: &SigningKey,
    ) -> Result<String, Error> {
        let document = self.to_xml()?;
        tracing::debug!(nip = %self.nip, challenge = %self.challenge, "signing auth token request");
        signer.sign(&SigningRequest {
            document: &document,
            certificate,
            key,
        })
    }
}
