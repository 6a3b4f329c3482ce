#![forbid(unsafe_code)]

//! The signer's X.509 certificate and the values XAdES derives from it.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use der::Decode;
use pieczec_core::Error;
use pieczec_crypto::digest;

/// A parsed signing certificate.
///
/// Keeps the DER bytes verbatim: `ds:X509Certificate` and the
/// `xades:CertDigest` are both computed over exactly these bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X509Certificate {
    der: Vec<u8>,
    issuer: String,
    subject: String,
    serial: String,
}

impl X509Certificate {
    /// Parse a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self, Error> {
        let cert = x509_cert::Certificate::from_der(der)
            .map_err(|e| Error::Certificate(format!("failed to parse X.509 certificate: {e}")))?;
        let tbs = &cert.tbs_certificate;
        Ok(Self {
            der: der.to_vec(),
            issuer: tbs.issuer.to_string(),
            subject: tbs.subject.to_string(),
            serial: serial_bytes_to_decimal_string(tbs.serial_number.as_bytes()),
        })
    }

    /// Parse a PEM `CERTIFICATE` block.
    pub fn from_pem(pem_data: &[u8]) -> Result<Self, Error> {
        let pem_str = std::str::from_utf8(pem_data)
            .map_err(|e| Error::Certificate(format!("invalid PEM encoding: {e}")))?;

        // Some PEM files carry extra trailing newlines.
        let (label, der_bytes) = pem_rfc7468::decode_vec(pem_str.trim().as_bytes())
            .map_err(|e| Error::Certificate(format!("failed to decode certificate PEM: {e}")))?;

        if label != "CERTIFICATE" {
            return Err(Error::Certificate(format!(
                "expected CERTIFICATE PEM label, got: {label}"
            )));
        }
        Self::from_der(&der_bytes)
    }

    /// Load a certificate file, PEM or DER.
    pub fn from_file(path: &std::path::Path) -> Result<Self, Error> {
        let data = std::fs::read(path)?;
        let cert = if crate::loader::looks_like_pem(&data) {
            Self::from_pem(&data)?
        } else {
            Self::from_der(&data)?
        };
        tracing::debug!(
            path = %path.display(),
            subject = %cert.subject,
            serial = %cert.serial,
            "loaded certificate"
        );
        Ok(cert)
    }

    /// Base64 of the DER encoding, without line breaks.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.der)
    }

    /// Base64 SHA-256 of the DER encoding.
    pub fn digest_base64(&self) -> String {
        digest::sha256_base64(&self.der)
    }

    /// Issuer distinguished name in RFC 4514 string form.
    pub fn issuer_name(&self) -> &str {
        &self.issuer
    }

    /// Subject distinguished name in RFC 4514 string form.
    pub fn subject_name(&self) -> &str {
        &self.subject
    }

    /// Serial number in decimal.
    pub fn serial_number(&self) -> &str {
        &self.serial
    }
}

/// Big-endian unsigned bytes to a decimal string.
fn serial_bytes_to_decimal_string(bytes: &[u8]) -> String {
    // Little-endian base-10 digits.
    let mut digits: Vec<u8> = vec![0];
    for &byte in bytes {
        let mut carry = byte as u32;
        for digit in digits.iter_mut() {
            let value = (*digit as u32) * 256 + carry;
            *digit = (value % 10) as u8;
            carry = value / 10;
        }
        while carry > 0 {
            digits.push((carry % 10) as u8);
            carry /= 10;
        }
    }
    while digits.len() > 1 && digits.last() == Some(&0) {
        digits.pop();
    }
    digits.iter().rev().map(|d| (b'0' + d) as char).collect()
}
