#![forbid(unsafe_code)]

//! Signature computation over canonical `SignedInfo` bytes.
//!
//! The key type alone decides the algorithm: RSA keys sign with
//! RSASSA-PKCS1-v1_5/SHA-256, P-256 keys with ECDSA/SHA-256.

use crate::ecdsa;
use pieczec_core::{algorithm, Error};
use signature::{SignatureEncoding, Signer};

/// Private key material accepted by the signer.
#[derive(Clone)]
pub enum SigningKey {
    Rsa(rsa::RsaPrivateKey),
    EcP256(p256::ecdsa::SigningKey),
}

/// Signature bytes as produced by the underlying primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveSignature {
    /// RSASSA-PKCS1-v1_5 signature, already in XML-DSig form.
    RsaPkcs1v15(Vec<u8>),
    /// ECDSA signature as DER `SEQUENCE { r, s }`.
    EcdsaDer(Vec<u8>),
}

impl PrimitiveSignature {
    /// Bytes for `ds:SignatureValue`; ECDSA is converted to raw `r‖s`.
    pub fn into_xmldsig(self) -> Result<Vec<u8>, Error> {
        match self {
            Self::RsaPkcs1v15(bytes) => Ok(bytes),
            Self::EcdsaDer(der) => ecdsa::der_to_raw(&der, ecdsa::P256_FIELD_SIZE),
        }
    }
}

impl SigningKey {
    /// `SignatureMethod` algorithm URI for this key.
    pub fn algorithm_uri(&self) -> &'static str {
        match self {
            Self::Rsa(_) => algorithm::RSA_SHA256,
            Self::EcP256(_) => algorithm::ECDSA_SHA256,
        }
    }

    /// Short human-readable key description.
    pub fn describe(&self) -> String {
        match self {
            Self::Rsa(key) => {
                use rsa::traits::PublicKeyParts;
                format!("RSA {} bits", key.size() * 8)
            }
            Self::EcP256(_) => "EC P-256".to_owned(),
        }
    }

    /// Sign `data` and return the primitive's native encoding.
    pub fn sign_primitive(&self, data: &[u8]) -> Result<PrimitiveSignature, Error> {
        match self {
            Self::Rsa(private_key) => {
                let sk = rsa::pkcs1v15::SigningKey::<sha2::Sha256>::new(private_key.clone());
                let sig = sk
                    .try_sign(data)
                    .map_err(|e| Error::Crypto(format!("RSA signing failed: {e}")))?;
                Ok(PrimitiveSignature::RsaPkcs1v15(sig.to_vec()))
            }
            Self::EcP256(sk) => {
                let sig: p256::ecdsa::Signature = sk
                    .try_sign(data)
                    .map_err(|e| Error::Crypto(format!("ECDSA signing failed: {e}")))?;
                Ok(PrimitiveSignature::EcdsaDer(sig.to_der().as_bytes().to_vec()))
            }
        }
    }

    /// Sign `data` and return the bytes that go into `ds:SignatureValue`.
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>, Error> {
        let primitive = self.sign_primitive(data)?;
        tracing::trace!(algorithm = self.algorithm_uri(), "signed {} bytes", data.len());
        primitive.into_xmldsig()
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.debug_tuple("SigningKey").field(&self.describe()).finish()
    }
}
