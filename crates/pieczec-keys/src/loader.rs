#![forbid(unsafe_code)]

//! Private key loading from PEM and DER (PKCS#8, PKCS#1, SEC1).

use pieczec_core::Error;
use pieczec_crypto::SigningKey;
use pkcs8::ObjectIdentifier;

/// rsaEncryption
const OID_RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
/// id-ecPublicKey
const OID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
/// prime256v1 / secp256r1
const OID_PRIME256V1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");

/// Load a signing key from PEM data.
///
/// Accepts `PRIVATE KEY` (PKCS#8), `RSA PRIVATE KEY` (PKCS#1) and
/// `EC PRIVATE KEY` (SEC1).
pub fn load_signing_key_pem(pem_data: &[u8]) -> Result<SigningKey, Error> {
    let pem_str = std::str::from_utf8(pem_data)
        .map_err(|e| Error::Key(format!("invalid PEM encoding: {e}")))?;

    // Keys exported by some tools carry explanatory text before the block.
    let start = pem_str
        .find("-----BEGIN")
        .ok_or_else(|| Error::Key("no PEM block found".into()))?;
    let (label, der) = pem_rfc7468::decode_vec(pem_str[start..].trim().as_bytes())
        .map_err(|e| Error::Key(format!("failed to decode key PEM: {e}")))?;

    match label {
        "PRIVATE KEY" => load_pkcs8_der(&der),
        "RSA PRIVATE KEY" => load_pkcs1_der(&der),
        "EC PRIVATE KEY" => load_sec1_der(&der),
        "ENCRYPTED PRIVATE KEY" => Err(Error::Key(
            "encrypted private keys are not supported; decrypt the key first".into(),
        )),
        other => Err(Error::Key(format!("unexpected PEM label: {other}"))),
    }
}

/// Load a signing key from DER data, trying PKCS#8, PKCS#1 and SEC1 in turn.
pub fn load_signing_key_der(der: &[u8]) -> Result<SigningKey, Error> {
    if pkcs8::PrivateKeyInfo::try_from(der).is_ok() {
        return load_pkcs8_der(der);
    }
    if let Ok(key) = load_pkcs1_der(der) {
        return Ok(key);
    }
    if sec1::EcPrivateKey::try_from(der).is_ok() {
        return load_sec1_der(der);
    }
    Err(Error::Key(
        "unable to parse DER private key (tried PKCS#8, PKCS#1, SEC1)".into(),
    ))
}

/// Load a signing key from a file, auto-detecting PEM or DER.
pub fn load_signing_key_file(path: &std::path::Path) -> Result<SigningKey, Error> {
    let data = std::fs::read(path)?;
    let key = if looks_like_pem(&data) {
        load_signing_key_pem(&data)?
    } else {
        load_signing_key_der(&data)?
    };
    tracing::debug!(path = %path.display(), key = %key.describe(), "loaded signing key");
    Ok(key)
}

pub(crate) fn looks_like_pem(data: &[u8]) -> bool {
    data.windows(10).any(|w| w == b"-----BEGIN")
}

fn load_pkcs8_der(der: &[u8]) -> Result<SigningKey, Error> {
    use pkcs8::DecodePrivateKey;

    let pki = pkcs8::PrivateKeyInfo::try_from(der)
        .map_err(|e| Error::Key(format!("failed to parse PKCS#8 private key: {e}")))?;

    match pki.algorithm.oid {
        OID_RSA_ENCRYPTION => {
            let pk = rsa::RsaPrivateKey::from_pkcs8_der(der)
                .map_err(|e| Error::Key(format!("failed to parse RSA private key: {e}")))?;
            Ok(SigningKey::Rsa(pk))
        }
        OID_EC_PUBLIC_KEY => {
            let curve = pki
                .algorithm
                .parameters_oid()
                .map_err(|e| Error::Key(format!("EC key without named curve: {e}")))?;
            if curve != OID_PRIME256V1 {
                return Err(Error::UnsupportedKeyType(format!(
                    "EC curve {curve} (only P-256 is supported)"
                )));
            }
            let sk = p256::ecdsa::SigningKey::from_pkcs8_der(der)
                .map_err(|e| Error::Key(format!("failed to parse P-256 private key: {e}")))?;
            Ok(SigningKey::EcP256(sk))
        }
        other => Err(Error::UnsupportedKeyType(format!(
            "private key algorithm {other} (expected RSA or EC P-256)"
        ))),
    }
}

fn load_pkcs1_der(der: &[u8]) -> Result<SigningKey, Error> {
    use pkcs1::DecodeRsaPrivateKey;
    let pk = rsa::RsaPrivateKey::from_pkcs1_der(der)
        .map_err(|e| Error::Key(format!("failed to parse PKCS#1 RSA private key: {e}")))?;
    Ok(SigningKey::Rsa(pk))
}

fn load_sec1_der(der: &[u8]) -> Result<SigningKey, Error> {
    let ec = sec1::EcPrivateKey::try_from(der)
        .map_err(|e| Error::Key(format!("failed to parse SEC1 EC private key: {e}")))?;
    if let Some(curve) = ec.parameters.and_then(|p| p.named_curve()) {
        if curve != OID_PRIME256V1 {
            return Err(Error::UnsupportedKeyType(format!(
                "EC curve {curve} (only P-256 is supported)"
            )));
        }
    }
    let secret = p256::SecretKey::from_sec1_der(der)
        .map_err(|e| Error::Key(format!("failed to parse P-256 private key: {e}")))?;
    Ok(SigningKey::EcP256(p256::ecdsa::SigningKey::from(secret)))
}
