#![forbid(unsafe_code)]

/// Errors produced by the Pieczec XAdES signer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed input XML: {0}")]
    MalformedInputXml(String),

    #[error("invalid XML structure: {0}")]
    XmlStructure(String),

    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    #[error("invalid DER: {0}")]
    InvalidDer(String),

    #[error("canonicalization failure: {0}")]
    CanonicalizationFailure(String),

    #[error("cryptographic error: {0}")]
    Crypto(String),

    #[error("key error: {0}")]
    Key(String),

    #[error("certificate error: {0}")]
    Certificate(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_der_message() {
        let err = Error::InvalidDer("no SEQUENCE".into());
        assert_eq!(err.to_string(), "invalid DER: no SEQUENCE");
    }

    #[test]
    fn test_io_conversion() {
        fn read() -> Result<Vec<u8>> {
            Ok(std::fs::read("/nonexistent/pieczec/file")?)
        }
        assert!(matches!(read(), Err(Error::Io(_))));
    }
}
