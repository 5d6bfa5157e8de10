use sign_crypto::CryptoError;
use sign_pdf::PdfError;
use thiserror::Error;

/// Unified error taxonomy for a signing invocation.
///
/// Every failure inside one invocation maps to exactly one of these
/// variants; callers never see a partially signed document alongside
/// an error.
#[derive(Error, Debug)]
pub enum SignError {
    #[error("Invalid certificate bundle or wrong password")]
    InvalidCredential,

    #[error("Failed to parse PDF document: {0}")]
    DocumentParse(String),

    #[error("Signature field conflict: {0}")]
    FieldConflict(String),

    #[error("Unreadable stamp image: {0}")]
    Image(String),

    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CryptoError> for SignError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::InvalidCredential => SignError::InvalidCredential,
            CryptoError::Signing(msg) => SignError::Crypto(msg),
        }
    }
}

impl From<PdfError> for SignError {
    fn from(err: PdfError) -> Self {
        match err {
            PdfError::Parse(msg) => SignError::DocumentParse(msg),
            PdfError::Image(msg) => SignError::Image(msg),
            PdfError::Write(msg) => SignError::Crypto(msg),
            PdfError::Crypto(inner) => inner.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn wrong_password_maps_to_invalid_credential() {
        let err: SignError = CryptoError::InvalidCredential.into();
        assert!(matches!(err, SignError::InvalidCredential));
    }

    #[test]
    fn pdf_crypto_errors_unwrap_to_the_inner_taxonomy() {
        let err: SignError = PdfError::Crypto(CryptoError::Signing("bad key".into())).into();
        match err {
            SignError::Crypto(msg) => assert_eq!(msg, "bad key"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn parse_failures_surface_as_document_parse() {
        let err: SignError = PdfError::Parse("truncated xref".into()).into();
        assert!(matches!(err, SignError::DocumentParse(_)));
    }
}
