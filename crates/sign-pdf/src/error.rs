use sign_crypto::CryptoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("Unreadable stamp image: {0}")]
    Image(String),

    #[error("Incremental write failed: {0}")]
    Write(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
