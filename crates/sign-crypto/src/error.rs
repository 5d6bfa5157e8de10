use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Invalid certificate bundle or wrong password")]
    InvalidCredential,

    #[error("Signature creation failed: {0}")]
    Signing(String),
}
