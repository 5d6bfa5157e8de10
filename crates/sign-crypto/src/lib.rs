//! Signing credential handling
//!
//! This crate extracts a private key and certificate chain from a
//! password-protected PKCS#12 bundle and creates detached PKCS#7/CMS
//! signatures with it. Credentials live in memory for one signing
//! invocation and are dropped on every exit path.

pub mod credential;
pub mod error;

pub use credential::SigningCredential;
pub use error::CryptoError;
