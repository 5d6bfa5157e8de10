//! DTR signing engine
//!
//! Signs daily-time-record and leave-application PDFs with visible
//! digital signatures, one incremental revision per signature field so
//! earlier signatures stay verifiable. Field placement is decided by
//! the signer's role and the covered date range.
//!
//! The typical entry point is [`Engine::sign`]; [`pipeline::sign_document`]
//! is the synchronous core underneath it.

pub mod config;
pub mod engine;
pub mod error;
pub mod layout;
pub mod pipeline;

pub use config::EngineConfig;
pub use engine::{Engine, SignRequest};
pub use error::SignError;
pub use layout::{layout, DateRangeMode, FieldSpec, SignerRole};
pub use sign_crypto::SigningCredential;
pub use sign_pdf::StampStyle;
