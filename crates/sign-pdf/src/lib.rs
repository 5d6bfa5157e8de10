//! PDF-side signing primitives
//!
//! This crate provides the document half of the signing engine:
//! - `fields`: enumeration and lookup of existing signature fields
//! - `stamp`: visual stamp composition (text template + background image)
//! - `incremental`: one append-field-and-sign step, emitted as a strict
//!   incremental update so prior revisions and signatures stay intact
//!
//! Parsing uses lopdf; output is byte-appended rather than saved through
//! lopdf, because a full rewrite would invalidate earlier signatures.

pub mod error;
pub mod fields;
pub mod incremental;
pub mod stamp;
mod writer;

pub use error::PdfError;
pub use fields::{enumerate_signature_fields, find_signature_field, SignatureFieldRef};
pub use incremental::{sign_revision, FieldPlacement};
pub use stamp::{StampStyle, DEFAULT_STAMP_TEXT};
