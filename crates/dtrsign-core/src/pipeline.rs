//! Sequential signing pipeline
//!
//! One invocation signs a document field by field. Each step reparses
//! the current bytes, decides whether the field is created or an
//! existing placeholder is reused, and appends exactly one signed
//! incremental revision. A failure at any step aborts the whole
//! invocation; intermediate revisions are dropped with it.

use chrono::Utc;
use lopdf::Document;
use sha2::{Digest, Sha256};
use sign_crypto::SigningCredential;
use sign_pdf::{find_signature_field, sign_revision, FieldPlacement, StampStyle};

use crate::error::SignError;
use crate::layout::FieldSpec;

/// Sign `input` with one revision per field spec, in order.
pub fn sign_document(
    input: &[u8],
    credential: &SigningCredential,
    specs: &[FieldSpec],
    style: &StampStyle,
) -> Result<Vec<u8>, SignError> {
    let mut current = input.to_vec();

    for spec in specs {
        let doc = Document::load_mem(&current)
            .map_err(|e| SignError::DocumentParse(e.to_string()))?;

        let existing = find_signature_field(&doc, &spec.name);
        let reuse = match (&existing, spec.reuse_existing) {
            (None, _) => None,
            (Some(field), true) if !field.signed => {
                tracing::info!(field = %spec.name, "reusing existing unsigned field");
                Some(field)
            }
            (Some(field), true) => {
                return Err(SignError::FieldConflict(format!(
                    "field '{}' is already signed",
                    field.name
                )));
            }
            (Some(_), false) => {
                return Err(SignError::FieldConflict(format!(
                    "field '{}' already exists",
                    spec.name
                )));
            }
        };

        let placement = FieldPlacement {
            name: &spec.name,
            rect: spec.rect,
        };
        current = sign_revision(
            &current,
            &doc,
            &placement,
            reuse,
            credential,
            style,
            Utc::now(),
        )?;
        tracing::info!(
            field = %spec.name,
            created = reuse.is_none(),
            size = current.len(),
            "applied signature"
        );
    }

    tracing::info!(
        fields = specs.len(),
        sha256 = %hex::encode(Sha256::digest(&current)),
        "document signed"
    );
    Ok(current)
}
