//! Async engine front-end
//!
//! The pipeline itself is synchronous and CPU-bound, so the engine
//! moves it off the calling task with `spawn_blocking` and bounds the
//! number of in-flight invocations with a semaphore. Each invocation
//! carries a fresh uuid through its tracing span; all credential and
//! document state is owned by the invocation and dropped with it.

use std::io;
use std::sync::Arc;

use sign_crypto::SigningCredential;
use sign_pdf::StampStyle;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::SignError;
use crate::layout::{layout, DateRangeMode, SignerRole};
use crate::pipeline;

/// Everything one signing invocation needs, owned.
#[derive(Debug)]
pub struct SignRequest {
    /// The current PDF revision.
    pub document: Vec<u8>,
    /// PKCS#12 bundle.
    pub bundle: Vec<u8>,
    pub password: String,
    /// Pre-processed stamp background image (PNG or JPEG).
    pub stamp_image: Vec<u8>,
    pub role: SignerRole,
    pub date_range: DateRangeMode,
}

pub struct Engine {
    semaphore: Arc<Semaphore>,
}

impl Engine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_signings)),
        }
    }

    /// Sign one document. Resolves once the full signed output exists;
    /// on failure nothing of the invocation survives.
    pub async fn sign(&self, request: SignRequest) -> Result<Vec<u8>, SignError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| SignError::Io(io::Error::new(io::ErrorKind::Other, e)))?;

        let invocation = Uuid::new_v4();
        let span = tracing::info_span!("sign", %invocation, role = %request.role);

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let _span = span.entered();
            run_invocation(request)
        });
        handle
            .await
            .map_err(|e| SignError::Io(io::Error::new(io::ErrorKind::Other, e)))?
    }
}

fn run_invocation(request: SignRequest) -> Result<Vec<u8>, SignError> {
    let credential = SigningCredential::from_pkcs12(&request.bundle, &request.password)?;
    tracing::info!(signer = %credential.signer_name(), "credential loaded");

    let specs = layout(request.role, request.date_range);
    let style = StampStyle::new(request.stamp_image);
    pipeline::sign_document(&request.document, &credential, &specs, &style)
}
