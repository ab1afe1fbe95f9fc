//! Synthesis Pipeline - Single Entry Point
//!
//! CRITICAL: synthesize MUST validate internally, and the store write is
//! the final step. Every failure path leaves zero records behind.

use base64::Engine as _;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::layout::{layout, DrawInstruction};
use crate::record::ApplicantRecord;
use crate::render::{
    EncodeError, InstructionListRenderer, NumberAllocator, PageRenderer, PageSize,
    PlaceholderSymbolEncoder, RenderError, SequentialNumberAllocator, SymbolEncoder,
};
use crate::signing::{canonicalize, SignatureMarker, SigningError, SigningKey};
use crate::store::{InMemoryRecordStore, RecordStatus, RecordStore, StoreError, VerificationRecord};
use crate::validation::Validator;
use crate::variants::{DocumentType, VariantCatalog};
use crate::verify::VerificationResponder;

/// Pixel edge requested from the symbol encoder.
pub const SYMBOL_PIXELS: u32 = 300;

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static STORE_WRITE_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_store_write_count() -> u32 {
    STORE_WRITE_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_store_write_count() {
    STORE_WRITE_COUNT.store(0, Ordering::SeqCst);
}

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Unknown document variant: {0}")]
    UnknownVariant(String),

    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error("Duplicate document number: {0}")]
    DuplicateDocumentNumber(String),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Store(StoreError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisRequest {
    pub document_type: String,
    pub applicant: ApplicantRecord,
    pub issued_at: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedDocument {
    pub artifact_id: Uuid,
    pub document_number: String,
    pub document_type: DocumentType,
    pub signature: SignatureMarker,
    pub verification_url: String,
    pub instruction_count: usize,
    pub artifact_base64: String,
    pub symbol_base64: String,
    pub record: VerificationRecord,
}

/// The synthesis pipeline - single entry point for document issuance.
pub struct SynthesisPipeline {
    catalog: VariantCatalog,
    validator: Validator,
    signing_key: SigningKey,
    verification_base_url: String,
    store: Arc<dyn RecordStore>,
    allocator: Arc<dyn NumberAllocator>,
    encoder: Arc<dyn SymbolEncoder>,
    renderer: Arc<dyn PageRenderer>,
}

impl SynthesisPipeline {
    pub fn new(
        config: EngineConfig,
        catalog: VariantCatalog,
        store: Arc<dyn RecordStore>,
        allocator: Arc<dyn NumberAllocator>,
        encoder: Arc<dyn SymbolEncoder>,
        renderer: Arc<dyn PageRenderer>,
    ) -> Self {
        Self {
            catalog,
            validator: Validator::new(),
            signing_key: config.signing_key,
            verification_base_url: config.verification_base_url,
            store,
            allocator,
            encoder,
            renderer,
        }
    }

    /// Convenience constructor wiring the in-memory store and placeholder
    /// collaborators. Used by the CLI and tests.
    pub fn with_defaults(config: EngineConfig, allocation_year: i32) -> Self {
        Self::new(
            config,
            VariantCatalog::builtin(),
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(SequentialNumberAllocator::new(allocation_year)),
            Arc::new(PlaceholderSymbolEncoder),
            Arc::new(InstructionListRenderer),
        )
    }

    pub fn catalog(&self) -> &VariantCatalog {
        &self.catalog
    }

    /// A responder sharing this pipeline's store and key.
    pub fn responder(&self) -> VerificationResponder {
        VerificationResponder::new(Arc::clone(&self.store), self.signing_key.clone())
    }

    /// Issue a document.
    ///
    /// Sequence: resolve variant -> validate -> allocate number ->
    /// canonicalize + sign -> encode verification symbol -> layout ->
    /// render -> persist. Exactly one store write on success, zero on any
    /// failure.
    pub fn synthesize(&self, request: &SynthesisRequest) -> Result<IssuedDocument, SynthesisError> {
        let document_type = DocumentType::from_label(&request.document_type);
        let variant = self
            .catalog
            .resolve(document_type)
            .map_err(|_| SynthesisError::UnknownVariant(request.document_type.clone()))?;

        // Working record: applicant data plus the derived issue date, so
        // the drawn form and the signed form cannot diverge.
        let mut record = request.applicant.clone();
        if !record.contains("issueDate") {
            record.insert("issueDate", request.issued_at.format("%Y-%m-%d").to_string());
        }

        let validation = self.validator.validate(&record, variant);
        if !validation.valid {
            let fields = validation.error_fields();
            warn!(document_type = %document_type, ?fields, "synthesis rejected by validation");
            return Err(SynthesisError::Validation(fields));
        }

        // The number exists before the symbol payload: the payload embeds it.
        let document_number = self.allocator.allocate(document_type);
        let record = record.with_field("documentNumber", document_number.clone());

        let payload = canonicalize(&document_number, document_type, &record, request.issued_at)?;
        let signature = self.signing_key.sign(&payload);

        let verification_url = format!(
            "{}/verify?ref={}",
            self.verification_base_url, document_number
        );
        let symbol = self.encoder.encode(&verification_url, SYMBOL_PIXELS)?;

        let instructions = layout(variant, &record, &signature, &verification_url);
        let artifact = self.renderer.render(&instructions, PageSize::A4)?;

        let verification_record = VerificationRecord {
            document_number: document_number.clone(),
            document_type,
            applicant: record,
            signature: signature.clone(),
            issued_at: request.issued_at,
            created_at: Utc::now(),
            status: RecordStatus::Issued,
        };

        self.store
            .put(verification_record.clone())
            .map_err(|e| match e {
                StoreError::DuplicateDocumentNumber(n) => {
                    SynthesisError::DuplicateDocumentNumber(n)
                }
                other => SynthesisError::Store(other),
            })?;

        #[cfg(feature = "test-hooks")]
        STORE_WRITE_COUNT.fetch_add(1, Ordering::SeqCst);

        info!(
            document_number = %document_number,
            document_type = %document_type,
            instructions = instructions.len(),
            "document issued"
        );

        Ok(IssuedDocument {
            artifact_id: Uuid::new_v4(),
            document_number,
            document_type,
            signature,
            verification_url,
            instruction_count: instructions.len(),
            artifact_base64: base64::engine::general_purpose::STANDARD.encode(&artifact),
            symbol_base64: base64::engine::general_purpose::STANDARD.encode(&symbol),
            record: verification_record,
        })
    }

    /// The instruction sequence a request would render, without touching
    /// the store. Useful for previews; shares the synthesize path's
    /// resolution and validation.
    pub fn preview(
        &self,
        request: &SynthesisRequest,
        document_number: &str,
    ) -> Result<Vec<DrawInstruction>, SynthesisError> {
        let document_type = DocumentType::from_label(&request.document_type);
        let variant = self
            .catalog
            .resolve(document_type)
            .map_err(|_| SynthesisError::UnknownVariant(request.document_type.clone()))?;

        let mut record = request.applicant.clone();
        if !record.contains("issueDate") {
            record.insert("issueDate", request.issued_at.format("%Y-%m-%d").to_string());
        }
        let validation = self.validator.validate(&record, variant);
        if !validation.valid {
            return Err(SynthesisError::Validation(validation.error_fields()));
        }
        let record = record.with_field("documentNumber", document_number.to_string());

        let payload = canonicalize(document_number, document_type, &record, request.issued_at)?;
        let signature = self.signing_key.sign(&payload);
        let verification_url = format!(
            "{}/verify?ref={}",
            self.verification_base_url, document_number
        );

        Ok(layout(variant, &record, &signature, &verification_url))
    }
}
