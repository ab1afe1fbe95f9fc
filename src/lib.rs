//! VeriStamp Core - Document Synthesis & Authenticity Engine
//!
//! # The Five Laws (Non-Negotiable)
//! 1. Variants Are Contracts
//! 2. Canonical Bytes Are Truth
//! 3. Layout Is Deterministic
//! 4. One Record Per Number, Forever
//! 5. No Key, No Startup

pub mod config;
pub mod layout;
pub mod pipeline;
pub mod record;
pub mod render;
pub mod signing;
pub mod store;
pub mod validation;
pub mod variants;
pub mod verify;

pub use config::{ConfigError, EngineConfig};
pub use layout::{layout, DrawInstruction, StyleRef};
pub use pipeline::{IssuedDocument, SynthesisError, SynthesisPipeline, SynthesisRequest};
pub use record::{ApplicantRecord, NOT_AVAILABLE};
pub use render::{NumberAllocator, PageRenderer, PageSize, SymbolEncoder};
pub use signing::{canonicalize, CanonicalPayload, SignatureMarker, SigningError, SigningKey};
pub use store::{InMemoryRecordStore, RecordStatus, RecordStore, StoreError, VerificationRecord};
pub use validation::{ValidationResult, ValidationRule, ValidationViolation, Validator};
pub use variants::{DocumentType, FieldSpec, VariantCatalog, VariantSpec};
pub use verify::{InvalidReason, Verdict, VerificationResponder};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
