//! Verification Responder - Lookup by Document Number
//!
//! Outcomes are structured verdicts, never errors: a caller can always
//! distinguish "never existed" from "existed but revoked" from "stored
//! fields no longer match the stored signature".

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::signing::{canonicalize, SigningKey};
use crate::store::{RecordStatus, RecordStore, StoreError, VerificationRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InvalidReason {
    NotFound,
    Revoked,
    /// Stored fields do not reproduce the stored marker: key rotation or
    /// data corruption. Surfaced distinctly from the other reasons.
    SignatureMismatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<VerificationRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<InvalidReason>,
}

impl Verdict {
    fn valid(record: VerificationRecord) -> Self {
        Self {
            valid: true,
            record: Some(record),
            reason: None,
        }
    }

    fn invalid(reason: InvalidReason) -> Self {
        Self {
            valid: false,
            record: None,
            reason: Some(reason),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

pub struct VerificationResponder {
    store: Arc<dyn RecordStore>,
    signing_key: SigningKey,
}

impl VerificationResponder {
    pub fn new(store: Arc<dyn RecordStore>, signing_key: SigningKey) -> Self {
        Self { store, signing_key }
    }

    /// Look up a document and recompute its authenticity judgment from the
    /// stored snapshot.
    pub fn verify_by_number(&self, document_number: &str) -> Verdict {
        let record = match self.store.get(document_number) {
            Ok(record) => record,
            Err(StoreError::NotFound(_)) => return Verdict::invalid(InvalidReason::NotFound),
            Err(_) => return Verdict::invalid(InvalidReason::NotFound),
        };

        if record.status == RecordStatus::Revoked {
            return Verdict::invalid(InvalidReason::Revoked);
        }

        // A snapshot that no longer canonicalizes is corrupted data; it
        // cannot match any signature.
        let payload = match canonicalize(
            &record.document_number,
            record.document_type,
            &record.applicant,
            record.issued_at,
        ) {
            Ok(payload) => payload,
            Err(_) => return Verdict::invalid(InvalidReason::SignatureMismatch),
        };

        if !self.signing_key.verify(&payload, &record.signature) {
            return Verdict::invalid(InvalidReason::SignatureMismatch);
        }

        info!(document_number = %document_number, "verification succeeded");
        Verdict::valid(record)
    }

    /// Administrative revocation. Revoked records stay retrievable.
    pub fn revoke(&self, document_number: &str) -> Result<(), StoreError> {
        self.store.revoke(document_number)
    }
}
