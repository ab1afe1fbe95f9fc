//! Canonical Signing Subsystem - HMAC-SHA256 over Canonical Payloads
//!
//! Provides deterministic, reproducible authenticity markers for issued
//! documents. Same payload and key always yield the same marker.

use chrono::NaiveDate;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::record::ApplicantRecord;
use crate::variants::DocumentType;

type HmacSha256 = Hmac<Sha256>;

/// Separator between canonical payload components. Any component containing
/// it is rejected outright, which makes the field-tuple to byte-string
/// mapping one-to-one.
pub const FIELD_DELIMITER: char = '|';

#[derive(Debug, Error)]
pub enum SigningError {
    #[error("Signing key must not be empty")]
    EmptyKey,

    #[error("Field {field:?} contains the canonical delimiter {FIELD_DELIMITER:?}")]
    InvalidFieldValue { field: String },
}

/// Shared-secret signing key. Construction rejects empty material; there is
/// no default key anywhere in this crate.
#[derive(Clone)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    pub fn new(material: impl Into<Vec<u8>>) -> Result<Self, SigningError> {
        let bytes = material.into();
        if bytes.is_empty() {
            return Err(SigningError::EmptyKey);
        }
        Ok(Self(bytes))
    }

    /// Keyed deterministic digest of a canonical payload, as lowercase hex.
    pub fn sign(&self, payload: &CanonicalPayload) -> SignatureMarker {
        let mut mac =
            HmacSha256::new_from_slice(&self.0).expect("HMAC accepts keys of any length");
        mac.update(payload.as_bytes());
        SignatureMarker(hex::encode(mac.finalize().into_bytes()))
    }

    /// Recompute and compare in constant time. Malformed markers compare
    /// unequal rather than erroring.
    pub fn verify(&self, payload: &CanonicalPayload, marker: &SignatureMarker) -> bool {
        let Ok(expected) = hex::decode(marker.as_str()) else {
            return false;
        };
        let mut mac =
            HmacSha256::new_from_slice(&self.0).expect("HMAC accepts keys of any length");
        mac.update(payload.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material never appears in logs.
        f.write_str("SigningKey(..)")
    }
}

/// Order-stable byte form of the tamper-evident field subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalPayload(String);

impl CanonicalPayload {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// 64-hex-character HMAC-SHA256 digest of a canonical payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignatureMarker(String);

impl SignatureMarker {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SignatureMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build the canonical payload for a document.
///
/// The field subset is fixed and variant-independent:
/// `document_number | full_name | issued_at | type_token`. The full name is
/// resolved through the catalog's composition chain, so insertion order and
/// unrelated extra fields in the record cannot change the output.
pub fn canonicalize(
    document_number: &str,
    document_type: DocumentType,
    record: &ApplicantRecord,
    issued_at: NaiveDate,
) -> Result<CanonicalPayload, SigningError> {
    let full_name = record.full_name();
    reject_delimiter("documentNumber", document_number)?;
    reject_delimiter("fullName", &full_name)?;

    Ok(CanonicalPayload(format!(
        "{}{d}{}{d}{}{d}{}",
        document_number,
        full_name,
        issued_at.format("%Y-%m-%d"),
        document_type.token(),
        d = FIELD_DELIMITER,
    )))
}

fn reject_delimiter(field: &str, value: &str) -> Result<(), SigningError> {
    if value.contains(FIELD_DELIMITER) {
        return Err(SigningError::InvalidFieldValue {
            field: field.to_string(),
        });
    }
    Ok(())
}
