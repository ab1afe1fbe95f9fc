//! Verification Record Store - Durable Truth per Document Number
//!
//! Records are created exactly once at issuance, may transition
//! issued -> revoked, and are never otherwise mutated or deleted.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

use crate::record::ApplicantRecord;
use crate::signing::SignatureMarker;
use crate::variants::DocumentType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Issued,
    Revoked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRecord {
    pub document_number: String,
    pub document_type: DocumentType,
    pub applicant: ApplicantRecord,
    pub signature: SignatureMarker,
    pub issued_at: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub status: RecordStatus,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Duplicate document number: {0}")]
    DuplicateDocumentNumber(String),

    #[error("Document not found: {0}")]
    NotFound(String),
}

/// Persistence seam. The orchestrator writes, the responder reads; the
/// backing medium is pluggable.
pub trait RecordStore: Send + Sync {
    /// Compare-and-insert: an occupied document number is rejected, never
    /// overwritten.
    fn put(&self, record: VerificationRecord) -> Result<(), StoreError>;

    fn get(&self, document_number: &str) -> Result<VerificationRecord, StoreError>;

    /// Transition issued -> revoked. Revoked records remain retrievable;
    /// revoking twice is a no-op.
    fn revoke(&self, document_number: &str) -> Result<(), StoreError>;
}

/// Default backing store: a process-local map behind a single writer lock,
/// so racing puts on one number resolve to exactly one winner.
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<String, VerificationRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().expect("store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read-only expiry scan used by the external monitoring worker:
    /// document numbers whose `expiryDate` field falls inside the window.
    /// Records without a parseable expiry (including "Indefinite") are
    /// skipped.
    pub fn expiring_within(&self, today: NaiveDate, window_days: i64) -> Vec<String> {
        let records = self.records.read().expect("store lock poisoned");
        let horizon = today + Duration::days(window_days);
        let mut numbers: Vec<String> = records
            .values()
            .filter(|record| {
                record
                    .applicant
                    .get("expiryDate")
                    .and_then(|v| NaiveDate::parse_from_str(v, "%Y-%m-%d").ok())
                    .map_or(false, |expiry| expiry > today && expiry <= horizon)
            })
            .map(|record| record.document_number.clone())
            .collect();
        numbers.sort();
        numbers
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn put(&self, record: VerificationRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().expect("store lock poisoned");
        match records.entry(record.document_number.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateDocumentNumber(
                record.document_number,
            )),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    fn get(&self, document_number: &str) -> Result<VerificationRecord, StoreError> {
        self.records
            .read()
            .expect("store lock poisoned")
            .get(document_number)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(document_number.to_string()))
    }

    fn revoke(&self, document_number: &str) -> Result<(), StoreError> {
        let mut records = self.records.write().expect("store lock poisoned");
        match records.get_mut(document_number) {
            Some(record) => {
                record.status = RecordStatus::Revoked;
                Ok(())
            }
            None => Err(StoreError::NotFound(document_number.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(number: &str) -> VerificationRecord {
        let applicant = ApplicantRecord::from_pairs([("fullName", "Thabo Dlamini")]);
        let payload = crate::signing::canonicalize(
            number,
            DocumentType::Generic,
            &applicant,
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        )
        .unwrap();
        let signature = crate::signing::SigningKey::new(b"store-test-key".to_vec())
            .unwrap()
            .sign(&payload);

        VerificationRecord {
            document_number: number.to_string(),
            document_type: DocumentType::Generic,
            applicant,
            signature,
            issued_at: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            created_at: Utc::now(),
            status: RecordStatus::Issued,
        }
    }

    #[test]
    fn put_get_round_trip() {
        let store = InMemoryRecordStore::new();
        store.put(record("DOC/2025/00001")).unwrap();

        let fetched = store.get("DOC/2025/00001").unwrap();
        assert_eq!(fetched.status, RecordStatus::Issued);
    }

    #[test]
    fn duplicate_put_is_rejected_and_first_record_kept() {
        let store = InMemoryRecordStore::new();
        store.put(record("DOC/2025/00001")).unwrap();

        let mut second = record("DOC/2025/00001");
        second.applicant.insert("fullName", "Someone Else");

        let err = store.put(second).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateDocumentNumber(_)));

        let kept = store.get("DOC/2025/00001").unwrap();
        assert_eq!(kept.applicant.get("fullName"), Some("Thabo Dlamini"));
    }

    #[test]
    fn revoked_records_remain_retrievable() {
        let store = InMemoryRecordStore::new();
        store.put(record("DOC/2025/00001")).unwrap();

        store.revoke("DOC/2025/00001").unwrap();
        assert_eq!(
            store.get("DOC/2025/00001").unwrap().status,
            RecordStatus::Revoked
        );

        // Terminal state; a second revoke is a no-op.
        store.revoke("DOC/2025/00001").unwrap();
    }

    #[test]
    fn revoke_missing_record_is_not_found() {
        let store = InMemoryRecordStore::new();
        assert!(matches!(
            store.revoke("DOC/2025/99999"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn racing_puts_have_exactly_one_winner() {
        use std::sync::Arc;

        let store = Arc::new(InMemoryRecordStore::new());
        let mut handles = vec![];
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                store.put(record("DOC/2025/00042")).is_ok()
            }));
        }

        let wins: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();
        assert_eq!(wins, 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn expiry_scan_reads_only() {
        let store = InMemoryRecordStore::new();

        let mut soon = record("DOC/2025/00001");
        soon.applicant.insert("expiryDate", "2025-01-20");
        store.put(soon).unwrap();

        let mut later = record("DOC/2025/00002");
        later.applicant.insert("expiryDate", "2026-06-01");
        store.put(later).unwrap();

        let mut indefinite = record("DOC/2025/00003");
        indefinite.applicant.insert("expiryDate", "Indefinite");
        store.put(indefinite).unwrap();

        let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(store.expiring_within(today, 30), vec!["DOC/2025/00001"]);
        assert_eq!(store.len(), 3);
    }
}
