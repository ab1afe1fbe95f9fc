//! Contract Invariant Tests
//!
//! These tests verify the non-negotiable guarantees.

use chrono::NaiveDate;
use std::sync::Arc;

use veristamp_core::layout::{generic_row_capacity, DrawInstruction, StyleRef};
use veristamp_core::render::{
    InstructionListRenderer, NumberAllocator, PageRenderer, PageSize, PlaceholderSymbolEncoder,
    RenderError, SequentialNumberAllocator,
};
use veristamp_core::{
    canonicalize, ApplicantRecord, DocumentType, EngineConfig, InMemoryRecordStore, InvalidReason,
    RecordStore, SignatureMarker, SigningKey, SynthesisError, SynthesisPipeline,
    SynthesisRequest, VariantCatalog, VerificationResponder,
};

fn test_config() -> EngineConfig {
    EngineConfig::new(
        SigningKey::new(b"integration-test-key".to_vec()).unwrap(),
        "https://verify.gov.example",
    )
}

fn issued_at() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

fn birth_certificate_applicant() -> ApplicantRecord {
    ApplicantRecord::from_pairs([
        ("surname", "Dlamini"),
        ("forename", "Thabo"),
        ("dateOfBirth", "2020-01-01"),
        ("identityNumber", "2001015800089"),
    ])
}

fn pipeline_with_store(store: Arc<InMemoryRecordStore>) -> SynthesisPipeline {
    SynthesisPipeline::new(
        test_config(),
        VariantCatalog::builtin(),
        store,
        Arc::new(SequentialNumberAllocator::new(2025)),
        Arc::new(PlaceholderSymbolEncoder),
        Arc::new(InstructionListRenderer),
    )
}

/// Allocator that hands out the same number forever, to force collisions.
struct FixedAllocator(&'static str);

impl NumberAllocator for FixedAllocator {
    fn allocate(&self, _document_type: DocumentType) -> String {
        self.0.to_string()
    }
}

struct FailingRenderer;

impl PageRenderer for FailingRenderer {
    fn render(
        &self,
        _instructions: &[DrawInstruction],
        _page: PageSize,
    ) -> Result<Vec<u8>, RenderError> {
        Err(RenderError::Failed("out of toner".to_string()))
    }
}

#[test]
fn invariant_canonicalization_ignores_insertion_order_and_extras() {
    let ordered = ApplicantRecord::from_pairs([
        ("forename", "Thabo"),
        ("surname", "Dlamini"),
    ]);
    let shuffled = ApplicantRecord::from_pairs([
        ("surname", "Dlamini"),
        ("zzUnrelated", "extra data"),
        ("forename", "Thabo"),
        ("nationality", "South African"),
    ]);

    let a = canonicalize("BC/2025/00001", DocumentType::BirthCertificate, &ordered, issued_at())
        .unwrap();
    let b = canonicalize("BC/2025/00001", DocumentType::BirthCertificate, &shuffled, issued_at())
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn invariant_round_trip_verification() {
    let pipeline = pipeline_with_store(Arc::new(InMemoryRecordStore::new()));
    let request = SynthesisRequest {
        document_type: "birth-certificate".to_string(),
        applicant: birth_certificate_applicant(),
        issued_at: issued_at(),
    };

    let issued = pipeline.synthesize(&request).unwrap();
    let verdict = pipeline.responder().verify_by_number(&issued.document_number);

    assert!(verdict.is_valid());
    assert_eq!(
        verdict.record.unwrap().document_number,
        issued.document_number
    );
}

#[test]
fn invariant_tamper_detection() {
    let store = Arc::new(InMemoryRecordStore::new());
    let pipeline = pipeline_with_store(Arc::clone(&store));
    let request = SynthesisRequest {
        document_type: "birth-certificate".to_string(),
        applicant: birth_certificate_applicant(),
        issued_at: issued_at(),
    };
    let issued = pipeline.synthesize(&request).unwrap();

    // A store whose snapshot was altered after issuance, signature intact.
    let mut tampered = issued.record.clone();
    tampered.applicant.insert("surname", "Nkosi");
    let tampered_store = Arc::new(InMemoryRecordStore::new());
    tampered_store.put(tampered).unwrap();

    let responder = VerificationResponder::new(
        tampered_store,
        SigningKey::new(b"integration-test-key".to_vec()).unwrap(),
    );
    let verdict = responder.verify_by_number(&issued.document_number);

    assert!(!verdict.is_valid());
    assert_eq!(verdict.reason, Some(InvalidReason::SignatureMismatch));
}

#[test]
fn invariant_key_rotation_surfaces_as_mismatch() {
    let store = Arc::new(InMemoryRecordStore::new());
    let pipeline = pipeline_with_store(Arc::clone(&store));
    let request = SynthesisRequest {
        document_type: "work-visa".to_string(),
        applicant: ApplicantRecord::from_pairs([("name", "Thabo Dlamini")]),
        issued_at: issued_at(),
    };
    let issued = pipeline.synthesize(&request).unwrap();

    let rotated = VerificationResponder::new(
        store,
        SigningKey::new(b"rotated-key".to_vec()).unwrap(),
    );
    let verdict = rotated.verify_by_number(&issued.document_number);
    assert_eq!(verdict.reason, Some(InvalidReason::SignatureMismatch));
}

#[test]
fn invariant_revocation_is_distinguishable_and_nondestructive() {
    let store = Arc::new(InMemoryRecordStore::new());
    let pipeline = pipeline_with_store(Arc::clone(&store));
    let request = SynthesisRequest {
        document_type: "permanent-residence".to_string(),
        applicant: ApplicantRecord::from_pairs([
            ("surname", "Dlamini"),
            ("forename", "Thabo"),
            ("nationality", "South African"),
            ("dateOfBirth", "1990-06-15"),
        ]),
        issued_at: issued_at(),
    };
    let issued = pipeline.synthesize(&request).unwrap();

    let responder = pipeline.responder();
    responder.revoke(&issued.document_number).unwrap();

    let verdict = responder.verify_by_number(&issued.document_number);
    assert!(!verdict.is_valid());
    assert_eq!(verdict.reason, Some(InvalidReason::Revoked));

    // Revocation is not deletion.
    assert!(store.get(&issued.document_number).is_ok());
}

#[test]
fn invariant_unknown_number_is_not_found() {
    let pipeline = pipeline_with_store(Arc::new(InMemoryRecordStore::new()));
    let verdict = pipeline.responder().verify_by_number("BC/2025/99999");
    assert_eq!(verdict.reason, Some(InvalidReason::NotFound));
}

#[test]
fn invariant_duplicate_number_rejected_and_first_record_kept() {
    let store = Arc::new(InMemoryRecordStore::new());
    let pipeline = SynthesisPipeline::new(
        test_config(),
        VariantCatalog::builtin(),
        Arc::clone(&store) as Arc<dyn RecordStore>,
        Arc::new(FixedAllocator("BC/2025/77777")),
        Arc::new(PlaceholderSymbolEncoder),
        Arc::new(InstructionListRenderer),
    );

    let first = SynthesisRequest {
        document_type: "birth-certificate".to_string(),
        applicant: birth_certificate_applicant(),
        issued_at: issued_at(),
    };
    pipeline.synthesize(&first).unwrap();

    let mut second_applicant = birth_certificate_applicant();
    second_applicant.insert("surname", "Nkosi");
    let second = SynthesisRequest {
        document_type: "birth-certificate".to_string(),
        applicant: second_applicant,
        issued_at: issued_at(),
    };

    let err = pipeline.synthesize(&second).unwrap_err();
    assert!(matches!(err, SynthesisError::DuplicateDocumentNumber(_)));

    let kept = store.get("BC/2025/77777").unwrap();
    assert_eq!(kept.applicant.get("surname"), Some("Dlamini"));
    assert_eq!(store.len(), 1);
}

#[test]
fn invariant_no_store_writes_on_failure() {
    let store = Arc::new(InMemoryRecordStore::new());
    let pipeline = SynthesisPipeline::new(
        test_config(),
        VariantCatalog::builtin(),
        Arc::clone(&store) as Arc<dyn RecordStore>,
        Arc::new(SequentialNumberAllocator::new(2025)),
        Arc::new(PlaceholderSymbolEncoder),
        Arc::new(FailingRenderer),
    );

    let request = SynthesisRequest {
        document_type: "birth-certificate".to_string(),
        applicant: birth_certificate_applicant(),
        issued_at: issued_at(),
    };

    let err = pipeline.synthesize(&request).unwrap_err();
    assert!(matches!(err, SynthesisError::Render(_)));
    assert!(store.is_empty());

    // Validation failures leave nothing behind either.
    let invalid = SynthesisRequest {
        document_type: "birth-certificate".to_string(),
        applicant: ApplicantRecord::from_pairs([("surname", "Dlamini")]),
        issued_at: issued_at(),
    };
    let err = pipeline.synthesize(&invalid).unwrap_err();
    assert!(matches!(err, SynthesisError::Validation(_)));
    assert!(store.is_empty());
}

#[test]
fn invariant_validation_error_names_offending_fields() {
    let pipeline = pipeline_with_store(Arc::new(InMemoryRecordStore::new()));
    let request = SynthesisRequest {
        document_type: "birth-certificate".to_string(),
        applicant: ApplicantRecord::from_pairs([("surname", "Dlamini")]),
        issued_at: issued_at(),
    };

    match pipeline.synthesize(&request).unwrap_err() {
        SynthesisError::Validation(fields) => {
            assert!(fields.iter().any(|f| f.starts_with("forename")));
            assert!(fields.iter().any(|f| f.starts_with("identityNumber")));
        }
        other => panic!("expected validation error, got {other}"),
    }
}

#[test]
fn invariant_unrecognized_type_uses_generic_variant() {
    let pipeline = pipeline_with_store(Arc::new(InMemoryRecordStore::new()));
    let request = SynthesisRequest {
        document_type: "Asylum Transit Visa".to_string(),
        applicant: ApplicantRecord::from_pairs([
            ("fullName", "Thabo Dlamini"),
            ("nationality", "South African"),
        ]),
        issued_at: issued_at(),
    };

    let issued = pipeline.synthesize(&request).unwrap();
    assert_eq!(issued.document_type, DocumentType::Generic);
    assert!(issued.document_number.starts_with("DOC/2025/"));
    assert!(pipeline
        .responder()
        .verify_by_number(&issued.document_number)
        .is_valid());
}

#[test]
fn invariant_generic_layout_caps_rows_at_page_capacity() {
    let catalog = VariantCatalog::builtin();
    let variant = catalog.resolve(DocumentType::Generic).unwrap();
    let key = SigningKey::new(b"integration-test-key".to_vec()).unwrap();

    let row_count = |field_count: usize| -> usize {
        let mut record = ApplicantRecord::new();
        for i in 0..field_count {
            record.insert(format!("field{:03}", i), "value");
        }
        let payload =
            canonicalize("DOC/2025/00001", DocumentType::Generic, &record, issued_at()).unwrap();
        let signature: SignatureMarker = key.sign(&payload);
        veristamp_core::layout(variant, &record, &signature, "https://verify/ref")
            .iter()
            .filter(|i| matches!(i, DrawInstruction::PlaceText { style: StyleRef::Label, .. }))
            .count()
    };

    let capacity = generic_row_capacity();
    assert_eq!(row_count(5), 5);
    assert_eq!(row_count(capacity), capacity);
    // Overflow fields are dropped, never a failure.
    assert_eq!(row_count(capacity + 20), capacity);
}

#[test]
fn invariant_end_to_end_birth_certificate() {
    let pipeline = pipeline_with_store(Arc::new(InMemoryRecordStore::new()));
    let request = SynthesisRequest {
        document_type: "birth-certificate".to_string(),
        applicant: birth_certificate_applicant(),
        issued_at: issued_at(),
    };

    let issued = pipeline.synthesize(&request).unwrap();

    assert_eq!(issued.document_type, DocumentType::BirthCertificate);
    assert_eq!(issued.signature.as_str().len(), 64);
    assert!(issued
        .signature
        .as_str()
        .chars()
        .all(|c| c.is_ascii_hexdigit()));
    assert!(issued
        .verification_url
        .ends_with(&format!("verify?ref={}", issued.document_number)));
    assert!(issued.instruction_count > 0);
    assert!(!issued.artifact_base64.is_empty());
    assert!(!issued.symbol_base64.is_empty());

    let verdict = pipeline.responder().verify_by_number(&issued.document_number);
    assert!(verdict.is_valid());
}

#[test]
fn invariant_synthesis_is_signature_deterministic() {
    // Two pipelines with the same key and allocator state issue the same
    // signature for the same request.
    let make_issued = || {
        let pipeline = pipeline_with_store(Arc::new(InMemoryRecordStore::new()));
        pipeline
            .synthesize(&SynthesisRequest {
                document_type: "birth-certificate".to_string(),
                applicant: birth_certificate_applicant(),
                issued_at: issued_at(),
            })
            .unwrap()
    };

    let a = make_issued();
    let b = make_issued();
    assert_eq!(a.document_number, b.document_number);
    assert_eq!(a.signature, b.signature);
}
