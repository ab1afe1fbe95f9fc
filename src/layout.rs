//! Layout Engine - Variant Bodies as Draw Instructions
//!
//! `layout` is a pure function: identical inputs always produce an
//! identical instruction sequence. No wall-clock reads happen here; the
//! only printed date fields are the ones carried by the record itself.

use serde::{Deserialize, Serialize};

use crate::record::ApplicantRecord;
use crate::signing::SignatureMarker;
use crate::variants::{DocumentType, VariantSpec};

/// A4 coordinate space in points, top-left origin.
pub const PAGE_WIDTH: f32 = 595.0;
pub const PAGE_HEIGHT: f32 = 842.0;
pub const MARGIN: f32 = 50.0;

/// Rows that would start below this line are silently dropped.
pub const BODY_LIMIT: f32 = 700.0;

pub const FOOTER_Y: f32 = 750.0;
pub const SIGNATURE_BLOCK_Y: f32 = 765.0;

const VALUE_X: f32 = 200.0;
const SYMBOL_EDGE: f32 = 80.0;
const SYMBOL_X: f32 = 450.0;

const GENERIC_BODY_TOP: f32 = 180.0;
const GENERIC_ROW_STEP: f32 = 20.0;

/// Number of field rows a generic-variant page can hold before overflow
/// rows are dropped.
pub fn generic_row_capacity() -> usize {
    ((BODY_LIMIT - GENERIC_BODY_TOP) / GENERIC_ROW_STEP) as usize + 1
}

/// Renderer-side style reference. Centered styles (title, banner, serif
/// title) are centered within the usable width by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StyleRef {
    HeaderBrand,
    HeaderSub,
    Title,
    Banner,
    Label,
    Value,
    Legal,
    Footnote,
    SerifTitle,
    SerifBody,
    SerifEmphasis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum DrawInstruction {
    PlaceText {
        x: f32,
        y: f32,
        text: String,
        style: StyleRef,
    },
    PlaceRule {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
    },
    PlaceImage {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        symbol_payload: String,
    },
    ReserveSignatureBlock {
        x: f32,
        y: f32,
        text: String,
    },
}

/// Vertical cursor shared by all variant bodies. Rows past the body limit
/// are dropped, never drawn.
struct Cursor {
    y: f32,
}

impl Cursor {
    fn new(y: f32) -> Self {
        Self { y }
    }

    fn in_body(&self) -> bool {
        self.y <= BODY_LIMIT
    }

    fn step(&mut self, dy: f32) {
        self.y += dy;
    }
}

/// Produce the full instruction sequence for one document page.
pub fn layout(
    variant: &VariantSpec,
    record: &ApplicantRecord,
    signature: &SignatureMarker,
    symbol_payload: &str,
) -> Vec<DrawInstruction> {
    let mut out = Vec::new();

    match variant.document_type {
        DocumentType::BirthCertificate => birth_certificate_body(&mut out, variant, record),
        DocumentType::Naturalization => naturalization_body(&mut out, variant, record),
        DocumentType::Generic => generic_body(&mut out, variant, record),
        _ => standard_permit_body(&mut out, variant, record),
    }

    let symbol_y = match variant.document_type {
        DocumentType::Generic => 650.0,
        DocumentType::Naturalization => 600.0,
        _ => 200.0,
    };
    out.push(DrawInstruction::PlaceImage {
        x: SYMBOL_X,
        y: symbol_y,
        width: SYMBOL_EDGE,
        height: SYMBOL_EDGE,
        symbol_payload: symbol_payload.to_string(),
    });

    out.push(text(
        MARGIN,
        FOOTER_Y,
        format!("Control Number: {}", record.get_or_na("documentNumber")),
        StyleRef::Footnote,
    ));
    out.push(DrawInstruction::ReserveSignatureBlock {
        x: MARGIN,
        y: SIGNATURE_BLOCK_Y,
        text: signature.as_str().to_string(),
    });

    out
}

fn text(x: f32, y: f32, text: impl Into<String>, style: StyleRef) -> DrawInstruction {
    DrawInstruction::PlaceText {
        x,
        y,
        text: text.into(),
        style,
    }
}

fn authority_header(out: &mut Vec<DrawInstruction>, title: &str) {
    out.push(text(MARGIN, 50.0, "home affairs", StyleRef::HeaderBrand));
    out.push(text(MARGIN, 72.0, "Department", StyleRef::HeaderSub));
    out.push(text(
        400.0,
        50.0,
        "REPUBLIC OF SOUTH AFRICA",
        StyleRef::HeaderSub,
    ));
    out.push(DrawInstruction::PlaceRule {
        x1: MARGIN,
        y1: 100.0,
        x2: PAGE_WIDTH - MARGIN,
        y2: 100.0,
    });
    out.push(text(MARGIN, 120.0, title, StyleRef::Title));
}

fn field_row(
    out: &mut Vec<DrawInstruction>,
    cursor: &mut Cursor,
    label_x: f32,
    label: &str,
    value: String,
    step: f32,
) {
    if cursor.in_body() {
        out.push(text(label_x, cursor.y, label, StyleRef::Label));
        out.push(text(VALUE_X, cursor.y, value, StyleRef::Value));
    }
    cursor.step(step);
}

fn conditions_block(out: &mut Vec<DrawInstruction>, cursor: &mut Cursor, conditions: &[String]) {
    if conditions.is_empty() {
        return;
    }
    if cursor.in_body() {
        out.push(text(MARGIN, cursor.y, "Conditions:", StyleRef::Label));
    }
    cursor.step(15.0);
    for condition in conditions {
        if cursor.in_body() {
            out.push(text(MARGIN, cursor.y, condition.clone(), StyleRef::Legal));
        }
        cursor.step(15.0);
    }
}

/// Shared body for permit-style variants: header, statute line, document
/// number rows, then the variant's linear field list and conditions.
fn standard_permit_body(
    out: &mut Vec<DrawInstruction>,
    variant: &VariantSpec,
    record: &ApplicantRecord,
) {
    authority_header(out, &variant.title);

    if let Some(statute) = &variant.statute_line {
        out.push(text(MARGIN, 150.0, statute.clone(), StyleRef::Legal));
    }

    let mut cursor = Cursor::new(175.0);
    field_row(
        out,
        &mut cursor,
        MARGIN,
        "PERMIT NUMBER",
        record.get_or_na("documentNumber").to_string(),
        18.0,
    );

    for field in &variant.fields {
        field_row(
            out,
            &mut cursor,
            MARGIN,
            &field.label,
            record.display(field),
            18.0,
        );
    }

    cursor.step(22.0);
    conditions_block(out, &mut cursor, &variant.conditions);
}

fn birth_certificate_body(
    out: &mut Vec<DrawInstruction>,
    variant: &VariantSpec,
    record: &ApplicantRecord,
) {
    authority_header(out, &variant.title);

    out.push(text(
        MARGIN,
        150.0,
        "IDENTITY NUMBER (birth/adoption)",
        StyleRef::Footnote,
    ));
    out.push(text(
        MARGIN,
        165.0,
        record.get_or_na("identityNumber").to_string(),
        StyleRef::Banner,
    ));

    let mut cursor = Cursor::new(200.0);
    if cursor.in_body() {
        out.push(text(MARGIN, cursor.y, "CHILD", StyleRef::Label));
    }
    cursor.step(20.0);

    for field in &variant.fields {
        field_row(
            out,
            &mut cursor,
            70.0,
            &field.label,
            record.display(field),
            20.0,
        );
    }

    cursor.step(20.0);
    if cursor.in_body() {
        out.push(text(
            MARGIN,
            cursor.y,
            "DIRECTOR GENERAL: HOME AFFAIRS",
            StyleRef::Footnote,
        ));
    }
    cursor.step(40.0);

    // Printed-date line comes from the record, never from the clock.
    if record.contains("datePrinted") {
        field_row(
            out,
            &mut cursor,
            MARGIN,
            "DATE PRINTED",
            record.get_or_na("datePrinted").to_string(),
            20.0,
        );
    }
}

fn naturalization_body(
    out: &mut Vec<DrawInstruction>,
    variant: &VariantSpec,
    record: &ApplicantRecord,
) {
    out.push(text(MARGIN, 100.0, variant.title.clone(), StyleRef::SerifTitle));
    out.push(text(
        MARGIN,
        130.0,
        "Republic of South Africa",
        StyleRef::SerifTitle,
    ));
    if let Some(statute) = &variant.statute_line {
        out.push(text(MARGIN, 160.0, statute.clone(), StyleRef::SerifEmphasis));
    }

    out.push(text(
        MARGIN,
        200.0,
        "In terms of the powers conferred on him by the South African Citizenship Act, 1995 \
         (Act 88 of 1995), the Minister of Home Affairs has been pleased to grant this \
         certificate to",
        StyleRef::SerifBody,
    ));

    out.push(text(MARGIN, 280.0, record.full_name(), StyleRef::SerifTitle));

    out.push(text(
        MARGIN,
        340.0,
        "and to declare hereby that the holder of this certificate shall henceforth be a \
         South African citizen by naturalisation.",
        StyleRef::SerifBody,
    ));
    out.push(text(
        MARGIN,
        400.0,
        "By Order of the Minister",
        StyleRef::SerifEmphasis,
    ));

    out.push(text(MARGIN, 500.0, "PRETORIA", StyleRef::SerifBody));
    out.push(text(
        350.0,
        500.0,
        "Director-General: Home Affairs",
        StyleRef::SerifBody,
    ));

    out.push(text(
        MARGIN,
        530.0,
        format!("Certificate number: {}", record.get_or_na("documentNumber")),
        StyleRef::SerifBody,
    ));
    out.push(text(
        MARGIN,
        545.0,
        format!("Reference number: {}", record.get_or_na("referenceNumber")),
        StyleRef::SerifBody,
    ));
}

/// Fallback body: one row per record field in sorted key order, dropping
/// rows past page capacity.
fn generic_body(out: &mut Vec<DrawInstruction>, variant: &VariantSpec, record: &ApplicantRecord) {
    authority_header(out, &variant.title);

    let mut cursor = Cursor::new(GENERIC_BODY_TOP);
    for (key, value) in record.layout_fields() {
        field_row(
            out,
            &mut cursor,
            MARGIN,
            &format!("{}:", key.to_uppercase()),
            value.to_string(),
            GENERIC_ROW_STEP,
        );
    }
}
