//! Variant Catalog - Document Schemas as Contracts

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Closed set of document types. Dispatch happens over this enum, never
/// over raw type strings; every unrecognized label maps to `Generic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentType {
    PermanentResidence,
    WorkVisa,
    RelativeVisa,
    BirthCertificate,
    Naturalization,
    RefugeeStatus,
    Generic,
}

impl DocumentType {
    /// Stable identifier used in canonical payloads and document numbers.
    pub fn token(&self) -> &'static str {
        match self {
            Self::PermanentResidence => "permanent-residence",
            Self::WorkVisa => "work-visa",
            Self::RelativeVisa => "relative-visa",
            Self::BirthCertificate => "birth-certificate",
            Self::Naturalization => "naturalization",
            Self::RefugeeStatus => "refugee-status",
            Self::Generic => "generic",
        }
    }

    /// Document number prefix for the default allocator.
    pub fn number_prefix(&self) -> &'static str {
        match self {
            Self::PermanentResidence => "PR",
            Self::WorkVisa => "GWV",
            Self::RelativeVisa => "RV",
            Self::BirthCertificate => "BC",
            Self::Naturalization => "NC",
            Self::RefugeeStatus => "RS",
            Self::Generic => "DOC",
        }
    }

    /// Lenient parse of caller-supplied type labels. Accepts both the
    /// canonical tokens and the legacy display names; anything else
    /// resolves to `Generic`.
    pub fn from_label(label: &str) -> Self {
        let normalized = label.trim().to_lowercase();
        match normalized.as_str() {
            "permanent-residence" | "permanent residence" => Self::PermanentResidence,
            "work-visa" | "general work visa" | "general work permit" | "work permit" => {
                Self::WorkVisa
            }
            "relative-visa" | "relative visa" | "relative's permit" | "relative's visa" => {
                Self::RelativeVisa
            }
            "birth-certificate" | "birth certificate" => Self::BirthCertificate,
            "naturalization" | "naturalization certificate" | "naturalisation certificate" => {
                Self::Naturalization
            }
            "refugee-status" | "refugee status (section 24)" | "refugee status" => {
                Self::RefugeeStatus
            }
            _ => Self::Generic,
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Date,
    Gender,
    FreeText,
}

/// How a field value is derived for display and canonicalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayFormat {
    Plain,
    Uppercase,
    IsoDate,
    /// Composed from fullName / name / firstName+lastName / forename+surname.
    FullName,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_format")]
    pub format: DisplayFormat,
}

fn default_format() -> DisplayFormat {
    DisplayFormat::Plain
}

impl FieldSpec {
    pub fn required(name: &str, label: &str, kind: FieldKind, format: DisplayFormat) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind,
            required: true,
            format,
        }
    }

    pub fn optional(name: &str, label: &str, kind: FieldKind, format: DisplayFormat) -> Self {
        Self {
            required: false,
            ..Self::required(name, label, kind, format)
        }
    }
}

/// A document variant: ordered field schema plus the fixed boilerplate the
/// layout engine draws around it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantSpec {
    pub document_type: DocumentType,
    pub title: String,
    #[serde(default)]
    pub statute_line: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub conditions: Vec<String>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Unknown document variant: {0} (no generic fallback configured)")]
    UnknownVariant(DocumentType),

    #[error("Failed to read variant definitions: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed variant definition in {path}: {source}")]
    Malformed {
        path: String,
        source: serde_json::Error,
    },
}

/// Variant catalog - resolves document types to their schemas.
///
/// Every properly constructed catalog carries the generic fallback, so
/// `resolve` cannot fail in practice; `UnknownVariant` exists for
/// hand-built catalogs that omit it.
pub struct VariantCatalog {
    variants: HashMap<DocumentType, VariantSpec>,
}

impl VariantCatalog {
    pub fn empty() -> Self {
        Self {
            variants: HashMap::new(),
        }
    }

    /// The built-in catalog: all specific variants plus the mandatory
    /// generic fallback.
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        for variant in builtin_variants() {
            catalog.register(variant);
        }
        catalog
    }

    pub fn register(&mut self, variant: VariantSpec) {
        self.variants.insert(variant.document_type, variant);
    }

    /// Merge JSON variant definitions over the current entries. A missing
    /// directory is not an error; unreadable files are skipped.
    pub fn load_from_dir(&mut self, dir: &Path) -> Result<(), CatalogError> {
        if !dir.exists() {
            return Ok(());
        }
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map_or(false, |e| e == "json") {
                let content = fs::read_to_string(&path)?;
                let variant: VariantSpec =
                    serde_json::from_str(&content).map_err(|source| CatalogError::Malformed {
                        path: path.display().to_string(),
                        source,
                    })?;
                self.register(variant);
            }
        }
        Ok(())
    }

    /// Resolve a type to its schema, falling back to the generic variant.
    pub fn resolve(&self, document_type: DocumentType) -> Result<&VariantSpec, CatalogError> {
        self.variants
            .get(&document_type)
            .or_else(|| self.variants.get(&DocumentType::Generic))
            .ok_or(CatalogError::UnknownVariant(document_type))
    }

    pub fn list(&self) -> Vec<&VariantSpec> {
        let mut all: Vec<_> = self.variants.values().collect();
        all.sort_by_key(|v| v.document_type.token());
        all
    }
}

impl Default for VariantCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_variants() -> Vec<VariantSpec> {
    use DisplayFormat::*;
    use FieldKind::*;

    vec![
        VariantSpec {
            document_type: DocumentType::PermanentResidence,
            title: "PERMANENT RESIDENCE PERMIT".to_string(),
            statute_line: Some("SECTIONS 26 AND 27 OF ACT NO 13 OF 2002".to_string()),
            fields: vec![
                FieldSpec::optional("referenceNumber", "REFERENCE NO", Text, Plain),
                FieldSpec::required("surname", "Surname", Text, Uppercase),
                FieldSpec::required("forename", "First Name(s)", Text, Uppercase),
                FieldSpec::required("nationality", "Nationality", Text, Uppercase),
                FieldSpec::required("dateOfBirth", "Date of Birth", Date, IsoDate),
                FieldSpec::optional("gender", "Gender", Gender, Plain),
                FieldSpec::optional("issueDate", "Date of Issue", Date, IsoDate),
                FieldSpec::optional("officerName", "Authorized by", Text, Plain),
            ],
            conditions: vec![
                "(i) This permit is issued once only and must be duly safeguarded.".to_string(),
                "(ii) Permanent residents who are absent from the Republic for three years \
                 or longer may forfeit their right to permanent residence in the Republic."
                    .to_string(),
            ],
        },
        VariantSpec {
            document_type: DocumentType::WorkVisa,
            title: "GENERAL WORK VISA SECTION 19(2)".to_string(),
            statute_line: None,
            fields: vec![
                FieldSpec::required("name", "Name", Text, FullName),
                FieldSpec::optional("passport", "Passport No", Text, Plain),
                FieldSpec::optional("entries", "No. of Entries", Text, Uppercase),
                FieldSpec::optional("issuedAt", "Issued at", Text, Uppercase),
                FieldSpec::optional("expiryDate", "VISA Expiry Date", Text, Plain),
                FieldSpec::optional("issueDate", "ON", Date, IsoDate),
            ],
            conditions: vec![
                "(1) To take up employment in the category mentioned above".to_string(),
                "(2) The above permit holder does not become a permanent resident".to_string(),
            ],
        },
        VariantSpec {
            document_type: DocumentType::RelativeVisa,
            title: "RELATIVE'S VISA (SPOUSE)".to_string(),
            statute_line: None,
            fields: vec![
                FieldSpec::required("name", "Name", Text, FullName),
                FieldSpec::optional("passport", "Passport No", Text, Plain),
                FieldSpec::optional("issueDate", "Valid From", Date, IsoDate),
                FieldSpec::optional("expiryDate", "VISA Expiry Date", Text, Plain),
            ],
            conditions: vec![
                "(1) To reside with SA citizen or PR holder: ID/PRP number: __________"
                    .to_string(),
                "(2) May not conduct work".to_string(),
                "(3) Subject to Reg. 3(7)".to_string(),
            ],
        },
        VariantSpec {
            document_type: DocumentType::BirthCertificate,
            title: "BIRTH CERTIFICATE".to_string(),
            statute_line: None,
            fields: vec![
                FieldSpec::required("surname", "SURNAME", Text, Plain),
                FieldSpec::required("forename", "FORENAME(S)", Text, Plain),
                FieldSpec::required("identityNumber", "IDENTITY NUMBER", Text, Plain),
                FieldSpec::optional("gender", "GENDER", Gender, Plain),
                FieldSpec::required("dateOfBirth", "DATE OF BIRTH", Date, IsoDate),
                FieldSpec::optional("placeOfBirth", "PLACE OF BIRTH", Text, Plain),
                FieldSpec::optional("countryOfBirth", "COUNTRY OF BIRTH", Text, Plain),
            ],
            conditions: vec![],
        },
        VariantSpec {
            document_type: DocumentType::Naturalization,
            title: "Certificate of Naturalisation".to_string(),
            statute_line: Some("(Section 5, South African Citizenship Act, 1995)".to_string()),
            fields: vec![
                FieldSpec::required("name", "Name", Text, FullName),
                FieldSpec::optional("referenceNumber", "Reference number", Text, Plain),
            ],
            conditions: vec![],
        },
        VariantSpec {
            document_type: DocumentType::RefugeeStatus,
            title: "FORMAL RECOGNITION OF REFUGEE STATUS IN THE RSA".to_string(),
            statute_line: Some(
                "PARTICULARS OF RECOGNISED REFUGEE IN THE RSA".to_string(),
            ),
            fields: vec![
                FieldSpec::required("name", "NAME AND SURNAME", Text, FullName),
                FieldSpec::required("nationality", "NATIONALITY", Text, Uppercase),
                FieldSpec::optional("education", "EDUCATION", Text, Plain),
                FieldSpec::optional("dateOfBirth", "DATE OF BIRTH", Date, IsoDate),
                FieldSpec::optional("countryOfBirth", "COUNTRY OF BIRTH", Text, Uppercase),
                FieldSpec::optional("fileNumber", "FILE NO", Text, Plain),
                FieldSpec::optional("issueDate", "DATE ISSUED", Date, IsoDate),
            ],
            conditions: vec![],
        },
        VariantSpec {
            document_type: DocumentType::Generic,
            title: "OFFICIAL DOCUMENT".to_string(),
            statute_line: None,
            fields: vec![],
            conditions: vec![],
        },
    ]
}
