//! Record Validation - Rule/Policy Separation
//!
//! Rules produce structured violations.
//! Policy maps violations to a verdict.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::record::ApplicantRecord;
use crate::variants::{DisplayFormat, FieldKind, VariantSpec};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub rule: String,
    pub field: String,
    pub severity: ViolationSeverity,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<ValidationViolation>,
    pub document_type: crate::variants::DocumentType,
}

impl ValidationResult {
    pub fn has_errors(&self) -> bool {
        self.violations
            .iter()
            .any(|v| v.severity == ViolationSeverity::Error)
    }

    /// Offending fields, for the `MissingRequiredField`-style error surface.
    pub fn error_fields(&self) -> Vec<String> {
        self.violations
            .iter()
            .filter(|v| v.severity == ViolationSeverity::Error)
            .map(|v| format!("{}: {}", v.field, v.message))
            .collect()
    }
}

/// Validation rule trait - produces violations
pub trait ValidationRule {
    fn name(&self) -> &'static str;
    fn check(&self, record: &ApplicantRecord, variant: &VariantSpec) -> Vec<ValidationViolation>;
}

// --- Concrete Rules ---

/// Every required field must be present and non-empty. A field with the
/// `FullName` format is satisfied by any branch of the composition chain.
pub struct RequiredFieldsRule;

impl ValidationRule for RequiredFieldsRule {
    fn name(&self) -> &'static str {
        "required_fields"
    }

    fn check(&self, record: &ApplicantRecord, variant: &VariantSpec) -> Vec<ValidationViolation> {
        let mut violations = vec![];

        for field in variant.fields.iter().filter(|f| f.required) {
            let present = match field.format {
                DisplayFormat::FullName => record.resolve_full_name().is_some(),
                _ => record.contains(&field.name),
            };
            if !present {
                violations.push(ValidationViolation {
                    rule: self.name().to_string(),
                    field: field.name.clone(),
                    severity: ViolationSeverity::Error,
                    message: "required field is missing".to_string(),
                });
            }
        }

        violations
    }
}

/// Gender-kind fields must be one of M / F / X.
pub struct GenderDomainRule;

impl ValidationRule for GenderDomainRule {
    fn name(&self) -> &'static str {
        "gender_domain"
    }

    fn check(&self, record: &ApplicantRecord, variant: &VariantSpec) -> Vec<ValidationViolation> {
        let mut violations = vec![];

        for field in variant
            .fields
            .iter()
            .filter(|f| f.kind == FieldKind::Gender)
        {
            if let Some(value) = record.get(&field.name) {
                if !matches!(value, "M" | "F" | "X") {
                    violations.push(ValidationViolation {
                        rule: self.name().to_string(),
                        field: field.name.clone(),
                        severity: ViolationSeverity::Error,
                        message: format!("expected one of M, F, X; got {:?}", value),
                    });
                }
            }
        }

        violations
    }
}

/// Date-kind fields must parse as YYYY-MM-DD. A malformed date on an
/// optional field is recorded but does not block issuance.
pub struct DateFormatRule;

impl ValidationRule for DateFormatRule {
    fn name(&self) -> &'static str {
        "date_format"
    }

    fn check(&self, record: &ApplicantRecord, variant: &VariantSpec) -> Vec<ValidationViolation> {
        let mut violations = vec![];

        for field in variant.fields.iter().filter(|f| f.kind == FieldKind::Date) {
            if let Some(value) = record.get(&field.name) {
                if NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err() {
                    violations.push(ValidationViolation {
                        rule: self.name().to_string(),
                        field: field.name.clone(),
                        severity: if field.required {
                            ViolationSeverity::Error
                        } else {
                            ViolationSeverity::Warning
                        },
                        message: format!("expected YYYY-MM-DD; got {:?}", value),
                    });
                }
            }
        }

        violations
    }
}

/// Validator orchestrates rules and applies the verdict policy: any
/// error-severity violation fails the record, warnings never do.
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(RequiredFieldsRule),
                Box::new(GenderDomainRule),
                Box::new(DateFormatRule),
            ],
        }
    }

    pub fn validate(&self, record: &ApplicantRecord, variant: &VariantSpec) -> ValidationResult {
        let mut violations = vec![];
        for rule in &self.rules {
            violations.extend(rule.check(record, variant));
        }

        let has_errors = violations
            .iter()
            .any(|v| v.severity == ViolationSeverity::Error);

        ValidationResult {
            valid: !has_errors,
            violations,
            document_type: variant.document_type,
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}
