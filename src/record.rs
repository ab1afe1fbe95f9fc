//! Applicant Records - Deterministic Field Maps

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::variants::{DisplayFormat, FieldSpec};

/// Marker drawn (and canonicalized) for absent optional fields, so the
/// signed form and the printed form never diverge.
pub const NOT_AVAILABLE: &str = "N/A";

/// Keys that never appear as generic layout rows. The document number is
/// drawn by the control-number footer instead.
pub const BOOKKEEPING_KEYS: &[&str] = &["id", "type", "documentNumber"];

/// A per-request applicant field map. Backed by a `BTreeMap` so iteration
/// order is independent of insertion order. Treated as immutable once the
/// synthesis flow begins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicantRecord {
    fields: BTreeMap<String, String>,
}

impl ApplicantRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Builder-style insert used when the orchestrator derives fields.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str).filter(|v| !v.is_empty())
    }

    pub fn get_or_na(&self, name: &str) -> &str {
        self.get(name).unwrap_or(NOT_AVAILABLE)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Full-name composition chain: explicit `fullName`, then `name`, then
    /// first/last pairs. `None` only when no combination is present.
    pub fn resolve_full_name(&self) -> Option<String> {
        if let Some(full) = self.get("fullName") {
            return Some(full.to_string());
        }
        if let Some(name) = self.get("name") {
            return Some(name.to_string());
        }
        for (first_key, last_key) in [("firstName", "lastName"), ("forename", "surname")] {
            if let (Some(first), Some(last)) = (self.get(first_key), self.get(last_key)) {
                return Some(format!("{} {}", first, last));
            }
        }
        None
    }

    pub fn full_name(&self) -> String {
        self.resolve_full_name()
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    /// Derive the display string for a schema field. Pure: same record and
    /// spec always yield the same string.
    pub fn display(&self, field: &FieldSpec) -> String {
        match field.format {
            DisplayFormat::Plain | DisplayFormat::IsoDate => {
                self.get_or_na(&field.name).to_string()
            }
            DisplayFormat::Uppercase => self.get_or_na(&field.name).to_uppercase(),
            DisplayFormat::FullName => self.full_name(),
        }
    }

    /// All fields except bookkeeping keys, in sorted key order. Used by the
    /// generic layout body.
    pub fn layout_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .filter(|(k, _)| !BOOKKEEPING_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variants::{DisplayFormat, FieldKind, FieldSpec};

    #[test]
    fn full_name_prefers_explicit_field() {
        let record = ApplicantRecord::from_pairs([
            ("fullName", "Thabo Dlamini"),
            ("forename", "Ignored"),
            ("surname", "Also Ignored"),
        ]);
        assert_eq!(record.full_name(), "Thabo Dlamini");
    }

    #[test]
    fn full_name_composes_from_parts() {
        let record =
            ApplicantRecord::from_pairs([("forename", "Thabo"), ("surname", "Dlamini")]);
        assert_eq!(record.full_name(), "Thabo Dlamini");

        let record =
            ApplicantRecord::from_pairs([("firstName", "Thabo"), ("lastName", "Dlamini")]);
        assert_eq!(record.full_name(), "Thabo Dlamini");
    }

    #[test]
    fn full_name_falls_back_to_marker() {
        let record = ApplicantRecord::from_pairs([("nationality", "South African")]);
        assert_eq!(record.full_name(), NOT_AVAILABLE);
    }

    #[test]
    fn display_applies_uppercase() {
        let record = ApplicantRecord::from_pairs([("surname", "Dlamini")]);
        let spec = FieldSpec::required(
            "surname",
            "Surname",
            FieldKind::Text,
            DisplayFormat::Uppercase,
        );
        assert_eq!(record.display(&spec), "DLAMINI");
    }

    #[test]
    fn empty_values_read_as_absent() {
        let record = ApplicantRecord::from_pairs([("passport", "")]);
        assert_eq!(record.get("passport"), None);
        assert_eq!(record.get_or_na("passport"), NOT_AVAILABLE);
    }

    #[test]
    fn layout_fields_skip_bookkeeping_keys() {
        let record = ApplicantRecord::from_pairs([
            ("id", "7"),
            ("type", "work-visa"),
            ("surname", "Dlamini"),
        ]);
        let keys: Vec<_> = record.layout_fields().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["surname"]);
    }
}
