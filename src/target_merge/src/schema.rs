//! Canonical target schema: the fixed, ordered set of fields every input is
//! reconciled to, each with the header labels known to mean it.
//!
//! Key behaviors:
//! - Canonical names are normalized (trimmed, lowercased) on construction.
//! - The canonical name is always registered as the first synonym of itself.
//! - `name`, `ra` and `dec` are mandatory; a schema without them is rejected.
//! - The provenance columns ([`SOURCE_FILE`], [`UPDATED_AT`]) are reserved and
//!   cannot be declared as canonical fields.
//!
//! Synonym *collisions* between fields are allowed here; they are resolved
//! (first registration wins) when the lookup is built, see
//! [`crate::lookup::build_lookup`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::lookup::normalize_label;

/// Target identity column.
pub const NAME: &str = "name";
/// Right ascension column.
pub const RA: &str = "ra";
/// Declination column.
pub const DEC: &str = "dec";
/// Generic magnitude column, synthesized as missing when absent from an input.
pub const MAGNITUDE: &str = "magnitude";
/// Provenance: label of the file a row was merged from.
pub const SOURCE_FILE: &str = "source_file";
/// Provenance: UTC timestamp of the merge that added a row.
pub const UPDATED_AT: &str = "updated_at";

/// Fields every standardized input must resolve.
pub const REQUIRED_FIELDS: [&str; 3] = [NAME, RA, DEC];
/// Columns appended by the merger, never read from input.
pub const PROVENANCE_FIELDS: [&str; 2] = [SOURCE_FILE, UPDATED_AT];

/// Declarative form of one canonical field, as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    /// Canonical column name (e.g. "ra").
    pub canonical: String,
    /// Alternate header labels, matched case- and whitespace-insensitively.
    #[serde(default)]
    pub synonyms: Vec<String>,
}

impl FieldSpec {
    /// Convenience constructor used by the built-in schema and tests.
    pub fn new(canonical: &str, synonyms: &[&str]) -> Self {
        Self {
            canonical: canonical.to_string(),
            synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// One validated canonical field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalField {
    name: String,
    synonyms: Vec<String>,
}

impl CanonicalField {
    /// Normalized canonical name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw synonym labels in declaration order, starting with the canonical name.
    pub fn synonyms(&self) -> &[String] {
        &self.synonyms
    }
}

/// Ordered list of canonical fields with their synonyms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalSchema {
    fields: Vec<CanonicalField>,
}

impl CanonicalSchema {
    /// Validate and build a schema from declarative field specs.
    ///
    /// Errors:
    /// - empty canonical name after normalization
    /// - the same canonical name declared twice
    /// - a canonical name equal to a provenance column
    /// - a required field (`name`, `ra`, `dec`) not declared
    pub fn from_specs(specs: impl IntoIterator<Item = FieldSpec>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut fields = Vec::new();

        for spec in specs {
            let name = normalize_label(&spec.canonical);
            if name.is_empty() {
                return Err(Error::Schema(
                    "canonical field name cannot be empty after trimming".into(),
                ));
            }
            if PROVENANCE_FIELDS.contains(&name.as_str()) {
                return Err(Error::Schema(format!(
                    "'{name}' is a reserved provenance column"
                )));
            }
            if !seen.insert(name.clone()) {
                return Err(Error::Schema(format!(
                    "canonical field '{name}' declared more than once"
                )));
            }

            let mut synonyms = Vec::with_capacity(spec.synonyms.len() + 1);
            synonyms.push(name.clone());
            synonyms.extend(
                spec.synonyms
                    .into_iter()
                    .filter(|s| !normalize_label(s).is_empty()),
            );
            fields.push(CanonicalField { name, synonyms });
        }

        let missing: Vec<&str> = REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|req| !seen.contains(*req))
            .collect();
        if !missing.is_empty() {
            return Err(Error::Schema(format!(
                "required field(s) not declared: {}",
                missing.join(", ")
            )));
        }

        Ok(Self { fields })
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[CanonicalField] {
        &self.fields
    }

    /// Canonical names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// True if `name` (already normalized) is a canonical field.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }
}

/// Built-in field table for common target-list headers.
pub fn default_specs() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new(NAME, &["ID", "Name", "Target Name", "target", "object"]),
        FieldSpec::new(RA, &["RA", "Ra", "Right Ascension", "right ascencion", "RAJ2000"]),
        FieldSpec::new(DEC, &["DEC", "Dec", "Declination", "DEJ2000"]),
        FieldSpec::new(MAGNITUDE, &["Mag", "Magnitude", "brightness"]),
        FieldSpec::new("v_mag", &["V", "vmag", "V_mag", "v_band", "visual"]),
        FieldSpec::new("b_mag", &["B", "bmag", "B_mag", "b_band", "blue"]),
        FieldSpec::new("r_mag", &["R", "rmag", "R_mag", "r_band", "red"]),
        FieldSpec::new("g_mag", &["G", "gmag", "G_mag", "g_band", "green"]),
        FieldSpec::new("i_mag", &["I", "imag", "I_mag", "i_band", "infrared"]),
    ]
}

impl Default for CanonicalSchema {
    fn default() -> Self {
        Self {
            fields: default_specs()
                .into_iter()
                .map(|spec| {
                    let name = spec.canonical;
                    let mut synonyms = vec![name.clone()];
                    synonyms.extend(spec.synonyms);
                    CanonicalField { name, synonyms }
                })
                .collect(),
        }
    }
}
