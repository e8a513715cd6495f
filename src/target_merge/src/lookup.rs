//! Header standardization: raw column label → canonical field name.
//!
//! [`build_lookup`] walks a [`CanonicalSchema`] in declaration order and
//! registers every synonym under its normalized form (trimmed, lowercased).
//! Matching is exact on the normalized label; there is no fuzzy or substring
//! matching.
//!
//! Resolution rules:
//! - A label claimed by two canonical fields stays with the first one; the
//!   collision is kept as a [`HeaderConflict`] and logged as a warning.
//! - Overrides are applied after all synonyms and always win, each one kept as
//!   an [`AppliedOverride`] recording what it replaced.
//! - Labels that are not registered are absent; [`HeaderLookup::resolve`]
//!   falls back to the normalized label itself.
//!
//! The lookup is an immutable value; rebuilding it from the same inputs yields
//! an equal lookup.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::{Error, Result};
use crate::schema::CanonicalSchema;

/// Override table: raw label → canonical name. Both sides are normalized.
pub type Overrides = IndexMap<String, String>;

/// Normalize a header label for lookup: trim surrounding whitespace, lowercase.
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

/// A synonym that two canonical fields both claimed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderConflict {
    /// Normalized label in dispute.
    pub label: String,
    /// Canonical field that registered the label first and keeps it.
    pub kept: String,
    /// Canonical field whose registration was refused.
    pub rejected: String,
}

/// An override entry that was applied to the lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedOverride {
    /// Normalized raw label.
    pub label: String,
    /// Canonical name the label now resolves to.
    pub canonical: String,
    /// Canonical name the label resolved to before the override, if any.
    pub replaced: Option<String>,
}

/// Immutable mapping from normalized header label to canonical field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeaderLookup {
    entries: IndexMap<String, String>,
    conflicts: Vec<HeaderConflict>,
    overrides: Vec<AppliedOverride>,
}

impl HeaderLookup {
    /// Canonical name for `label`, or `None` if the label is unknown.
    ///
    /// `label` is normalized before matching, so raw headers can be passed as-is.
    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries.get(&normalize_label(label)).map(String::as_str)
    }

    /// Canonical name for `label`, falling back to the normalized label.
    pub fn resolve(&self, label: &str) -> String {
        let key = normalize_label(label);
        match self.entries.get(&key) {
            Some(canonical) => canonical.clone(),
            None => key,
        }
    }

    /// Registered `(normalized label, canonical)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of registered labels.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no label is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Synonym collisions detected while building, in detection order.
    pub fn conflicts(&self) -> &[HeaderConflict] {
        &self.conflicts
    }

    /// Overrides applied on top of the synonym table, in application order.
    pub fn overrides(&self) -> &[AppliedOverride] {
        &self.overrides
    }
}

/// Build the header lookup for `schema`, then apply `overrides`.
///
/// Errors:
/// - an override whose label or canonical name is empty after normalization
pub fn build_lookup(
    schema: &CanonicalSchema,
    overrides: Option<&Overrides>,
) -> Result<HeaderLookup> {
    let mut lookup = HeaderLookup::default();

    for field in schema.fields() {
        for raw in field.synonyms() {
            let label = normalize_label(raw);
            if label.is_empty() {
                continue;
            }
            match lookup.entries.get(&label) {
                None => {
                    lookup.entries.insert(label, field.name().to_string());
                }
                Some(existing) if existing == field.name() => {}
                Some(existing) => {
                    warn!(
                        label = %label,
                        kept = %existing,
                        rejected = %field.name(),
                        "header synonym claimed by two canonical fields; keeping first registration"
                    );
                    lookup.conflicts.push(HeaderConflict {
                        label,
                        kept: existing.clone(),
                        rejected: field.name().to_string(),
                    });
                }
            }
        }
    }

    for (raw_label, raw_canonical) in overrides.into_iter().flatten() {
        let label = normalize_label(raw_label);
        let canonical = normalize_label(raw_canonical);
        if label.is_empty() {
            return Err(Error::Schema(
                "override label cannot be empty after trimming".into(),
            ));
        }
        if canonical.is_empty() {
            return Err(Error::Schema(format!(
                "override for '{label}' has an empty canonical name"
            )));
        }
        if !schema.contains(&canonical) {
            warn!(
                label = %label,
                canonical = %canonical,
                "override targets a name outside the canonical schema; column will pass through"
            );
        }

        let replaced = lookup.entries.insert(label.clone(), canonical.clone());
        debug!(label = %label, canonical = %canonical, replaced = ?replaced, "override applied");
        lookup.overrides.push(AppliedOverride {
            label,
            canonical,
            replaced,
        });
    }

    Ok(lookup)
}
