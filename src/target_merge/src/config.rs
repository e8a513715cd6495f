//! Run configuration: parsing, defaults, and environment overrides.
//!
//! A configuration file is TOML:
//!
//! ```toml
//! master_path   = "merged_table.csv"
//! inbox_dir     = "inbox"
//! processed_dir = "processed"
//!
//! # Optional: replaces the built-in field table when present.
//! [[fields]]
//! canonical = "name"
//! synonyms  = ["ID", "Target Name"]
//!
//! # Optional: raw label -> canonical name, applied after the synonyms.
//! [overrides]
//! "Obj Id" = "name"
//! ```
//!
//! Relative paths are resolved against the directory holding the file. The
//! `TARGET_MERGE_MASTER` environment variable, when set, replaces
//! `master_path`.
//!
//! Entrypoints:
//! - Parse from a TOML string: [`load_config_str`]
//! - Parse from a file path: [`load_config_path`]
//! - Optional file plus environment: [`load_config`]

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::lookup::{HeaderLookup, Overrides, build_lookup};
use crate::schema::{CanonicalSchema, FieldSpec};

/// Environment variable overriding [`AppConfig::master_path`].
pub const MASTER_PATH_ENV: &str = "TARGET_MERGE_MASTER";

/// Everything a merge run needs to know.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Persisted master table.
    #[serde(default = "default_master_path")]
    pub master_path: PathBuf,
    /// Directory scanned by `ingest`.
    #[serde(default = "default_inbox_dir")]
    pub inbox_dir: PathBuf,
    /// Directory successfully merged files are moved to.
    #[serde(default = "default_processed_dir")]
    pub processed_dir: PathBuf,
    /// Canonical field table; empty means the built-in one.
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    /// Raw label → canonical name overrides.
    #[serde(default)]
    pub overrides: Overrides,
}

fn default_master_path() -> PathBuf {
    PathBuf::from("merged_table.csv")
}

fn default_inbox_dir() -> PathBuf {
    PathBuf::from("inbox")
}

fn default_processed_dir() -> PathBuf {
    PathBuf::from("processed")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            master_path: default_master_path(),
            inbox_dir: default_inbox_dir(),
            processed_dir: default_processed_dir(),
            fields: Vec::new(),
            overrides: Overrides::new(),
        }
    }
}

impl AppConfig {
    /// The configured schema, or the built-in one when no fields are declared.
    pub fn schema(&self) -> crate::Result<CanonicalSchema> {
        if self.fields.is_empty() {
            Ok(CanonicalSchema::default())
        } else {
            CanonicalSchema::from_specs(self.fields.iter().cloned())
        }
    }

    /// Build the schema and its header lookup with the configured overrides.
    pub fn schema_and_lookup(&self) -> crate::Result<(CanonicalSchema, HeaderLookup)> {
        let schema = self.schema()?;
        let overrides = (!self.overrides.is_empty()).then_some(&self.overrides);
        let lookup = build_lookup(&schema, overrides)?;
        Ok((schema, lookup))
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        for p in [
            &mut self.master_path,
            &mut self.inbox_dir,
            &mut self.processed_dir,
        ] {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        }
    }
}

/// Parse a configuration from a TOML string. Paths are kept as written.
pub fn load_config_str(toml_str: &str) -> anyhow::Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(toml_str).context("failed to parse config TOML")?;
    cfg.schema().context("invalid [[fields]] table")?;
    Ok(cfg)
}

/// Read a configuration file, resolving relative paths against its directory.
pub fn load_config_path(path: impl AsRef<Path>) -> anyhow::Result<AppConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config file {}", path.display()))?;
    let mut cfg =
        load_config_str(&text).with_context(|| format!("load config file {}", path.display()))?;
    if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        cfg.resolve_relative_to(base);
    }
    Ok(cfg)
}

/// Load `path` if given (defaults otherwise), then apply environment overrides.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let mut cfg = match path {
        Some(p) => load_config_path(p)?,
        None => AppConfig::default(),
    };
    if let Some(master) = shared_utils::env::get_env_path(MASTER_PATH_ENV)
        .with_context(|| format!("read {MASTER_PATH_ENV}"))?
    {
        info!(path = %master.display(), "master path overridden from environment");
        cfg.master_path = master;
    }
    Ok(cfg)
}
