//! Environment variable access with structured errors.

use std::{env::VarError, path::PathBuf};

use thiserror::Error;

/// Errors raised while reading process environment variables.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvError {
    /// An environment variable required by the application is not set.
    #[error("Missing environment variable: {0}")]
    Missing(String),

    /// The variable is set but its value is not valid unicode.
    #[error("Environment variable {0} is not valid unicode")]
    NotUnicode(String),
}

/// Reads an environment variable, returning a structured error if it's missing.
///
/// This is a thin wrapper around `std::env::var` that provides a more
/// ergonomic and specific error type for missing variables.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn get_env_var(name: &str) -> Result<String, EnvError> {
    get_env_var_opt(name)?.ok_or_else(|| EnvError::Missing(name.to_string()))
}

/// Reads an optional environment variable.
///
/// Unset and blank (whitespace-only) values both yield `Ok(None)`; the value is
/// returned trimmed otherwise.
pub fn get_env_var_opt(name: &str) -> Result<Option<String>, EnvError> {
    match std::env::var(name) {
        Ok(v) if v.trim().is_empty() => Ok(None),
        Ok(v) => Ok(Some(v.trim().to_string())),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(EnvError::NotUnicode(name.to_string())),
    }
}

/// Reads an optional environment variable holding a filesystem path.
pub fn get_env_path(name: &str) -> Result<Option<PathBuf>, EnvError> {
    Ok(get_env_var_opt(name)?.map(PathBuf::from))
}
