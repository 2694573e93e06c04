//! # contract: interface to the rendering backend
//!
//! The structure document is the only thing handed to the renderer. While
//! building it, the synthesizer needs one service from the backend: turning
//! free text (file paths, labels) into the backend's markup. That service is
//! the [`Backend`] trait.
//!
//! ## Variants
//! - [`ReportBackend`] is the closed set of built-in backends, selected by the
//!   `backend_type` parameter.
//! - The trait is annotated for `mockall` so tests can assert how text is
//!   handed to the backend.

use crate::error::ConfigurationError;
use crate::types::TypeTables;

/// Markup service of a rendering backend.
#[cfg_attr(any(test, feature = "test-export-mocks"), mockall::automock)]
pub trait Backend {
    /// Format free text (typically a path or label) for embedding into
    /// narrative markup.
    fn generate_text(&self, text: &str) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportBackend {
    LaTeX,
    Word,
}

impl ReportBackend {
    /// Select the backend named by `backend_type`; LaTeX when none is named.
    pub fn from_type(backend_type: Option<&str>, tables: &TypeTables) -> Result<Self, ConfigurationError> {
        let invalid = |value: &str| ConfigurationError::InvalidBackendType {
            value: value.to_string(),
            allowed: tables.backend_names(),
        };
        match backend_type {
            None => Ok(ReportBackend::LaTeX),
            Some(name) if !tables.backend_types.contains_key(name) => Err(invalid(name)),
            Some("LaTeX") => Ok(ReportBackend::LaTeX),
            Some("Word") => Ok(ReportBackend::Word),
            Some(other) => Err(invalid(other)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReportBackend::LaTeX => "LaTeX",
            ReportBackend::Word => "Word",
        }
    }
}

impl Backend for ReportBackend {
    fn generate_text(&self, text: &str) -> String {
        match self {
            ReportBackend::LaTeX => format!("\\texttt{{{text}}}"),
            ReportBackend::Word => text.to_string(),
        }
    }
}
