//! Error types for the exploration pipeline.
//!
//! Configuration problems are fatal for a run and surface as
//! [`ConfigurationError`]; the driver decides how to report them. Problems
//! that only degrade optional parts of the report are logged as warnings and
//! never reach these types.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal configuration problems. Every message names the offending value and,
/// for closed enumerations, the allowed set.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("provided parameters file {0} does not exist")]
    ParametersFileNotFound(PathBuf),

    #[error("could not read parameters file {path}: {source}")]
    ParametersUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse parameters file: {0}")]
    ParametersMalformed(#[source] serde_yaml::Error),

    #[error("parameters file must be a mapping of key: value statements")]
    ParametersNotAMapping,

    #[error("no parameters found in parameters file")]
    EmptyParameters,

    #[error("could not read type tables file {path}: {source}")]
    TypeTablesUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse type tables: {0}")]
    TypeTablesMalformed(#[source] serde_yaml::Error),

    #[error("`{value}` is not a valid report type. Allowed values are `{}`", allowed.join("`, `"))]
    InvalidReportType { value: String, allowed: Vec<String> },

    #[error("`{value}` is not a valid backend type. Allowed values are `{}`", allowed.join("`, `"))]
    InvalidBackendType { value: String, allowed: Vec<String> },

    #[error("`{value}` is not a valid classification. Allowed values are `{}`", allowed.join("`, `"))]
    InvalidClassification { value: String, allowed: Vec<String> },

    #[error("`{value}` is not allowed for `{key}`. Allowed values are in [{}]", allowed.join(", "))]
    InvalidClassificationValue {
        key: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("data directory {0} was not found")]
    DataDirNotFound(PathBuf),

    #[error("specified geometry root {0} was not found")]
    GeometryRootNotFound(PathBuf),

    #[error("specified input deck root {0} was not found")]
    DeckRootNotFound(String),

    #[error("specified log file {0} was not found")]
    LogFileNotFound(String),

    #[error("missing CAD geometry files: mappings between CAD and FEM cannot be reported")]
    MappingsWithoutGeometry,

    #[error("a report structure file name is required")]
    MissingStructureFile,

    #[error("could not create output directory {path}: {source}")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not read structure trailer {path}: {source}")]
    TrailerUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Any failure of an exploration run.
#[derive(Debug, Error)]
pub enum ExploreError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not serialize YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ExploreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExploreError::Io {
            path: path.into(),
            source,
        }
    }
}
