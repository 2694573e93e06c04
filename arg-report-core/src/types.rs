//! Supported type tables: verbosity levels, report and backend types,
//! classification levels.
//!
//! A [`TypeTables`] value is built once per process (either the built-in
//! defaults or a YAML file with the same layout) and handed to every
//! component that validates against it.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::error::ConfigurationError;

/// Output file extensions associated with a backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BackendFiles {
    pub main: String,
    pub captions: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TypeTables {
    #[serde(default)]
    pub backend_types: BTreeMap<String, BackendFiles>,
    /// Report type -> implied classification level.
    #[serde(default)]
    pub report_types: BTreeMap<String, String>,
    /// Classification level -> sub-key -> allowed values (empty: unrestricted).
    #[serde(default)]
    pub classification_levels: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    #[serde(default)]
    pub verbosity_levels: BTreeMap<String, i64>,
}

impl Default for TypeTables {
    fn default() -> Self {
        let backend_types = BTreeMap::from([
            (
                "LaTeX".to_string(),
                BackendFiles {
                    main: "tex".into(),
                    captions: "tex".into(),
                },
            ),
            (
                "Word".to_string(),
                BackendFiles {
                    main: "txt".into(),
                    captions: "txt".into(),
                },
            ),
        ]);
        let report_types = BTreeMap::from([("Report".to_string(), "Generic".to_string())]);
        let classification_levels = BTreeMap::from([("Generic".to_string(), BTreeMap::new())]);
        let verbosity_levels = BTreeMap::from([
            ("terse".to_string(), -1),
            ("default".to_string(), 0),
            ("verbose".to_string(), 1),
        ]);
        TypeTables {
            backend_types,
            report_types,
            classification_levels,
            verbosity_levels,
        }
    }
}

impl TypeTables {
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigurationError> {
        let mut tables: TypeTables =
            serde_yaml::from_str(content).map_err(ConfigurationError::TypeTablesMalformed)?;
        // A table file that omits verbosity levels still needs the fixed scale.
        if tables.verbosity_levels.is_empty() {
            tables.verbosity_levels = TypeTables::default().verbosity_levels;
        }
        Ok(tables)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigurationError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigurationError::TypeTablesUnreadable {
                path: path.to_path_buf(),
                source: e,
            })?;
        let tables = Self::from_yaml_str(&content)?;
        info!(
            path = %path.display(),
            levels = ?tables.verbosity_levels.keys().collect::<Vec<_>>(),
            "Loaded type tables"
        );
        Ok(tables)
    }

    pub fn terse(&self) -> i64 {
        self.verbosity_levels.get("terse").copied().unwrap_or(-1)
    }

    pub fn default_verbosity(&self) -> i64 {
        self.verbosity_levels.get("default").copied().unwrap_or(0)
    }

    pub fn backend_names(&self) -> Vec<String> {
        self.backend_types.keys().cloned().collect()
    }

    pub fn report_names(&self) -> Vec<String> {
        self.report_types.keys().cloned().collect()
    }

    pub fn classification_names(&self) -> Vec<String> {
        self.classification_levels.keys().cloned().collect()
    }

    /// Case-insensitive lookup of a classification level, returning its
    /// canonical spelling.
    pub fn find_classification(&self, value: &str) -> Option<&str> {
        self.classification_levels
            .keys()
            .find(|k| k.eq_ignore_ascii_case(value))
            .map(String::as_str)
    }

    /// All `<level>_<key>` compound keys, lower-cased, with their canonical
    /// spelling and allowed values.
    pub fn classification_sub_keys(&self) -> BTreeMap<String, (String, Vec<String>)> {
        let mut keys = BTreeMap::new();
        for (level, level_keys) in &self.classification_levels {
            for (key, values) in level_keys {
                let compound = format!("{level}_{key}");
                keys.insert(compound.to_lowercase(), (compound, values.clone()));
            }
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tables_carry_fixed_verbosity_scale() {
        let tables = TypeTables::default();
        assert_eq!(tables.terse(), -1);
        assert_eq!(tables.default_verbosity(), 0);
        assert_eq!(tables.verbosity_levels.get("verbose"), Some(&1));
        assert_eq!(tables.backend_names(), vec!["LaTeX", "Word"]);
    }

    #[test]
    fn parses_table_file_layout() {
        let yaml = r#"
BackendTypes:
  LaTeX:
    Main: tex
    Captions: tex
ReportTypes:
  Report: Generic
ClassificationLevels:
  Generic: {}
  Restricted:
    Marking: [internal, partner]
"#;
        let tables = TypeTables::from_yaml_str(yaml).unwrap();
        assert_eq!(tables.backend_names(), vec!["LaTeX"]);
        assert_eq!(tables.find_classification("restricted"), Some("Restricted"));
        let sub = tables.classification_sub_keys();
        let (canonical, allowed) = sub.get("restricted_marking").unwrap();
        assert_eq!(canonical, "Restricted_Marking");
        assert_eq!(allowed, &vec!["internal".to_string(), "partner".to_string()]);
        // omitted verbosity levels fall back to the fixed scale
        assert_eq!(tables.terse(), -1);
    }

    #[test]
    fn malformed_table_file_is_a_configuration_error() {
        let err = TypeTables::from_yaml_str("VerbosityLevels: [1, 2").unwrap_err();
        assert!(matches!(err, ConfigurationError::TypeTablesMalformed(_)));
    }

    #[test]
    fn unreadable_table_file_names_the_type_tables() {
        let err = TypeTables::from_file(Path::new("/nonexistent/types.yml")).unwrap_err();
        assert!(matches!(err, ConfigurationError::TypeTablesUnreadable { .. }));
        let msg = err.to_string();
        assert!(msg.contains("type tables file"), "{msg}");
        assert!(!msg.contains("parameters"), "{msg}");
    }
}
