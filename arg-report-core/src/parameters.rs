//! Parameter store: parses the flat YAML parameters document into a typed
//! [`Parameters`] value.
//!
//! Keys are case-insensitive and unknown keys are ignored. Values checked
//! against a closed enumeration (report type, backend type, classification
//! level and its sub-keys) are fatal when invalid; ill-shaped list or
//! dictionary values are reported as warnings and skipped.

use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, error, info, warn};

use crate::case::{Fragment, FragmentTable, MappingSpec, Mappings, SolutionCase};
use crate::error::ConfigurationError;
use crate::types::TypeTables;

pub const DEFAULT_MUTABLES_FILE: &str = "mutables.yml";

static LOCATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)(?:\.(\d+))?\s*$").expect("location pattern is valid"));

#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    /// The parameters file itself, excluded from deck discovery.
    pub parameters_file: Option<PathBuf>,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Mutables file name, relative to `output_dir`.
    pub mutables: String,
    pub structure: Option<String>,
    pub structure_end: Option<PathBuf>,

    pub geometry_root: Option<String>,
    pub deck_root: Option<String>,
    pub is_deck_from_log: bool,
    pub log_file: Option<String>,

    pub verbosity: i64,
    pub key_separator: char,

    pub report_type: Option<String>,
    pub backend_type: Option<String>,
    pub classification: Option<String>,
    /// Classification sub-keys, by canonical `<level>_<key>` spelling.
    pub classification_values: BTreeMap<String, String>,

    pub title: Option<String>,
    pub year: Option<String>,
    pub month: Option<String>,
    pub number: Option<String>,
    pub issue: Option<String>,
    pub versions: Vec<Vec<String>>,
    pub final_report: bool,
    pub authors: Vec<String>,
    pub organizations: Vec<String>,
    pub mail_stops: Vec<String>,
    pub file_name: Option<String>,
    pub abstract_text: Option<String>,
    pub location: String,

    pub mappings: Mappings,
    pub reported_cad_metadata: Vec<String>,
    pub ignored_blocks: Vec<String>,
    pub solution_cases: Vec<SolutionCase>,
    pub fragments: FragmentTable,
}

/// Parsed parameters together with every warning raised while parsing.
#[derive(Debug, Clone)]
pub struct ParsedParameters {
    pub parameters: Parameters,
    pub warnings: Vec<String>,
}

impl Parameters {
    /// Defaults before any parameters file is read.
    pub fn new(tables: &TypeTables) -> Self {
        Parameters {
            parameters_file: None,
            data_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            mutables: DEFAULT_MUTABLES_FILE.to_string(),
            structure: None,
            structure_end: None,
            geometry_root: None,
            deck_root: None,
            is_deck_from_log: false,
            log_file: None,
            verbosity: tables.default_verbosity(),
            key_separator: '@',
            report_type: None,
            backend_type: None,
            classification: None,
            classification_values: BTreeMap::new(),
            title: None,
            year: None,
            month: None,
            number: None,
            issue: None,
            versions: Vec::new(),
            final_report: false,
            authors: Vec::new(),
            organizations: Vec::new(),
            mail_stops: Vec::new(),
            file_name: None,
            abstract_text: None,
            location: String::new(),
            mappings: Mappings::default(),
            reported_cad_metadata: Vec::new(),
            ignored_blocks: Vec::new(),
            solution_cases: Vec::new(),
            fragments: FragmentTable::default(),
        }
    }

    pub fn from_file(path: &Path, tables: &TypeTables) -> Result<ParsedParameters, ConfigurationError> {
        if !path.exists() {
            error!(path = %path.display(), "Parameters file does not exist");
            return Err(ConfigurationError::ParametersFileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            error!(error = ?e, path = %path.display(), "Failed to read parameters file");
            ConfigurationError::ParametersUnreadable {
                path: path.to_path_buf(),
                source: e,
            }
        })?;
        let mut parsed = Self::from_yaml_str(&content, tables)?;
        parsed.parameters.parameters_file = Some(path.to_path_buf());
        info!(
            path = %path.display(),
            warnings = parsed.warnings.len(),
            "Parsed parameters file"
        );
        Ok(parsed)
    }

    pub fn from_yaml_str(content: &str, tables: &TypeTables) -> Result<ParsedParameters, ConfigurationError> {
        let document: Value = serde_yaml::from_str(content).map_err(|e| {
            error!(error = ?e, "Failed to parse parameters YAML");
            ConfigurationError::ParametersMalformed(e)
        })?;
        let statements = match document {
            Value::Null => return Err(ConfigurationError::EmptyParameters),
            Value::Mapping(m) if m.is_empty() => return Err(ConfigurationError::EmptyParameters),
            Value::Mapping(m) => m,
            _ => return Err(ConfigurationError::ParametersNotAMapping),
        };
        info!(statements = statements.len(), "Read parameter statements");

        let mut parser = ParameterParser {
            tables,
            class_keys: tables.classification_sub_keys(),
            parameters: Parameters::new(tables),
            pending_mappings: None,
            warnings: Vec::new(),
        };
        for (key, value) in &statements {
            let Some(key) = scalar_to_string(key) else {
                parser.warn(format!("ignoring non-scalar parameter key {key:?}"));
                continue;
            };
            parser.statement(&key.to_lowercase(), value)?;
        }
        if let Some(mappings) = parser.pending_mappings.take() {
            parser.mappings(&mappings);
        }

        let mut parameters = parser.parameters;
        if parameters.verbosity > tables.default_verbosity() {
            for (key, value) in &statements {
                info!(key = ?key, value = ?value, "Found parameter");
            }
        }

        // Organization and mail stop lists follow the author list.
        let n_authors = parameters.authors.len();
        if parameters.organizations.len() < n_authors {
            parameters.organizations.resize(n_authors, String::new());
        }
        if parameters.mail_stops.len() < n_authors {
            parameters.mail_stops.resize(n_authors, "N/A".to_string());
        }

        Ok(ParsedParameters {
            parameters,
            warnings: parser.warnings,
        })
    }

    /// The structure file path inside the output directory, if one was named.
    pub fn structure_path(&self) -> Option<PathBuf> {
        self.structure.as_ref().map(|s| self.output_dir.join(s))
    }

    pub fn mutables_path(&self) -> PathBuf {
        self.output_dir.join(&self.mutables)
    }
}

struct ParameterParser<'a> {
    tables: &'a TypeTables,
    class_keys: BTreeMap<String, (String, Vec<String>)>,
    parameters: Parameters,
    pending_mappings: Option<Mapping>,
    warnings: Vec<String>,
}

impl ParameterParser<'_> {
    fn warn(&mut self, message: String) {
        warn!("*  WARNING: {}", message);
        self.warnings.push(message);
    }

    fn statement(&mut self, key: &str, value: &Value) -> Result<(), ConfigurationError> {
        let p = &mut self.parameters;
        match key {
            "final" => p.final_report = is_truthy(value),
            "mutables" => {
                if let Some(name) = scalar_to_string(value).filter(|s| !s.is_empty()) {
                    p.mutables = name;
                }
            }
            "data" => set_path(&mut p.data_dir, value),
            "output" => set_path(&mut p.output_dir, value),
            "structure" => p.structure = scalar_to_string(value),
            "structure_end" => p.structure_end = scalar_to_string(value).map(PathBuf::from),
            "file_name" => p.file_name = scalar_to_string(value),
            "year" => p.year = scalar_to_string(value),
            "month" => p.month = scalar_to_string(value),
            "number" => p.number = scalar_to_string(value),
            "issue" => p.issue = scalar_to_string(value),
            "version" => {
                if let Some(v) = scalar_to_string(value).filter(|s| !s.is_empty()) {
                    let split: Vec<String> = v.split(',').map(str::to_string).collect();
                    if !p.versions.contains(&split) {
                        p.versions.push(split);
                    }
                }
            }
            "title" => p.title = scalar_to_string(value),
            "author" => push_unique(&mut p.authors, value),
            "organization" => push_unique(&mut p.organizations, value),
            "abstract" => p.abstract_text = scalar_to_string(value),
            "location" => p.location = scalar_to_string(value).unwrap_or_default(),
            "ms" | "mailstop" => {
                if let Some(ms) = scalar_to_string(value) {
                    p.mail_stops.push(ms);
                }
            }
            "geometry_root" => p.geometry_root = scalar_to_string(value),
            "input_deck" => p.deck_root = scalar_to_string(value),
            "input_deck_from_log" => {
                p.deck_root = scalar_to_string(value);
                p.is_deck_from_log = true;
            }
            "log_file" => p.log_file = scalar_to_string(value),
            "verbosity" => {
                let verbosity = self.verbosity_to_int(value);
                self.parameters.verbosity = verbosity;
            }
            "key_separator" => match value.as_str() {
                Some(s) if s.chars().count() == 1 => {
                    p.key_separator = s.chars().next().unwrap_or('@');
                }
                _ => debug!(value = ?value, "Ignoring key separator that is not a single character"),
            },
            "report_type" => self.report_type(value)?,
            "backend_type" => self.backend_type(value)?,
            "classification" => self.classification(value)?,
            "reported_cad_metadata" | "ignored_blocks" | "solution_cases" | "insert_in" => {
                let Some(items) = value.as_sequence() else {
                    self.warn(format!(
                        "ill-formed {key} directive: a {} was passed instead of a list",
                        type_name(value)
                    ));
                    return Ok(());
                };
                match key {
                    "reported_cad_metadata" => {
                        self.parameters.reported_cad_metadata =
                            items.iter().filter_map(scalar_to_string).collect();
                    }
                    "ignored_blocks" => {
                        self.parameters.ignored_blocks = items
                            .iter()
                            .filter_map(scalar_to_string)
                            .map(|s| s.to_lowercase())
                            .collect();
                    }
                    "solution_cases" => self.solution_cases(items),
                    _ => self.insert_in(items),
                }
            }
            "mappings" => {
                let Some(mapping) = value.as_mapping() else {
                    self.warn(format!(
                        "ill-formed {key} directive: a {} was passed instead of a dict",
                        type_name(value)
                    ));
                    return Ok(());
                };
                // Parsed once every statement is read, so `key_separator` applies
                // wherever it appears.
                self.pending_mappings = Some(mapping.clone());
            }
            other if self.class_keys.contains_key(other) => self.classification_value(other, value)?,
            other => debug!(key = other, "Ignoring unsupported parameter"),
        }
        Ok(())
    }

    /// Integer in the verbosity table or one of its string keys; anything else
    /// falls back to the default level.
    fn verbosity_to_int(&mut self, value: &Value) -> i64 {
        let tables = self.tables;
        let levels = &tables.verbosity_levels;
        let default = tables.default_verbosity();
        let text = scalar_to_string(value).unwrap_or_default();
        if let Ok(level) = text.trim().parse::<i64>() {
            if levels.values().any(|v| *v == level) {
                return level;
            }
            self.warn(format!(
                "{text} is not a valid verbosity integer identifier, assigning default ({default}) instead"
            ));
            return default;
        }
        match levels.get(text.as_str()) {
            Some(level) => *level,
            None => {
                self.warn(format!(
                    "{text} is not a valid verbosity string identifier, assigning default instead"
                ));
                default
            }
        }
    }

    fn report_type(&mut self, value: &Value) -> Result<(), ConfigurationError> {
        let value = scalar_to_string(value).unwrap_or_default();
        match self.tables.report_types.get(&value) {
            Some(implied) => {
                self.parameters.report_type = Some(value);
                if self.parameters.classification.is_none() {
                    self.parameters.classification = Some(implied.clone());
                }
                Ok(())
            }
            None => {
                error!(value = %value, "Invalid report type");
                Err(ConfigurationError::InvalidReportType {
                    value,
                    allowed: self.tables.report_names(),
                })
            }
        }
    }

    fn backend_type(&mut self, value: &Value) -> Result<(), ConfigurationError> {
        let value = scalar_to_string(value).unwrap_or_default();
        if self.tables.backend_types.contains_key(&value) {
            self.parameters.backend_type = Some(value);
            Ok(())
        } else {
            error!(value = %value, "Invalid backend type");
            Err(ConfigurationError::InvalidBackendType {
                value,
                allowed: self.tables.backend_names(),
            })
        }
    }

    fn classification(&mut self, value: &Value) -> Result<(), ConfigurationError> {
        let value = scalar_to_string(value).unwrap_or_default();
        match self.tables.find_classification(&value) {
            Some(level) => {
                self.parameters.classification = Some(level.to_string());
                Ok(())
            }
            None => {
                error!(value = %value, "Invalid classification");
                Err(ConfigurationError::InvalidClassification {
                    value,
                    allowed: self.tables.classification_names(),
                })
            }
        }
    }

    fn classification_value(&mut self, key: &str, value: &Value) -> Result<(), ConfigurationError> {
        let Some((canonical, allowed)) = self.class_keys.get(key).cloned() else {
            return Ok(());
        };
        let value = scalar_to_string(value).unwrap_or_default();
        if allowed.is_empty() || allowed.contains(&value) {
            self.parameters.classification_values.insert(canonical, value);
            Ok(())
        } else {
            error!(key = %canonical, value = %value, "Invalid classification sub-key value");
            Err(ConfigurationError::InvalidClassificationValue {
                key: canonical,
                value,
                allowed,
            })
        }
    }

    fn solution_cases(&mut self, items: &[Value]) {
        let mut cases = Vec::new();
        for item in items {
            if let Some(stem) = scalar_to_string(item) {
                cases.push(SolutionCase { stem, method: None });
                continue;
            }
            let stem = item
                .get("stem")
                .or_else(|| item.get("name"))
                .and_then(scalar_to_string);
            match stem {
                Some(stem) => cases.push(SolutionCase {
                    stem,
                    method: item.get("method").and_then(scalar_to_string),
                }),
                None => self.warn(format!("ill-formed solution_cases value: {item:?}")),
            }
        }
        self.parameters.solution_cases = cases;
    }

    fn insert_in(&mut self, items: &[Value]) {
        for item in items {
            match parse_insertion(item) {
                Some((chapter, section, fragments)) => {
                    for fragment in fragments {
                        debug!(chapter, section, kind = %fragment.kind, "Registered fragment insertion");
                        self.parameters.fragments.insert(chapter, section, fragment);
                    }
                }
                None => self.warn(format!("ill-formed insert_in value: {item:?}")),
            }
        }
    }

    fn mappings(&mut self, mapping: &Mapping) {
        let mut mappings = Mappings::default();
        for (direction, slot) in [
            ("CAD_to_FEM", &mut mappings.cad_to_fem),
            ("FEM_to_CAD", &mut mappings.fem_to_cad),
        ] {
            let Some(spec) = mapping.get(direction) else {
                continue;
            };
            match parse_mapping_spec(spec, self.parameters.key_separator) {
                Ok((parsed, skipped)) => {
                    for message in skipped {
                        self.warn(format!("ill-formed {direction} mapping: {message}"));
                    }
                    *slot = Some(parsed);
                }
                Err(message) => self.warn(format!("ill-formed {direction} mapping: {message}")),
            }
        }
        self.parameters.mappings = mappings;
    }
}

/// Parse one mapping direction. Elements mapped to a list are joined with
/// `separator`; entries that cannot be used are returned as warnings.
fn parse_mapping_spec(spec: &Value, separator: char) -> Result<(MappingSpec, Vec<String>), String> {
    let Some(spec) = spec.as_mapping() else {
        return Err(format!("a {} was passed instead of a dict", type_name(spec)));
    };
    let mut skipped = Vec::new();
    let elements = match spec.get("elements") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Mapping(m)) => parse_elements(m, separator, &mut skipped),
        Some(other) => {
            return Err(format!(
                "elements must be a dict, a {} was passed",
                type_name(other)
            ))
        }
    };
    let factors = match spec.get("factors") {
        None | Some(Value::Null) => None,
        Some(Value::Mapping(m)) => Some(
            m.iter()
                .filter_map(|(k, v)| match (scalar_to_string(k), scalar_to_string(v)) {
                    (Some(element), Some(factor)) => Some((element, factor)),
                    _ => {
                        skipped.push(format!("ignoring factor {k:?} with a {} value", type_name(v)));
                        None
                    }
                })
                .collect(),
        ),
        Some(other) => {
            skipped.push(format!(
                "factors must be a dict of element: factor, a {} was passed; ignoring factors",
                type_name(other)
            ));
            None
        }
    };
    Ok((MappingSpec { elements, factors }, skipped))
}

fn parse_elements(elements: &Mapping, separator: char, skipped: &mut Vec<String>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in elements {
        let Some(source) = scalar_to_string(key) else {
            skipped.push(format!("ignoring non-scalar element {key:?}"));
            continue;
        };
        let destination = match value {
            Value::Sequence(items) => items
                .iter()
                .map(scalar_to_string)
                .collect::<Option<Vec<_>>>()
                .map(|parts| parts.join(&separator.to_string())),
            other => scalar_to_string(other),
        };
        match destination.filter(|d| !d.is_empty()) {
            Some(destination) => pairs.push((source, destination)),
            None => skipped.push(format!(
                "ignoring element {source}: a {} was passed instead of a string or list of strings",
                type_name(value)
            )),
        }
    }
    pairs
}

/// Parse `{location: "c.s", <kind>: values...}` into its coordinate and
/// fragments. The section defaults to 0.
fn parse_insertion(item: &Value) -> Option<(usize, usize, Vec<Fragment>)> {
    let entry = item.as_mapping()?;
    let location = scalar_to_string(entry.get("location")?)?;
    let (chapter, section) = parse_location(&location)?;
    let fragments = entry
        .iter()
        .filter_map(|(k, v)| {
            let kind = scalar_to_string(k)?;
            if kind == "location" {
                return None;
            }
            let values = match v {
                Value::Sequence(s) => s.iter().filter_map(scalar_to_string).collect(),
                other => vec![scalar_to_string(other)?],
            };
            Some(Fragment { kind, values })
        })
        .collect();
    Some((chapter, section, fragments))
}

/// `"c"` or `"c.s"` into `(c, s)`.
pub fn parse_location(location: &str) -> Option<(usize, usize)> {
    let captures = LOCATION.captures(location)?;
    let chapter = captures.get(1)?.as_str().parse().ok()?;
    let section = match captures.get(2) {
        Some(s) => s.as_str().parse().ok()?,
        None => 0,
    };
    Some((chapter, section))
}

/// Render a YAML scalar as text; `None` for null, sequences and mappings.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(t) => scalar_to_string(&t.value),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Sequence(s) => !s.is_empty(),
        Value::Mapping(m) => !m.is_empty(),
        Value::Tagged(t) => is_truthy(&t.value),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "dict",
        Value::Tagged(_) => "tagged value",
    }
}

fn set_path(slot: &mut PathBuf, value: &Value) {
    if let Some(path) = scalar_to_string(value) {
        *slot = PathBuf::from(path);
    }
}

fn push_unique(list: &mut Vec<String>, value: &Value) {
    if let Some(v) = scalar_to_string(value) {
        if !list.contains(&v) {
            list.push(v);
        }
    }
}
