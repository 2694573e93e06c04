use std::fs::write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

use arg_report::load_config::{load_parameters, load_type_tables};

/// A parameters file with overrides produces typed parameters.
#[test]
fn test_load_parameters_success() {
    let parameters_yaml = r#"
data: ./simulation
output: ./report
structure: structure.yml
verbosity: verbose
backend_type: Word
author: Jane Analyst
ignored_blocks: [Block_7]
"#;
    let parameters_file = NamedTempFile::new().expect("temp file");
    write(parameters_file.path(), parameters_yaml).unwrap();

    let tables = load_type_tables(None).expect("built-in tables");
    let parsed = load_parameters(parameters_file.path(), &tables).expect("Parameters should load");

    let p = &parsed.parameters;
    assert_eq!(p.data_dir, PathBuf::from("./simulation"));
    assert_eq!(p.output_dir, PathBuf::from("./report"));
    assert_eq!(p.structure.as_deref(), Some("structure.yml"));
    assert_eq!(p.verbosity, 1);
    assert_eq!(p.backend_type.as_deref(), Some("Word"));
    assert_eq!(p.authors, vec!["Jane Analyst"]);
    assert_eq!(p.mail_stops, vec!["N/A"]);
    assert_eq!(p.ignored_blocks, vec!["block_7"]);
    assert_eq!(p.parameters_file.as_deref(), Some(parameters_file.path()));
    assert!(parsed.warnings.is_empty());
}

/// Enumerated values outside the type tables fail with the allowed set.
#[test]
fn test_load_parameters_errors_on_invalid_report_type() {
    let parameters_file = NamedTempFile::new().expect("temp file");
    write(parameters_file.path(), "report_type: Memo\n").unwrap();

    let tables = load_type_tables(None).unwrap();
    let err = load_parameters(parameters_file.path(), &tables).unwrap_err();
    let msg = format!("{err:#}");

    assert!(
        msg.contains("`Memo`") && msg.contains("`Report`"),
        "Must name the value and allowed set, got: {msg}"
    );
}

/// If the parameters file is not valid YAML, loading errors and reports as such.
#[test]
fn test_load_parameters_errors_for_invalid_file() {
    let parameters_file = NamedTempFile::new().expect("temp file");
    write(parameters_file.path(), "data: [unclosed\n").unwrap();

    let tables = load_type_tables(None).unwrap();
    let err = load_parameters(parameters_file.path(), &tables).unwrap_err();
    assert!(format!("{err:#}").contains("could not parse parameters file"));
}

/// A type tables file replaces the built-in report types.
#[test]
fn test_load_type_tables_from_file() {
    let types_yaml = r#"
ReportTypes:
  Memo: Internal
ClassificationLevels:
  Internal:
    review: [pending, done]
BackendTypes:
  LaTeX: {Main: tex, Captions: tex}
"#;
    let types_file = NamedTempFile::new().expect("temp file");
    write(types_file.path(), types_yaml).unwrap();

    let tables = load_type_tables(Some(types_file.path())).expect("Type tables should load");
    assert_eq!(tables.report_names(), vec!["Memo"]);
    assert_eq!(tables.terse(), -1);

    let parameters_file = NamedTempFile::new().expect("temp file");
    write(parameters_file.path(), "report_type: Memo\ninternal_review: done\n").unwrap();
    let parsed = load_parameters(parameters_file.path(), &tables).expect("Parameters should load");
    assert_eq!(parsed.parameters.classification.as_deref(), Some("Internal"));
    assert_eq!(
        parsed.parameters.classification_values.get("Internal_review").map(String::as_str),
        Some("done")
    );
}

/// A missing type tables file is reported as such, not as a parameters file.
#[test]
fn test_load_type_tables_errors_for_missing_file() {
    let err = load_type_tables(Some(std::path::Path::new("does-not-exist-types.yml"))).unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("could not read type tables file"), "{msg}");
}
