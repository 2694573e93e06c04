use anyhow::{Context, Result};
use arg_report_core::parameters::{ParsedParameters, Parameters};
use arg_report_core::types::TypeTables;
use std::path::Path;
use tracing::{error, info};

/// Load the supported type tables from `path`, or the built-in ones when no
/// file is given.
pub fn load_type_tables(path: Option<&Path>) -> Result<TypeTables> {
    let Some(path) = path else {
        info!("Using built-in type tables");
        return Ok(TypeTables::default());
    };
    info!(types_path = ?path, "Loading type tables from file");
    TypeTables::from_file(path).map_err(|e| {
        error!(error = %e, types_path = ?path, "Failed to load type tables");
        anyhow::Error::new(e).context(format!("could not load type tables {}", path.display()))
    })
}

/// Parse the parameters file at `path` against `tables`.
pub fn load_parameters<P: AsRef<Path>>(path: P, tables: &TypeTables) -> Result<ParsedParameters> {
    let path_ref = path.as_ref();
    info!(parameters_path = ?path_ref, "Loading parameters from file");

    let parsed = Parameters::from_file(path_ref, tables)
        .with_context(|| format!("invalid parameters file {}", path_ref.display()))?;

    info!(
        parameters_path = ?path_ref,
        data = %parsed.parameters.data_dir.display(),
        output = %parsed.parameters.output_dir.display(),
        verbosity = parsed.parameters.verbosity,
        warnings = parsed.warnings.len(),
        "Parameters loaded"
    );
    Ok(parsed)
}
