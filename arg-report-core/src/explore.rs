//! Exploration pipeline: discover, resolve, persist mutables, synthesize and
//! write the structure file.

use chrono::NaiveDate;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

use crate::case::{to_forward_slashes, Case};
use crate::classify::{discover, ClassifyOptions};
use crate::contract::ReportBackend;
use crate::error::{ConfigurationError, ExploreError};
use crate::mutables::{default_author, generate_mutables, save_generated_mutables};
use crate::parameters::Parameters;
use crate::resolve::{
    check_structure_file, resolve_deck, resolve_deck_root, resolve_geometry_root, resolve_log_file,
    resolve_mesh, resolve_solutions, validate_mappings,
};
use crate::synthesize::{synthesize, title_directive};
use crate::types::TypeTables;

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct ExploreReport {
    pub structure_file: PathBuf,
    pub chapters: usize,
    pub mutables: Mapping,
    pub case: Case,
}

/// Run the explorator with today's date and the invoking user.
pub fn explore(parameters: &mut Parameters, tables: &TypeTables) -> Result<ExploreReport, ExploreError> {
    let today = chrono::Local::now().date_naive();
    explore_on(parameters, tables, today, &default_author())
}

/// Run the explorator with an explicit date and default author.
pub fn explore_on(
    parameters: &mut Parameters,
    tables: &TypeTables,
    today: NaiveDate,
    user: &str,
) -> Result<ExploreReport, ExploreError> {
    let started = Instant::now();
    info!(data = %parameters.data_dir.display(), "Exploration starting");
    let backend = ReportBackend::from_type(parameters.backend_type.as_deref(), tables)?;
    info!(backend = backend.name(), "Selected report backend");

    let mut case = Case::from_parameters(parameters);
    let options = ClassifyOptions {
        collect_standalone: parameters.verbosity > tables.terse(),
        excluded: excluded_files(&case, parameters),
    };
    discover(&mut case, &options)?;

    resolve_geometry_root(&mut case, parameters.geometry_root.as_deref())?;
    resolve_deck_root(
        &mut case,
        parameters.deck_root.as_deref(),
        parameters.log_file.as_deref(),
        parameters.is_deck_from_log,
    )?;
    resolve_log_file(&mut case, parameters.log_file.as_deref())?;
    resolve_mesh(&mut case, &backend);
    resolve_deck(&mut case);
    resolve_solutions(&mut case, &backend);
    validate_mappings(&mut case)?;
    check_structure_file(parameters.structure.as_deref(), &parameters.output_dir)?;

    let has_title_directive = title_directive(&case, parameters).is_some();
    let mut generated = Mapping::new();
    generated.insert(Value::from("version"), Value::from(crate::VERSION));
    for (key, value) in generate_mutables(parameters, has_title_directive, today, user) {
        generated.insert(key, value);
    }
    let mutables = save_generated_mutables(&parameters.mutables_path(), generated)?;

    let document = synthesize(&case, parameters, tables, &backend)?;
    let trailer = match &parameters.structure_end {
        Some(path) => Some(read_trailer(path)?),
        None => None,
    };
    let text = document.to_yaml(trailer.as_deref())?;

    let structure_file = parameters
        .structure_path()
        .ok_or(ConfigurationError::MissingStructureFile)?;
    std::fs::write(&structure_file, text).map_err(|e| ExploreError::io(&structure_file, e))?;
    info!(
        path = %to_forward_slashes(&structure_file),
        chapters = document.chapters.len(),
        elapsed = ?started.elapsed(),
        "Generated structure file"
    );

    Ok(ExploreReport {
        structure_file,
        chapters: document.chapters.len(),
        mutables,
        case,
    })
}

fn read_trailer(path: &Path) -> Result<String, ConfigurationError> {
    std::fs::read_to_string(path).map_err(|e| ConfigurationError::TrailerUnreadable {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Data-relative spellings of the parameters and mutables files, which are
/// never input decks.
fn excluded_files(case: &Case, parameters: &Parameters) -> Vec<String> {
    let candidates = parameters
        .parameters_file
        .iter()
        .cloned()
        .chain(std::iter::once(parameters.mutables_path()));
    candidates
        .filter_map(|path| relative_to_data(case, &path))
        .collect()
}

fn relative_to_data(case: &Case, path: &Path) -> Option<String> {
    let real = std::fs::canonicalize(path).ok();
    let relative = real
        .as_deref()
        .and_then(|p| p.strip_prefix(&case.real_data_dir).ok())
        .or_else(|| path.strip_prefix(&case.data_dir).ok())?;
    Some(to_forward_slashes(relative))
}
