//! Resolver: reconciles user declarations (geometry root, input deck, log
//! file, mappings, solution cases) with what the classifier discovered, and
//! derives the mesh, deck and solution entries of the case.

use std::path::Path;
use tracing::{error, info, warn};

use crate::case::{to_forward_slashes, Case, Solution, SolutionType};
use crate::contract::Backend;
use crate::error::ConfigurationError;

pub const MESH_TYPE: &str = "ExodusII";

/// Populate geometry and CAD parameter files from a declared geometry root,
/// which must be a directory below the data root.
pub fn resolve_geometry_root(case: &mut Case, declared: Option<&str>) -> Result<(), ConfigurationError> {
    let Some(root) = declared else {
        return Ok(());
    };
    let full_path = case.data_path(root);
    if !full_path.is_dir() {
        error!(path = %full_path.display(), "Specified geometry root was not found");
        return Err(ConfigurationError::GeometryRootNotFound(full_path));
    }
    info!(root, data = %case.data_dir.display(), "Specified geometry root was found");

    let root = root.trim_end_matches(['/', '\\']);
    let mut names: Vec<String> = std::fs::read_dir(&full_path)
        .map_err(|_| ConfigurationError::GeometryRootNotFound(full_path.clone()))?
        .filter_map(Result::ok)
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    let join = |name: &str| {
        if root.is_empty() || root == "." {
            name.to_string()
        } else {
            format!("{}/{name}", root.replace('\\', "/"))
        }
    };
    case.geometry_files = names
        .iter()
        .filter(|n| Path::new(n).extension().is_some_and(|e| e == "stl"))
        .map(|n| join(n))
        .collect();
    case.cad_parameter_files = names
        .iter()
        .filter(|n| {
            let p = Path::new(n);
            p.extension().is_some_and(|e| e == "txt")
                && p.file_stem().is_some_and(|s| s.to_string_lossy().contains("_parameters"))
        })
        .map(|n| join(n))
        .collect();
    info!(
        geometry = case.geometry_files.len(),
        parameters = case.cad_parameter_files.len(),
        "Collected geometry files"
    );
    Ok(())
}

/// Reconcile a declared input deck with the discovered candidates. A
/// declared deck that was discovered replaces the candidate list; otherwise
/// it must exist, or, when it is produced from a log, the log must exist.
pub fn resolve_deck_root(
    case: &mut Case,
    declared: Option<&str>,
    log_file: Option<&str>,
    is_from_log: bool,
) -> Result<(), ConfigurationError> {
    let Some(deck) = declared else {
        return Ok(());
    };
    if case.deck_files.iter().any(|d| d == deck) {
        info!(deck, "Specified input deck root was found among candidates");
        case.deck_files = vec![deck.to_string()];
        case.deck_root = Some(deck.to_string());
        return Ok(());
    }
    if case.data_path(deck).is_file() {
        warn!(deck, "*  WARNING: specified input deck root found but not detected as input deck file");
    } else if is_from_log {
        let log_exists = log_file.is_some_and(|log| case.data_path(log).is_file());
        if !log_exists {
            let log = log_file.unwrap_or_default().to_string();
            error!(log = %log, "Log file for input deck was not found");
            return Err(ConfigurationError::LogFileNotFound(log));
        }
        info!(deck, log = ?log_file, "Input deck root will be produced from log file");
    } else {
        error!(deck, "Specified input deck root was not found");
        return Err(ConfigurationError::DeckRootNotFound(deck.to_string()));
    }
    case.deck_root = Some(deck.to_string());
    Ok(())
}

/// A declared log file must have been discovered or exist below the data root.
pub fn resolve_log_file(case: &mut Case, declared: Option<&str>) -> Result<(), ConfigurationError> {
    let Some(log) = declared else {
        return Ok(());
    };
    if case.log_files.iter().any(|l| l == log) {
        info!(log, "Specified log file was found");
    } else if case.data_path(log).is_file() {
        warn!(log, "*  WARNING: specified log file found but not detected as log file");
    } else {
        error!(log, "Specified log file was not found");
        return Err(ConfigurationError::LogFileNotFound(log.to_string()));
    }
    case.log_file = Some(log.to_string());
    Ok(())
}

/// Mappings need geometry to anchor them. Factor lists whose length differs
/// from the number of geometry files are dropped.
pub fn validate_mappings(case: &mut Case) -> Result<(), ConfigurationError> {
    if case.mappings.is_empty() {
        return Ok(());
    }
    if case.geometry_files.is_empty() {
        error!("Mappings declared without geometry files");
        return Err(ConfigurationError::MappingsWithoutGeometry);
    }
    let n_geometry = case.geometry_files.len();
    for (name, spec) in [
        ("CAD_to_FEM", case.mappings.cad_to_fem.as_mut()),
        ("FEM_to_CAD", case.mappings.fem_to_cad.as_mut()),
    ] {
        let Some(spec) = spec else {
            continue;
        };
        if let Some(factors) = &spec.factors {
            if factors.len() != n_geometry {
                warn!(
                    mapping = name,
                    factors = factors.len(),
                    geometry = n_geometry,
                    "*  WARNING: ignoring factors whose count does not match the geometry files"
                );
                spec.factors = None;
            }
        }
    }
    Ok(())
}

/// The first discovered mesh file becomes the case mesh.
pub fn resolve_mesh(case: &mut Case, backend: &dyn Backend) {
    let Some(mesh) = case.mesh_files.first().cloned() else {
        return;
    };
    info!(mesh_type = MESH_TYPE, mesh = %mesh, "Stand-alone mesh was found");
    case.discovered_data.set(
        MESH_TYPE,
        format!(" mesh in {}", backend.generate_text(&mesh.replace('\\', "/"))),
    );
    case.mesh_name = Some(mesh);
    case.mesh_type = Some(MESH_TYPE.to_string());
}

/// Deck type by extension of the deck root.
pub fn deck_type_of(deck: &str) -> Option<&'static str> {
    let extension = Path::new(deck).extension()?.to_string_lossy().to_lowercase();
    match extension.as_str() {
        "i" | "in" | "inp" => Some("SierraInput"),
        "yml" | "yaml" => Some("YAMLDeck"),
        _ => None,
    }
}

/// Settle the deck root (declared, else first candidate) and its type.
pub fn resolve_deck(case: &mut Case) {
    if case.deck_root.is_none() {
        case.deck_root = case.deck_files.first().cloned();
    }
    case.deck_type = case
        .deck_root
        .as_deref()
        .and_then(deck_type_of)
        .map(str::to_string);
    if let (Some(root), Some(kind)) = (&case.deck_root, &case.deck_type) {
        info!(deck = %root, deck_type = %kind, "Input deck determined");
    }
}

/// Text before the first `.` of a path, and of its file name.
fn stems(path: &str) -> (&str, &str) {
    let full = path.split('.').next().unwrap_or(path);
    let name = path.rsplit('/').next().unwrap_or(path);
    (full, name.split('.').next().unwrap_or(name))
}

/// Match declared solution cases against partitions (then stand-alone
/// ExodusII files); without declarations every partition is a solution.
pub fn resolve_solutions(case: &mut Case, backend: &dyn Backend) {
    let mut solutions = Vec::new();
    if case.solution_cases.is_empty() {
        for stem in &case.mesh_partitions {
            solutions.push(Solution {
                kind: SolutionType::ExodusIIPartition,
                name: stem.clone(),
                method: stems(stem).1.to_string(),
            });
        }
    } else {
        for declared in &case.solution_cases {
            let matches = |path: &&String| {
                let (full, name) = stems(path);
                full == declared.stem || name == declared.stem
            };
            let method = declared.method.clone().unwrap_or_else(|| declared.stem.clone());
            if let Some(stem) = case.mesh_partitions.iter().find(matches) {
                solutions.push(Solution {
                    kind: SolutionType::ExodusIIPartition,
                    name: stem.clone(),
                    method,
                });
            } else if let Some(file) = case
                .mesh_files
                .iter()
                .filter(|f| case.mesh_name.as_ref() != Some(*f))
                .find(matches)
            {
                solutions.push(Solution {
                    kind: SolutionType::ExodusIIFile,
                    name: file.clone(),
                    method,
                });
            } else {
                warn!(stem = %declared.stem, "*  WARNING: no solution found for declared solution case");
            }
        }
    }

    for solution in &solutions {
        info!(kind = ?solution.kind, name = %solution.name, method = %solution.method, "Solution was found");
        case.discovered_data.push(
            &format!("{} solution", solution.kind.datatype()),
            format!(" in {}", backend.generate_text(&solution.name.replace('\\', "/"))),
        );
    }
    case.solutions = solutions;
}

/// Name of the data reported for a solution: partitions drop one more
/// extension from their stem.
pub fn reported_solution_name(solution: &Solution) -> String {
    if solution.kind.is_partition() {
        match solution.name.rsplit_once('.') {
            Some((stem, _)) if !stem.ends_with('/') => stem.to_string(),
            _ => solution.name.clone(),
        }
    } else {
        solution.name.clone()
    }
}

/// Ensure the output directory exists; a structure file name is required.
pub fn check_structure_file(structure: Option<&str>, output_dir: &Path) -> Result<(), ConfigurationError> {
    if structure.map_or(true, str::is_empty) {
        error!("No structure file name provided");
        return Err(ConfigurationError::MissingStructureFile);
    }
    if !output_dir.is_dir() {
        info!(path = %to_forward_slashes(output_dir), "Creating output directory");
        std::fs::create_dir_all(output_dir).map_err(|e| ConfigurationError::OutputDirectory {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::{MappingSpec, Mappings, SolutionCase};
    use crate::contract::{MockBackend, ReportBackend};
    use std::fs::{create_dir_all, File};
    use tempfile::tempdir;

    fn case_in(root: &Path) -> Case {
        Case::new(root)
    }

    #[test]
    fn geometry_root_collects_sorted_stl_and_parameter_files() {
        let tmp = tempdir().unwrap();
        create_dir_all(tmp.path().join("geom")).unwrap();
        for name in ["part2.stl", "part1.stl", "part1_parameters.txt", "notes.txt", "part3.STEP"] {
            File::create(tmp.path().join("geom").join(name)).unwrap();
        }
        let mut case = case_in(tmp.path());
        resolve_geometry_root(&mut case, Some("geom")).unwrap();
        assert_eq!(case.geometry_files, vec!["geom/part1.stl", "geom/part2.stl"]);
        assert_eq!(case.cad_parameter_files, vec!["geom/part1_parameters.txt"]);
    }

    #[test]
    fn missing_geometry_root_is_fatal() {
        let tmp = tempdir().unwrap();
        let mut case = case_in(tmp.path());
        let err = resolve_geometry_root(&mut case, Some("nowhere")).unwrap_err();
        assert!(matches!(err, ConfigurationError::GeometryRootNotFound(_)));
    }

    #[test]
    fn declared_discovered_deck_replaces_candidates() {
        let tmp = tempdir().unwrap();
        let mut case = case_in(tmp.path());
        case.deck_files = vec!["a.i".into(), "b.i".into()];
        resolve_deck_root(&mut case, Some("b.i"), None, false).unwrap();
        assert_eq!(case.deck_files, vec!["b.i"]);
        resolve_deck(&mut case);
        assert_eq!(case.deck_root.as_deref(), Some("b.i"));
        assert_eq!(case.deck_type.as_deref(), Some("SierraInput"));
    }

    #[test]
    fn undeclared_missing_deck_is_fatal_unless_produced_from_existing_log() {
        let tmp = tempdir().unwrap();
        File::create(tmp.path().join("run.log")).unwrap();
        let mut case = case_in(tmp.path());
        let err = resolve_deck_root(&mut case, Some("missing.i"), None, false).unwrap_err();
        assert!(matches!(err, ConfigurationError::DeckRootNotFound(_)));

        resolve_deck_root(&mut case, Some("missing.i"), Some("run.log"), true).unwrap();
        assert_eq!(case.deck_root.as_deref(), Some("missing.i"));

        let err = resolve_deck_root(&mut case, Some("missing.i"), Some("gone.log"), true).unwrap_err();
        assert!(matches!(err, ConfigurationError::LogFileNotFound(_)));
    }

    #[test]
    fn declared_log_file_must_exist() {
        let tmp = tempdir().unwrap();
        File::create(tmp.path().join("other.txt")).unwrap();
        let mut case = case_in(tmp.path());
        case.log_files = vec!["run.log".into()];
        resolve_log_file(&mut case, Some("run.log")).unwrap();
        assert_eq!(case.log_file.as_deref(), Some("run.log"));
        resolve_log_file(&mut case, Some("other.txt")).unwrap();
        assert_eq!(case.log_file.as_deref(), Some("other.txt"));
        let err = resolve_log_file(&mut case, Some("absent.log")).unwrap_err();
        assert!(matches!(err, ConfigurationError::LogFileNotFound(_)));
    }

    #[test]
    fn mappings_without_geometry_are_fatal() {
        let mut case = Case::default();
        case.mappings = Mappings {
            cad_to_fem: Some(MappingSpec {
                elements: vec![("part1".into(), "block_1".into())],
                factors: None,
            }),
            fem_to_cad: None,
        };
        let err = validate_mappings(&mut case).unwrap_err();
        assert!(matches!(err, ConfigurationError::MappingsWithoutGeometry));
    }

    #[test]
    fn mismatched_factors_are_dropped_entirely() {
        let mut case = Case::default();
        case.geometry_files = vec!["g/a.stl".into(), "g/b.stl".into()];
        case.mappings.cad_to_fem = Some(MappingSpec {
            elements: vec![("a".into(), "1".into())],
            factors: Some(vec![
                ("a".into(), "1.0".into()),
                ("b".into(), "2.0".into()),
                ("c".into(), "3.0".into()),
            ]),
        });
        case.mappings.fem_to_cad = Some(MappingSpec {
            elements: vec![("1".into(), "a".into())],
            factors: Some(vec![("b".into(), "2.0".into()), ("a".into(), "1.0".into())]),
        });
        validate_mappings(&mut case).unwrap();
        assert!(case.mappings.cad_to_fem.unwrap().factors.is_none());
        assert_eq!(case.mappings.fem_to_cad.unwrap().factors.map(|f| f.len()), Some(2));
    }

    #[test]
    fn first_mesh_becomes_case_mesh_and_is_summarised() {
        let mut backend = MockBackend::new();
        backend
            .expect_generate_text()
            .withf(|t| t == "sub/model.e")
            .times(1)
            .returning(|t| format!("<{t}>"));
        let mut case = Case::default();
        case.mesh_files = vec!["sub/model.e".into(), "other.e".into()];
        resolve_mesh(&mut case, &backend);
        assert_eq!(case.mesh_name.as_deref(), Some("sub/model.e"));
        assert_eq!(case.mesh_type.as_deref(), Some("ExodusII"));
        assert_eq!(case.discovered_data.items(), vec!["ExodusII mesh in <sub/model.e>"]);
    }

    #[test]
    fn undeclared_partitions_become_solutions_in_discovery_order() {
        let mut case = Case::default();
        case.mesh_partitions = vec!["out/thermal.e.4".into(), "out/modal.e.2".into()];
        resolve_solutions(&mut case, &ReportBackend::Word);
        let names: Vec<_> = case.solutions.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["out/thermal.e.4", "out/modal.e.2"]);
        assert_eq!(case.solutions[0].method, "thermal");
        assert_eq!(
            case.discovered_data.items(),
            vec!["ExodusII solution in out/thermal.e.4", "ExodusII solution in out/modal.e.2"]
        );
    }

    #[test]
    fn declared_solution_cases_match_partitions_then_files() {
        let mut case = Case::default();
        case.mesh_name = Some("mesh.e".into());
        case.mesh_files = vec!["mesh.e".into(), "modal.exo".into()];
        case.mesh_partitions = vec!["thermal.e.4".into()];
        case.solution_cases = vec![
            SolutionCase { stem: "modal".into(), method: Some("modal analysis".into()) },
            SolutionCase { stem: "thermal".into(), method: None },
            SolutionCase { stem: "mesh".into(), method: None },
        ];
        resolve_solutions(&mut case, &ReportBackend::Word);
        assert_eq!(
            case.solutions,
            vec![
                Solution {
                    kind: SolutionType::ExodusIIFile,
                    name: "modal.exo".into(),
                    method: "modal analysis".into()
                },
                Solution {
                    kind: SolutionType::ExodusIIPartition,
                    name: "thermal.e.4".into(),
                    method: "thermal".into()
                },
            ]
        );
    }

    #[test]
    fn reported_partition_name_drops_decomposition_count() {
        let solution = Solution {
            kind: SolutionType::ExodusIIPartition,
            name: "out/case.e.4".into(),
            method: "case".into(),
        };
        assert_eq!(reported_solution_name(&solution), "out/case.e");
    }

    #[test]
    fn structure_file_is_required_and_output_dir_created() {
        let tmp = tempdir().unwrap();
        let out = tmp.path().join("report/out");
        assert!(matches!(
            check_structure_file(None, &out),
            Err(ConfigurationError::MissingStructureFile)
        ));
        check_structure_file(Some("structure.yml"), &out).unwrap();
        assert!(out.is_dir());
    }
}
