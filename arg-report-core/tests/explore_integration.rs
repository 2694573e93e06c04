//! End-to-end exploration runs over temporary data trees.
//!
//! Each test lays out a small simulation directory, writes a parameters file
//! into it, runs the explorator with a fixed date and author, then inspects
//! both the returned report and the structure file on disk.

use arg_report_core::error::{ConfigurationError, ExploreError};
use arg_report_core::explore::{explore_on, ExploreReport};
use arg_report_core::parameters::Parameters;
use arg_report_core::types::TypeTables;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use serde_yaml::Value;
use std::fs::{create_dir_all, write, File};
use std::path::Path;
use tempfile::{tempdir, TempDir};

fn touch(root: &Path, names: &[&str]) {
    for name in names {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            create_dir_all(parent).unwrap();
        }
        File::create(path).unwrap();
    }
}

/// Data directory `data/`, output directory `out/`, parameters file
/// `data/deck.yml` holding `extra` after the common keys.
fn layout(files: &[&str], extra: &str) -> (TempDir, std::path::PathBuf) {
    let tmp = tempdir().unwrap();
    let data = tmp.path().join("data");
    create_dir_all(&data).unwrap();
    touch(&data, files);
    let params = data.join("deck.yml");
    let yaml = format!(
        "data: '{}'\noutput: '{}'\nstructure: structure.yml\n{extra}",
        data.display(),
        tmp.path().join("out").display()
    );
    write(&params, yaml).unwrap();
    (tmp, params)
}

fn run(params: &Path) -> Result<ExploreReport, ExploreError> {
    let tables = TypeTables::default();
    let mut parameters = Parameters::from_file(params, &tables)?.parameters;
    let today = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
    explore_on(&mut parameters, &tables, today, "analyst")
}

fn structure(report: &ExploreReport) -> Value {
    let text = std::fs::read_to_string(&report.structure_file).unwrap();
    serde_yaml::from_str(&text).unwrap()
}

fn chapter_titles(doc: &Value) -> Vec<String> {
    doc["chapters"]
        .as_sequence()
        .unwrap()
        .iter()
        .map(|c| c["title"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn mesh_and_geometry_yield_three_chapters_with_sorted_stl_files() {
    let (_tmp, params) = layout(
        &["model.e", "geom/part2.stl", "geom/part1.stl"],
        "geometry_root: geom\n",
    );
    let report = run(&params).unwrap();
    assert_eq!(report.chapters, 3);
    assert!(report.case.deck_files.is_empty(), "active parameters file must not be a deck");

    let doc = structure(&report);
    assert_eq!(chapter_titles(&doc), vec!["Introduction", "Geometry", "ExodusII Mesh"]);

    let cad_sections = doc["chapters"][1]["sections"].as_sequence().unwrap();
    let files = cad_sections
        .iter()
        .find(|s| s["title"] == Value::from("Geometry Files"))
        .unwrap();
    let models: Vec<&str> = files["sections"]
        .as_sequence()
        .unwrap()
        .iter()
        .filter(|d| d["n"] == Value::from("aggregate"))
        .map(|d| d["model"].as_str().unwrap())
        .collect();
    assert_eq!(models, vec!["geom/part1.stl", "geom/part2.stl"]);
}

#[test]
fn chapters_follow_fixed_order_with_dense_indices() {
    let (_tmp, params) = layout(
        &[
            "geom/a.stl",
            "mesh.e",
            "out/s1.e.2.0",
            "out/s1.e.2.1",
            "out/s2.e.2.0",
            "out/s2.e.2.1",
            "plot.png",
        ],
        "geometry_root: geom\nverbosity: default\n",
    );
    let report = run(&params).unwrap();
    let doc = structure(&report);
    assert_eq!(
        chapter_titles(&doc),
        vec![
            "Introduction",
            "Geometry",
            "ExodusII Mesh",
            "S1 Solution",
            "S2 Solution",
            "Stand-Alone Artifacts"
        ]
    );
    assert_eq!(doc["chapters"][0]["n"], Value::from("chapter_null"));
}

#[test]
fn string_fragment_is_last_directive_of_its_section() {
    let (_tmp, params) = layout(
        &["geom/a.stl", "mesh.e"],
        "geometry_root: geom\ninsert_in:\n  - location: \"2.1\"\n    string: [hello]\n",
    );
    let report = run(&params).unwrap();
    let doc = structure(&report);
    // Chapter 2 is the mesh chapter; its first node is the body paragraph.
    let nodes = doc["chapters"][2]["sections"].as_sequence().unwrap();
    let overview = nodes.iter().find(|n| n["n"] == Value::from("section")).unwrap();
    assert_eq!(overview["title"], Value::from("Overview"));
    let directives = overview["sections"].as_sequence().unwrap();
    let last = directives.last().unwrap();
    assert_eq!(last["n"], Value::from("paragraph"));
    assert_eq!(last["string"], Value::from("hello"));
    assert_eq!(directives.len(), 3);
}

#[test]
fn rerun_keeps_first_mutables() {
    let (tmp, params) = layout(&["model.e"], "");
    let first = run(&params).unwrap();
    let second = run(&params).unwrap();
    assert_eq!(first.mutables, second.mutables);
    assert_eq!(first.mutables.get("title"), Some(&Value::from("ARG Report")));
    assert_eq!(first.mutables.get("month"), Some(&Value::from("May")));
    assert!(tmp.path().join("out/mutables.yml").is_file());
}

#[test]
fn mappings_without_geometry_abort_before_writing() {
    let (tmp, params) = layout(
        &["model.e"],
        "mappings:\n  CAD_to_FEM:\n    elements:\n      part1: block_1\n",
    );
    let err = run(&params).unwrap_err();
    assert!(matches!(
        err,
        ExploreError::Configuration(ConfigurationError::MappingsWithoutGeometry)
    ));
    assert!(!tmp.path().join("out/structure.yml").exists());
}

#[test]
fn mismatched_factors_are_absent_from_mapping_section() {
    let (_tmp, params) = layout(
        &["geom/part1.stl", "geom/part2.stl"],
        "geometry_root: geom\nmappings:\n  CAD_to_FEM:\n    elements:\n      part1: block_1\n    factors:\n      part1: '1.0'\n      part2: '2.0'\n      part3: '3.0'\n",
    );
    let report = run(&params).unwrap();
    let doc = structure(&report);
    let mapping_section = &doc["chapters"][1]["sections"][0];
    assert_eq!(
        mapping_section["title"],
        Value::from("Geometry to Finite Elements Elements Mapping")
    );
    let aggregate = &mapping_section["sections"][0];
    assert_eq!(aggregate["name"], Value::from("show_all_mappings"));
    assert!(aggregate.get("factors").is_none());
    assert!(aggregate.get("geometry_root").is_none());
}

#[test]
fn factors_stay_keyed_by_part_in_declaration_order() {
    let (_tmp, params) = layout(
        &["geom/part1.stl", "geom/part2.stl"],
        "geometry_root: geom\nmappings:\n  CAD_to_FEM:\n    elements:\n      part1: block_1\n      part2: block_2\n    factors:\n      part2: '2.0'\n      part1: '0.5'\n",
    );
    let report = run(&params).unwrap();
    let doc = structure(&report);
    let aggregate = &doc["chapters"][1]["sections"][0]["sections"][0];
    let factors = aggregate["factors"].as_mapping().expect("factors is a mapping");
    assert_eq!(factors.get("part1"), Some(&Value::from("0.5")));
    assert_eq!(factors.get("part2"), Some(&Value::from("2.0")));
    let parts: Vec<_> = factors.keys().filter_map(Value::as_str).collect();
    assert_eq!(parts, vec!["part2", "part1"]);
    assert_eq!(aggregate["geometry_root"], Value::from("geom"));
}

#[test]
fn partition_shards_group_into_one_solution() {
    let (_tmp, params) = layout(
        &["res/case.e.4.2", "res/case.e.4.0", "res/case.e.4.3", "res/case.e.4.1"],
        "",
    );
    let report = run(&params).unwrap();
    assert_eq!(report.case.mesh_partitions, vec!["res/case.e.4"]);
    assert_eq!(report.case.solutions.len(), 1);
    assert_eq!(chapter_titles(&structure(&report)), vec!["Introduction", "Case Solution"]);
}

#[test]
fn trailer_is_appended_after_synthesized_chapters() {
    let (tmp, params) = layout(&["model.e"], "");
    let trailer = tmp.path().join("end.yml");
    write(&trailer, "- n: chapter\n  title: Results\n  sections: []\n").unwrap();
    let mut text = std::fs::read_to_string(&params).unwrap();
    text.push_str(&format!("structure_end: '{}'\n", trailer.display()));
    write(&params, text).unwrap();

    let report = run(&params).unwrap();
    let titles = chapter_titles(&structure(&report));
    assert_eq!(titles.last().map(String::as_str), Some("Results"));
    assert_eq!(report.chapters, 2);
}
