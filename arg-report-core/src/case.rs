//! The explorator case: everything one exploration run discovers and
//! resolves, plus the user overrides that steer it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::parameters::Parameters;

/// Data format of a discovered solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionType {
    ExodusIIFile,
    ExodusIIPartition,
}

impl SolutionType {
    /// Reader name handed to the rendering backend.
    pub fn datatype(&self) -> &'static str {
        "ExodusII"
    }

    pub fn is_partition(&self) -> bool {
        matches!(self, SolutionType::ExodusIIPartition)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub kind: SolutionType,
    /// Relative path of the file, or the stem shared by the partition shards.
    pub name: String,
    pub method: String,
}

/// A user-declared solution case: the stem to look for and, optionally, the
/// solution method it represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionCase {
    pub stem: String,
    pub method: Option<String>,
}

/// Direction of a CAD/FEM element mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingDirection {
    CadToFem,
    FemToCad,
}

impl MappingDirection {
    pub fn data_type(&self) -> &'static str {
        match self {
            MappingDirection::CadToFem => "CAD_to_FEM",
            MappingDirection::FemToCad => "FEM_to_CAD",
        }
    }

    /// (source, destination) set names.
    pub fn sets(&self) -> (&'static str, &'static str) {
        match self {
            MappingDirection::CadToFem => ("CAD", "FEM"),
            MappingDirection::FemToCad => ("FEM", "CAD"),
        }
    }
}

/// Element label of a mapping set: CAD parts map to FEM blocks.
pub fn set_element(set: &str) -> &'static str {
    match set {
        "CAD" => "part",
        "FEM" => "block",
        _ => "item",
    }
}

/// Human-readable title of a mapping set.
pub fn set_title(set: &str) -> &str {
    match set {
        "CAD" => "Geometry",
        "FEM" => "Finite Elements",
        other => other,
    }
}

/// Element pairs and optional per-element scale factors, both in
/// declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingSpec {
    pub elements: Vec<(String, String)>,
    /// Source element -> factor.
    pub factors: Option<Vec<(String, String)>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mappings {
    pub cad_to_fem: Option<MappingSpec>,
    pub fem_to_cad: Option<MappingSpec>,
}

impl Mappings {
    /// Declared mappings that carry at least one element pair, CAD to FEM first.
    pub fn declared(&self) -> Vec<(MappingDirection, &MappingSpec)> {
        [
            (MappingDirection::CadToFem, self.cad_to_fem.as_ref()),
            (MappingDirection::FemToCad, self.fem_to_cad.as_ref()),
        ]
        .into_iter()
        .filter_map(|(dir, spec)| spec.filter(|s| !s.elements.is_empty()).map(|s| (dir, s)))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.cad_to_fem.is_none() && self.fem_to_cad.is_none()
    }
}

/// An analyst-authored insertion: a kind (`string` or `image`) and its values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub kind: String,
    pub values: Vec<String>,
}

/// Fragments keyed by (chapter index, section index), in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentTable {
    entries: BTreeMap<(usize, usize), Vec<Fragment>>,
}

impl FragmentTable {
    pub fn insert(&mut self, chapter: usize, section: usize, fragment: Fragment) {
        self.entries.entry((chapter, section)).or_default().push(fragment);
    }

    pub fn at(&self, chapter: usize, section: usize) -> &[Fragment] {
        self.entries
            .get(&(chapter, section))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every `(chapter, section)` coordinate carrying fragments.
    pub fn locations(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Ordered summary of discovered data: category label -> description(s).
/// Rendered verbatim, label immediately followed by each description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredData {
    entries: Vec<(String, Vec<String>)>,
}

impl DiscoveredData {
    /// Replace the descriptions of `label` with a single one.
    pub fn set(&mut self, label: &str, description: String) {
        match self.entries.iter_mut().find(|(l, _)| l == label) {
            Some((_, descriptions)) => *descriptions = vec![description],
            None => self.entries.push((label.to_string(), vec![description])),
        }
    }

    /// Append one more description to `label`.
    pub fn push(&mut self, label: &str, description: String) {
        match self.entries.iter_mut().find(|(l, _)| l == label) {
            Some((_, descriptions)) => descriptions.push(description),
            None => self.entries.push((label.to_string(), vec![description])),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One line per description, in insertion order.
    pub fn items(&self) -> Vec<String> {
        self.entries
            .iter()
            .flat_map(|(label, descriptions)| {
                descriptions.iter().map(move |d| format!("{label}{d}"))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Case {
    pub data_dir: PathBuf,
    /// Canonical form of `data_dir`, narrated in the report.
    pub real_data_dir: PathBuf,

    // Discovery lists, relative to `data_dir` with `/` separators.
    pub deck_files: Vec<String>,
    pub mesh_files: Vec<String>,
    /// Partition stems in discovery order, without duplicates.
    pub mesh_partitions: Vec<String>,
    pub log_files: Vec<String>,
    pub standalone_images: Vec<String>,
    pub standalone_text_files: Vec<String>,

    // Resolved values.
    pub mesh_type: Option<String>,
    pub mesh_name: Option<String>,
    pub deck_type: Option<String>,
    pub deck_root: Option<String>,
    pub log_file: Option<String>,
    pub geometry_files: Vec<String>,
    pub cad_parameter_files: Vec<String>,
    pub solutions: Vec<Solution>,
    pub discovered_data: DiscoveredData,

    // User overrides.
    pub mappings: Mappings,
    pub metadata: Vec<String>,
    pub ignored_blocks: Vec<String>,
    pub solution_cases: Vec<SolutionCase>,
    pub fragments: FragmentTable,
}

impl Case {
    /// An empty case rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let real_data_dir = std::fs::canonicalize(&data_dir).unwrap_or_else(|_| data_dir.clone());
        Case {
            data_dir,
            real_data_dir,
            ..Default::default()
        }
    }

    /// An empty case carrying the overrides declared in `parameters`.
    pub fn from_parameters(parameters: &Parameters) -> Self {
        let mut case = Case::new(&parameters.data_dir);
        case.mappings = parameters.mappings.clone();
        case.metadata = parameters.reported_cad_metadata.clone();
        case.ignored_blocks = parameters.ignored_blocks.clone();
        case.solution_cases = parameters.solution_cases.clone();
        case.fragments = parameters.fragments.clone();
        case
    }

    /// Record a partition stem unless it is already known.
    pub fn add_partition_stem(&mut self, stem: String) {
        if !self.mesh_partitions.contains(&stem) {
            debug!(stem = %stem, "New mesh partition stem");
            self.mesh_partitions.push(stem);
        }
    }

    /// Absolute path of a data-relative file.
    pub fn data_path(&self, relative: &str) -> PathBuf {
        self.data_dir.join(relative)
    }

    /// `real_data_dir` joined with the directory part of a data-relative path,
    /// as narrated in verbatim paragraphs.
    pub fn real_dir_of(&self, relative: &str) -> String {
        let parent = Path::new(relative).parent().unwrap_or_else(|| Path::new(""));
        to_forward_slashes(&self.real_data_dir.join(parent))
    }

    /// `real_data_dir` as text with `/` separators.
    pub fn real_data_dir_text(&self) -> String {
        to_forward_slashes(&self.real_data_dir)
    }
}

/// Render a path with `/` separators regardless of platform, dropping a
/// trailing separator.
pub fn to_forward_slashes(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    match text.strip_suffix('/') {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => text,
    }
}
