//! File classifier: walks the data directory and sorts every regular file
//! into one of the discovery lists of a [`Case`], by name only.

use std::path::Path;
use tracing::{debug, info, warn};

use crate::case::Case;
use crate::error::ConfigurationError;

const DECK_EXTENSIONS: &[&str] = &["i", "in", "inp", "yml", "yaml"];
const EXODUS_EXTENSIONS: &[&str] = &["e", "g", "ex2", "exo"];
const LOG_EXTENSIONS: &[&str] = &["log", "rslt"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Deck,
    Mesh,
    MeshPartition,
    Log,
    Image,
    Text,
}

/// Inputs of a classification pass besides the directory tree.
#[derive(Debug, Clone, Default)]
pub struct ClassifyOptions {
    /// Stand-alone images and text fragments are only collected when set
    /// (verbosity above terse).
    pub collect_standalone: bool,
    /// Data-relative paths never treated as input decks: the active
    /// parameters and mutables files.
    pub excluded: Vec<String>,
}

/// Classify one data-relative path (with `/` separators).
pub fn classify_name(relative: &str, options: &ClassifyOptions) -> Option<FileKind> {
    let file_name = relative.rsplit('/').next().unwrap_or(relative);
    let segments: Vec<&str> = file_name.split('.').collect();
    let (last, ante_penult) = if segments.len() > 1 {
        let last = segments[segments.len() - 1].to_lowercase();
        let ante_penult = if segments.len() > 3 {
            segments[segments.len() - 3].to_lowercase()
        } else {
            String::new()
        };
        (last, ante_penult)
    } else {
        (String::new(), String::new())
    };

    if DECK_EXTENSIONS.contains(&last.as_str()) {
        if options.excluded.iter().any(|e| e == relative) {
            return None;
        }
        Some(FileKind::Deck)
    } else if EXODUS_EXTENSIONS.contains(&last.as_str()) {
        Some(FileKind::Mesh)
    } else if EXODUS_EXTENSIONS.contains(&ante_penult.as_str()) {
        Some(FileKind::MeshPartition)
    } else if LOG_EXTENSIONS.contains(&last.as_str()) {
        Some(FileKind::Log)
    } else if options.collect_standalone && last == "png" {
        Some(FileKind::Image)
    } else if options.collect_standalone && last == "txt" {
        Some(FileKind::Text)
    } else {
        None
    }
}

/// Recursively classify every regular file below `case.data_dir`.
///
/// Entries are visited in file-name order within each directory, so the
/// discovery lists are deterministic for an unchanged tree. Symbolic links
/// to directories are followed without loop detection.
pub fn discover(case: &mut Case, options: &ClassifyOptions) -> Result<(), ConfigurationError> {
    let root = case.data_dir.clone();
    if !root.is_dir() {
        return Err(ConfigurationError::DataDirNotFound(root));
    }
    info!(path = %root.display(), "Searching supported files");

    fn visit_dir(dir: &Path, root: &Path, case: &mut Case, options: &ClassifyOptions) {
        let mut entries: Vec<_> = match std::fs::read_dir(dir) {
            Ok(read) => read.filter_map(Result::ok).map(|e| e.path()).collect(),
            Err(e) => {
                warn!(error = ?e, path = %dir.display(), "*  WARNING: could not read directory, skipping it");
                return;
            }
        };
        entries.sort();
        for path in entries {
            if path.is_dir() {
                visit_dir(&path, root, case, options);
            } else if path.is_file() {
                let Ok(rel_path) = path.strip_prefix(root) else {
                    continue;
                };
                let relative = rel_path
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                record(case, relative, options);
            }
        }
    }
    visit_dir(&root, &root, case, options);

    info!(
        decks = case.deck_files.len(),
        meshes = case.mesh_files.len(),
        partitions = case.mesh_partitions.len(),
        logs = case.log_files.len(),
        images = case.standalone_images.len(),
        texts = case.standalone_text_files.len(),
        "Completed search of supported files"
    );
    Ok(())
}

fn record(case: &mut Case, relative: String, options: &ClassifyOptions) {
    let Some(kind) = classify_name(&relative, options) else {
        return;
    };
    debug!(file = %relative, ?kind, "Classified file");
    match kind {
        FileKind::Deck => case.deck_files.push(relative),
        FileKind::Mesh => case.mesh_files.push(relative),
        FileKind::MeshPartition => {
            let stem = relative
                .rsplit_once('.')
                .map(|(stem, _)| stem.to_string())
                .unwrap_or(relative);
            case.add_partition_stem(stem);
        }
        FileKind::Log => case.log_files.push(relative),
        FileKind::Image => {
            info!(file = %relative, "Found stand-alone image");
            case.standalone_images.push(relative);
        }
        FileKind::Text => {
            info!(file = %relative, "Found stand-alone text fragment");
            case.standalone_text_files.push(relative);
        }
    }
}
