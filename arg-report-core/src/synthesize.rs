//! Structure synthesizer: turns a resolved [`Case`] into the chapter tree of
//! the report.
//!
//! Chapters are emitted in a fixed order (introduction, geometry, mesh, one
//! per solution, stand-alone artifacts), each only when its data is present.
//! Chapter indices are dense over the emitted chapters; section index 0 is
//! the chapter body. Analyst fragments are appended to the subdivision they
//! target once the synthesized directives are in place.

use serde_yaml::{Mapping, Value};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::case::{set_element, set_title, to_forward_slashes, Case, Fragment, Solution};
use crate::contract::Backend;
use crate::error::ConfigurationError;
use crate::parameters::Parameters;
use crate::resolve::reported_solution_name;
use crate::structure::{
    Aggregate, Chapter, ChapterKind, Directive, Figure, FigureArguments, Itemize, ItemizeItem, Meta,
    Narrative, Paragraph, Section, StructureDocument, TitleDirective,
};
use crate::types::TypeTables;

/// Title directive emitted when no title is configured but an input deck
/// type is known: the renderer then derives the title from the deck.
pub fn title_directive(case: &Case, parameters: &Parameters) -> Option<TitleDirective> {
    if parameters.title.as_deref().is_some_and(|t| !t.is_empty()) {
        return None;
    }
    match (&case.deck_type, &case.deck_root) {
        (Some(datatype), Some(dataset)) => Some(TitleDirective {
            datatype: datatype.clone(),
            dataset: dataset.clone(),
        }),
        _ => None,
    }
}

/// Build the full structure document for `case`.
pub fn synthesize(
    case: &Case,
    parameters: &Parameters,
    tables: &TypeTables,
    backend: &dyn Backend,
) -> Result<StructureDocument, ConfigurationError> {
    let mut synthesizer = Synthesizer {
        case,
        backend,
        chapters: Vec::new(),
    };

    synthesizer.push(introduction_chapter(case));

    if !case.geometry_files.is_empty() {
        synthesizer.push(cad_chapter(case));
    } else if !case.mappings.is_empty() {
        return Err(ConfigurationError::MappingsWithoutGeometry);
    }

    if let (Some(mesh_type), Some(mesh_name)) = (&case.mesh_type, &case.mesh_name) {
        let blocks = parameters.verbosity > tables.terse();
        synthesizer.push(mesh_chapter(case, mesh_type, mesh_name, blocks));
    }

    for solution in &case.solutions {
        synthesizer.push(solution_chapter(case, solution, backend));
    }

    let has_artifacts = !case.standalone_images.is_empty() || !case.standalone_text_files.is_empty();
    if parameters.verbosity > tables.terse() && has_artifacts {
        synthesizer.push(stand_alone_chapter(case, backend));
    }

    synthesizer.warn_unplaced_fragments();
    Ok(StructureDocument {
        version: crate::VERSION.to_string(),
        title: title_directive(case, parameters),
        chapters: synthesizer.chapters,
    })
}

struct Synthesizer<'a> {
    case: &'a Case,
    backend: &'a dyn Backend,
    chapters: Vec<Chapter>,
}

impl Synthesizer<'_> {
    fn push(&mut self, mut chapter: Chapter) {
        let index = self.chapters.len();
        info!(index, title = %chapter.title, sections = chapter.sections.len(), "Inserting chapter");
        let fragments = &self.case.fragments;
        insert_fragments(&mut chapter.body, fragments.at(index, 0), (index, 0), self.backend);
        for (i, section) in chapter.sections.iter_mut().enumerate() {
            let location = (index, i + 1);
            insert_fragments(&mut section.directives, fragments.at(location.0, location.1), location, self.backend);
        }
        self.chapters.push(chapter);
    }

    fn warn_unplaced_fragments(&self) {
        for (chapter, section) in self.case.fragments.locations() {
            let placed = self
                .chapters
                .get(chapter)
                .is_some_and(|c| c.directives_at(section).is_some());
            if !placed {
                warn!(chapter, section, "*  WARNING: no subdivision {chapter}.{section} in the report, ignoring its fragments");
            }
        }
    }
}

fn insert_fragments(
    directives: &mut Vec<Directive>,
    fragments: &[Fragment],
    (chapter, section): (usize, usize),
    backend: &dyn Backend,
) {
    for fragment in fragments {
        match fragment.kind.as_str() {
            "string" => {
                for text in &fragment.values {
                    debug!(chapter, section, text = %text, "Inserting string fragment");
                    directives.push(Directive::Paragraph(Paragraph::string(text.as_str())));
                }
            }
            "image" => {
                for image in &fragment.values {
                    debug!(chapter, section, image = %image, "Inserting image fragment");
                    directives.push(figure(image, backend));
                }
            }
            other => warn!(kind = other, "*  WARNING: ignoring unsupported fragment type: {other}"),
        }
    }
}

fn figure(image: &str, backend: &dyn Backend) -> Directive {
    let label = image.replace('\\', "/");
    Directive::Figure(Figure {
        arguments: FigureArguments {
            width: "12cm".to_string(),
            figure_file: image.to_string(),
            caption_string: format!("File {}", backend.generate_text(&label)),
            label: format!("f:{label}"),
        },
    })
}

fn introduction_chapter(case: &Case) -> Chapter {
    let mut chapter = Chapter::new(
        ChapterKind::Unnumbered,
        "Introduction",
        Narrative::Plain(
            "The structure of this report was built by the Explorator component of ARG, \
             which explored the following directory:"
                .to_string(),
        ),
    );
    chapter
        .body
        .push(Directive::Paragraph(Paragraph::verbatim(case.real_data_dir_text())));
    if case.discovered_data.is_empty() {
        chapter
            .body
            .push(Directive::Paragraph(Paragraph::string("No relevant data was discovered.")));
    } else {
        chapter.body.push(Directive::Paragraph(Paragraph::string(
            "and discovered the following relevant data:",
        )));
        chapter.body.push(Directive::Itemize(Itemize {
            items: case
                .discovered_data
                .items()
                .into_iter()
                .map(|string| ItemizeItem { string })
                .collect(),
        }));
    }
    chapter
}

/// Directory part of a data-relative path.
fn dirname(relative: &str) -> String {
    Path::new(relative)
        .parent()
        .map(to_forward_slashes)
        .unwrap_or_default()
}

fn pairs_to_mapping(pairs: &[(String, String)]) -> Mapping {
    pairs
        .iter()
        .map(|(k, v)| (Value::from(k.as_str()), Value::from(v.as_str())))
        .collect()
}

fn cad_chapter(case: &Case) -> Chapter {
    let mut chapter = Chapter::new(
        ChapterKind::Numbered,
        "Geometry",
        Narrative::Plain("This chapter describes the geometry as specified in the parameters file.".to_string()),
    );
    let first_geometry = case.geometry_files.first().map(String::as_str).unwrap_or_default();
    let geometry_dir = case.real_dir_of(first_geometry);

    let declared = case.mappings.declared();
    if declared.is_empty() {
        warn!("*  WARNING: missing CAD/FEM mapping.");
    }
    for (direction, spec) in declared {
        let (src, dst) = direction.sets();
        let (src_element, dst_element) = (set_element(src), set_element(dst));
        let mut section = Section::new(
            format!("{} to {} Elements Mapping", set_title(src), set_title(dst)),
            Narrative::Plain(format!(
                "This section describes the mapping from {src} {src_element}s to {dst} {dst_element}s:"
            )),
        );
        let mut aggregate = Aggregate::new("show_all_mappings")
            .with("datatype", direction.data_type())
            .with("dataset", Value::Mapping(pairs_to_mapping(&spec.elements)))
            .with("src_name", src_element)
            .with("dst_name", dst_element);
        if let Some(log) = &case.log_file {
            aggregate = aggregate.with("logfile", log.as_str());
        }
        if let Some(factors) = spec.factors.as_ref().filter(|f| f.len() == case.geometry_files.len()) {
            aggregate = aggregate
                .with("factors", Value::Mapping(pairs_to_mapping(factors)))
                .with("geometry_root", dirname(first_geometry));
        }
        section.directives.push(Directive::Aggregate(aggregate));
        chapter.sections.push(section);
    }

    let mut files = Section::new(
        "Geometry Files",
        Narrative::Plain("This section provides an overview of the geometry files found in:".to_string()),
    );
    files
        .directives
        .push(Directive::Paragraph(Paragraph::verbatim(geometry_dir.as_str())));
    for stl in &case.geometry_files {
        files.directives.push(Directive::Aggregate(
            Aggregate::new("show_mesh_surface")
                .with("model", stl.as_str())
                .with("datatype", "vtkSTL")
                .with("width", "12cm")
                .with("axes", true)
                .with("merge", true),
        ));
    }
    chapter.sections.push(files);

    if !case.cad_parameter_files.is_empty() && !case.metadata.is_empty() {
        let mut metadata = Section::new(
            "CAD metadata",
            Narrative::Plain("This section describes the CAD metadata found in:".to_string()),
        );
        metadata
            .directives
            .push(Directive::Paragraph(Paragraph::verbatim(geometry_dir.as_str())));
        metadata.directives.push(Directive::Aggregate(
            Aggregate::new("show_CAD_metadata")
                .with("datatype", "vtkSTL")
                .with("metadata", case.metadata.clone())
                .with("parameters_root", geometry_dir.as_str()),
        ));
        chapter.sections.push(metadata);
    }
    chapter
}

/// Capitalize the first letter of each whitespace-separated word.
fn capitalize_words(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Upper-case every letter that follows a non-letter, lower-case the rest.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_is_letter = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            out.push(c);
            previous_is_letter = false;
        }
    }
    out
}

fn mesh_chapter(case: &Case, mesh_type: &str, mesh_name: &str, with_blocks: bool) -> Chapter {
    let mut chapter = Chapter::new(
        ChapterKind::Numbered,
        format!("{} Mesh", capitalize_words(mesh_type)),
        Narrative::Plain(format!("This chapter describes the {mesh_type} mesh in:")),
    );
    chapter.body.push(Directive::Paragraph(Paragraph::verbatim(to_forward_slashes(
        &case.real_data_dir.join(mesh_name),
    ))));

    let mut overview = Section::new(
        "Overview",
        Narrative::Plain(format!(
            "This section provides an overview of the meta-data and global properties of this {mesh_type} mesh."
        )),
    );
    overview.directives.push(Directive::Meta(Meta {
        datatype: mesh_type.to_string(),
        dataset: mesh_name.to_string(),
        verbosity: None,
    }));
    let mut surface = Aggregate::new("show_mesh_surface")
        .with("model", mesh_name)
        .with("datatype", "ExodusII")
        .with("var_name", "ObjectId")
        .with("width", "16cm")
        .with("axes", true);
    if !case.ignored_blocks.is_empty() {
        surface = surface.with("ignore_blocks", case.ignored_blocks.clone());
    }
    overview.directives.push(Directive::Aggregate(surface));
    chapter.sections.push(overview);

    if with_blocks {
        let mut blocks = Section::new(
            "Mesh Blocks",
            Narrative::Plain("This section provides a description of all blocks contained in the mesh.".to_string()),
        );
        let mut aggregate = Aggregate::new("show_all_blocks_with_edges")
            .with("datatype", "ExodusII")
            .with("model", mesh_name);
        if let (Some(deck_type), Some(deck_root)) = (&case.deck_type, &case.deck_root) {
            aggregate = aggregate
                .with("deck_datatype", deck_type.as_str())
                .with("deckfile", deck_root.as_str());
        }
        if let Some(log) = &case.log_file {
            aggregate = aggregate.with("logfile", log.as_str());
        }
        aggregate = aggregate
            .with("width", "10cm")
            .with("histogram_width", "14cm")
            .with("axes", true);
        if !case.ignored_blocks.is_empty() {
            aggregate = aggregate.with("ignore_blocks", case.ignored_blocks.clone());
        }
        blocks.directives.push(Directive::Aggregate(aggregate));
        chapter.sections.push(blocks);
    }
    chapter
}

fn solution_chapter(case: &Case, solution: &Solution, backend: &dyn Backend) -> Chapter {
    let directory = backend.generate_text(&case.real_data_dir_text());
    let mut chapter = Chapter::new(
        ChapterKind::Numbered,
        format!("{} Solution", title_case(&solution.method)),
        Narrative::Markup(format!(
            "This chapter describes the {} solution found in the following directory: {directory}.",
            backend.generate_text(&solution.method)
        )),
    );
    let mut meta = Section::new(
        "Meta-Data",
        Narrative::Markup(format!(
            "This section lists the meta-information properties found in {}.",
            backend.generate_text(&reported_solution_name(solution))
        )),
    );
    meta.directives.push(Directive::Meta(Meta {
        datatype: solution.kind.datatype().to_string(),
        dataset: solution.name.clone(),
        verbosity: Some(0),
    }));
    chapter.sections.push(meta);
    chapter
}

fn stand_alone_chapter(case: &Case, backend: &dyn Backend) -> Chapter {
    let directory = backend.generate_text(&case.real_data_dir_text());
    let mut chapter = Chapter::new(
        ChapterKind::Numbered,
        "Stand-Alone Artifacts",
        Narrative::Markup(format!(
            "This chapter integrates all standalone images and text fragments found in the following directory: {directory}."
        )),
    );

    if !case.standalone_images.is_empty() {
        let mut images = Section::new(
            "PNG Images",
            Narrative::Markup(format!(
                "This section shows all stand-alone PNG images found in the following directory: {directory}."
            )),
        );
        let mut sorted = case.standalone_images.clone();
        sorted.sort();
        for image in &sorted {
            info!(image = %image, "Including image");
            images.directives.push(figure(image, backend));
        }
        chapter.sections.push(images);
    }

    if !case.standalone_text_files.is_empty() {
        let mut texts = Section::new(
            "Text Fragments",
            Narrative::Markup(format!(
                "This section shows all stand-alone text fragments found in the following directory: {directory}."
            )),
        );
        let mut sorted = case.standalone_text_files.clone();
        sorted.sort();
        for text in &sorted {
            info!(text = %text, "Including text fragment");
            texts
                .directives
                .push(Directive::Paragraph(Paragraph::include(to_forward_slashes(&case.data_path(text)))));
        }
        chapter.sections.push(texts);
    }
    chapter
}
