//! The report structure document: chapters, sections and leaf directives.
//!
//! The tree is built completely in memory and serialized afterwards. The
//! YAML layout is the contract with the rendering backend:
//!
//! ```yaml
//! ARG version: 0.1.0
//! title:
//!   datatype: SierraInput
//!   dataset: deck.i
//! chapters:
//! - n: chapter
//!   title: Geometry
//!   string: 'This chapter describes...'
//!   sections:
//!   - n: paragraph        # chapter-level directives (section index 0)
//!     string: ...
//!   - n: section          # sections 1, 2, ...
//!     title: Geometry Files
//!     sections:
//!     - n: aggregate
//!       name: show_mesh_surface
//! ```

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_yaml::{Mapping, Value};

/// Narrative text of a chapter or section: plain text, or text already
/// carrying backend markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Narrative {
    Plain(String),
    Markup(String),
}

impl Narrative {
    fn key(&self) -> &'static str {
        match self {
            Narrative::Plain(_) => "string",
            Narrative::Markup(_) => "latex",
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Narrative::Plain(t) | Narrative::Markup(t) => t,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paragraph {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbatim: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,
}

impl Paragraph {
    pub fn string(text: impl Into<String>) -> Self {
        Paragraph {
            string: Some(text.into()),
            verbatim: None,
            include: None,
        }
    }

    pub fn verbatim(text: impl Into<String>) -> Self {
        Paragraph {
            string: None,
            verbatim: Some(text.into()),
            include: None,
        }
    }

    pub fn include(path: impl Into<String>) -> Self {
        Paragraph {
            string: None,
            verbatim: None,
            include: Some(path.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemizeItem {
    pub string: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Itemize {
    pub items: Vec<ItemizeItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FigureArguments {
    pub width: String,
    pub figure_file: String,
    pub caption_string: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub arguments: FigureArguments,
}

/// A named visualization request with ordered parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregate {
    pub name: String,
    #[serde(flatten)]
    pub parameters: Mapping,
}

impl Aggregate {
    pub fn new(name: impl Into<String>) -> Self {
        Aggregate {
            name: name.into(),
            parameters: Mapping::new(),
        }
    }

    /// Append (or replace) a parameter.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.parameters.insert(Value::String(key.to_string()), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }
}

/// Dataset-level key/value listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Meta {
    pub datatype: String,
    pub dataset: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbosity: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "n", rename_all = "snake_case")]
pub enum Directive {
    Paragraph(Paragraph),
    Itemize(Itemize),
    Figure(Figure),
    Aggregate(Aggregate),
    Meta(Meta),
}

impl Directive {
    pub fn kind(&self) -> &'static str {
        match self {
            Directive::Paragraph(_) => "paragraph",
            Directive::Itemize(_) => "itemize",
            Directive::Figure(_) => "figure",
            Directive::Aggregate(_) => "aggregate",
            Directive::Meta(_) => "meta",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: String,
    pub narrative: Option<Narrative>,
    pub directives: Vec<Directive>,
}

impl Section {
    pub fn new(title: impl Into<String>, narrative: Narrative) -> Self {
        Section {
            title: title.into(),
            narrative: Some(narrative),
            directives: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterKind {
    /// Unnumbered chapter (the introduction).
    Unnumbered,
    Numbered,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chapter {
    pub kind: ChapterKind,
    pub title: String,
    pub narrative: Option<Narrative>,
    /// Chapter-level directives, i.e. section index 0.
    pub body: Vec<Directive>,
    pub sections: Vec<Section>,
}

impl Chapter {
    pub fn new(kind: ChapterKind, title: impl Into<String>, narrative: Narrative) -> Self {
        Chapter {
            kind,
            title: title.into(),
            narrative: Some(narrative),
            body: Vec::new(),
            sections: Vec::new(),
        }
    }

    /// Directives at a section index: 0 is the chapter body, `i` is the
    /// `i`-th section.
    pub fn directives_at(&self, section_index: usize) -> Option<&[Directive]> {
        match section_index {
            0 => Some(&self.body),
            i => self.sections.get(i - 1).map(|s| s.directives.as_slice()),
        }
    }
}

/// Title directive: the renderer derives the report title from a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TitleDirective {
    pub datatype: String,
    pub dataset: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructureDocument {
    pub version: String,
    pub title: Option<TitleDirective>,
    pub chapters: Vec<Chapter>,
}

impl StructureDocument {
    pub fn chapter_titles(&self) -> Vec<&str> {
        self.chapters.iter().map(|c| c.title.as_str()).collect()
    }

    /// Serialize to the YAML structure file layout, appending `trailer`
    /// verbatim when given.
    pub fn to_yaml(&self, trailer: Option<&str>) -> Result<String, serde_yaml::Error> {
        let mut text = serde_yaml::to_string(self)?;
        if let Some(trailer) = trailer {
            if !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(trailer);
        }
        Ok(text)
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum Node<'a> {
    Directive(&'a Directive),
    Section(&'a Section),
}

impl Serialize for Section {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("n", "section")?;
        map.serialize_entry("title", &self.title)?;
        if let Some(narrative) = &self.narrative {
            map.serialize_entry(narrative.key(), narrative.text())?;
        }
        map.serialize_entry("sections", &self.directives)?;
        map.end()
    }
}

impl Serialize for Chapter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let tag = match self.kind {
            ChapterKind::Unnumbered => "chapter_null",
            ChapterKind::Numbered => "chapter",
        };
        let nodes: Vec<Node<'_>> = self
            .body
            .iter()
            .map(Node::Directive)
            .chain(self.sections.iter().map(Node::Section))
            .collect();
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("n", tag)?;
        map.serialize_entry("title", &self.title)?;
        if let Some(narrative) = &self.narrative {
            map.serialize_entry(narrative.key(), narrative.text())?;
        }
        map.serialize_entry("sections", &nodes)?;
        map.end()
    }
}

impl Serialize for StructureDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("ARG version", &self.version)?;
        if let Some(title) = &self.title {
            map.serialize_entry("title", title)?;
        }
        map.serialize_entry("chapters", &self.chapters)?;
        map.end()
    }
}
