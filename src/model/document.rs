use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// File name of a course's markdown inside its directory.
pub const CONTENT_FILE: &str = "content.md";

/// String metadata collected from `> key: value` lines, in source order.
pub type Metadata = IndexMap<String, String>;

/// One `---`-delimited unit of a course, with its body already rendered to HTML.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Section {
    /// Taken from the section's `id` metadata, or `section-<index>`.
    pub id: String,
    /// Taken from the section's `title` metadata, or `Section <index + 1>`.
    pub title: String,
    /// Rendered HTML of the section body, without the section wrapper.
    pub content: String,
    pub metadata: Metadata,
}

/// The parsed form of a course document.
///
/// `html` holds one `mathigon-section` wrapper per entry of `sections`, in the same order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentDocument {
    pub metadata: Metadata,
    pub sections: Vec<Section>,
    pub html: String,
}

impl ContentDocument {
    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.id == id)
    }

    pub fn title(&self) -> Option<&str> {
        self.metadata.get("title").map(String::as_str)
    }
}

/// What the content service hands to the UI layer. A fallback is structurally a normal
/// document, so callers that only render never need to tell the two apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CourseContent {
    Loaded(Arc<ContentDocument>),
    Fallback(ContentDocument),
}

impl CourseContent {
    pub fn document(&self) -> &ContentDocument {
        match self {
            CourseContent::Loaded(document) => document,
            CourseContent::Fallback(document) => document,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, CourseContent::Fallback(_))
    }
}
