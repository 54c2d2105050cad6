//! The course markdown pipeline: split a document into sections, render each section body and
//! assemble the result.

pub mod assemble;
pub mod markup;
pub mod metadata;
pub mod sections;

pub use assemble::assemble;
pub use markup::transform;
pub use metadata::{extract_metadata, ExtractedMetadata};
pub use sections::{split_sections, RawSection, SplitDocument};

use crate::model::ContentDocument;

/// Parses a whole course document. The same input always yields the same document.
pub fn parse_document(markdown: &str) -> ContentDocument {
    let markdown = markdown.replace("\r\n", "\n");
    let split = split_sections(&markdown);

    assemble(split.metadata, &split.sections)
}
