use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use std::panic::{self, AssertUnwindSafe};

use super::{markup, metadata::extract_metadata, sections::RawSection};
use crate::model::{ContentDocument, Metadata, Section};

/// Class of the wrapper `<div>` emitted around every section.
pub const SECTION_CLASS: &str = "mathigon-section";

/// Combines document metadata and split sections into a [`ContentDocument`].
///
/// `html` gets exactly one wrapper per section, in section order.
pub fn assemble(metadata: Metadata, sections: &[RawSection<'_>]) -> ContentDocument {
    let sections: Vec<_> = sections
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let metadata = extract_metadata(&raw.metadata_lines).metadata;
            section(index, metadata, render_body(raw.body))
        })
        .collect();

    ContentDocument {
        metadata,
        html: document_html(&sections),
        sections,
    }
}

/// Builds the section at `index`, filling in the default id and title.
pub fn section(index: usize, metadata: Metadata, content: String) -> Section {
    let id = metadata
        .get("id")
        .cloned()
        .unwrap_or_else(|| format!("section-{index}"));
    let title = metadata
        .get("title")
        .cloned()
        .unwrap_or_else(|| format!("Section {}", index + 1));

    Section {
        id,
        title,
        content,
        metadata,
    }
}

pub fn wrap_section(section: &Section) -> String {
    let id = attr(&section.id);

    format!(
        r#"<div class="{SECTION_CLASS}" id="{id}" data-section-id="{id}">{}</div>"#,
        section.content
    )
}

/// Joins the wrapped sections into the document HTML.
pub fn document_html(sections: &[Section]) -> String {
    sections
        .iter()
        .map(wrap_section)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders a section body, turning a failure inside the markup rules into a single error
/// paragraph so the rest of the document still assembles.
pub fn render_body(body: &str) -> String {
    match panic::catch_unwind(AssertUnwindSafe(|| markup::transform(body))) {
        Ok(html) => html,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|message| message.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| String::from("unknown error"));

            tracing::warn!(%message, "failed to render section body");
            error_fragment(&message)
        }
    }
}

pub fn error_fragment(message: &str) -> String {
    format!("<p>Error processing content: {}</p>", text(message))
}

/// A single-section document standing in for a course whose content cannot be shown.
pub fn placeholder(title: &str, description: Option<&str>, message: &str) -> ContentDocument {
    let mut metadata = Metadata::new();
    metadata.insert(String::from("title"), title.to_string());

    let mut content = format!("<h1>{}</h1>", text(title));
    if let Some(description) = description {
        metadata.insert(String::from("description"), description.to_string());
        content.push_str(&format!("\n<p>{}</p>", text(description)));
    }
    content.push_str(&format!(
        "\n<p class=\"content-unavailable\">{}</p>",
        text(message)
    ));

    let mut section = section(0, Metadata::new(), content);
    section.title = title.to_string();

    let sections = vec![section];
    ContentDocument {
        metadata,
        html: document_html(&sections),
        sections,
    }
}
