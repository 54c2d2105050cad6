use super::metadata::extract_metadata;
use crate::model::Metadata;

const SECTION_DELIMITER: &str = "---";

/// A section as it appears in the source, before any markup is rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSection<'a> {
    /// The `> key: value` block at the top of the section, verbatim.
    pub metadata_lines: Vec<&'a str>,
    pub body: &'a str,
}

/// A course document cut into its preamble and sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitDocument<'a> {
    /// Metadata from the block before the first delimiter.
    pub metadata: Metadata,
    /// Anything else before the first delimiter, such as a `# Course Title` line. Empty when the
    /// document has no delimiters, since the whole body then forms the only section.
    pub preamble: &'a str,
    pub sections: Vec<RawSection<'a>>,
}

#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    start: usize,
    text: &'a str,
}

/// Splits a course document on lines that read exactly `---` once trimmed.
///
/// Sections whose lines are all blank are dropped. A document without any delimiter yields
/// exactly one section holding everything after the leading metadata block.
pub fn split_sections(markdown: &str) -> SplitDocument<'_> {
    let lines = lines(markdown);
    let mut chunks = lines.split(|line| line.text.trim() == SECTION_DELIMITER);

    let preamble = chunks.next().unwrap_or_default();
    let extracted = extract_metadata(&texts(preamble));
    let preamble_body = body(markdown, preamble, extracted.consumed);

    let mut document = SplitDocument {
        metadata: extracted.metadata,
        ..Default::default()
    };

    let mut delimited = false;
    for chunk in chunks {
        delimited = true;

        if chunk.iter().all(|line| line.text.trim().is_empty()) {
            continue;
        }

        let lines = texts(chunk);
        let consumed = extract_metadata(&lines).consumed;

        document.sections.push(RawSection {
            metadata_lines: lines[..consumed].to_vec(),
            body: body(markdown, chunk, consumed),
        });
    }

    if delimited {
        document.preamble = preamble_body.trim();
    } else {
        document.sections.push(RawSection {
            metadata_lines: Vec::new(),
            body: preamble_body,
        });
    }

    document
}

fn lines(source: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut start = 0;

    for end in memchr::memchr_iter(b'\n', source.as_bytes()) {
        lines.push(Line {
            start,
            text: &source[start..end],
        });
        start = end + 1;
    }

    if start < source.len() {
        lines.push(Line {
            start,
            text: &source[start..],
        });
    }

    lines
}

fn texts<'a>(chunk: &[Line<'a>]) -> Vec<&'a str> {
    chunk.iter().map(|line| line.text).collect()
}

/// The source text of `chunk` after its first `skip` lines, without surrounding blank lines.
fn body<'a>(source: &'a str, chunk: &[Line<'a>], skip: usize) -> &'a str {
    let (Some(first), Some(last)) = (chunk.get(skip), chunk.last()) else {
        return "";
    };

    source[first.start..last.start + last.text.len()].trim_matches(&['\n', '\r'][..])
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn keeps_document_metadata_out_of_sections() {
        let split = split_sections("> title: Foo\n> level: advanced\n---\nbody");

        let keys: Vec<_> = split.metadata.iter().collect();
        assert_eq!(
            vec![
                (&String::from("title"), &String::from("Foo")),
                (&String::from("level"), &String::from("advanced")),
            ],
            keys
        );
        assert_eq!(
            vec![RawSection {
                metadata_lines: Vec::new(),
                body: "body",
            }],
            split.sections
        );
    }

    #[test]
    fn splits_only_on_whole_delimiter_lines() {
        let split = split_sections("one A---B\n---\ntwo --- inline\n  ---  \nthree\n----\nstill three");

        let bodies: Vec<_> = split.sections.iter().map(|section| section.body).collect();

        assert_eq!(
            vec!["two --- inline", "three\n----\nstill three"],
            bodies
        );
        assert_eq!("one A---B", split.preamble);
    }

    #[test]
    fn separates_section_metadata_from_body() {
        let split = split_sections("---\n> id: intro\n> title: Introduction\n\n# Welcome\nText\n");

        assert_eq!(
            vec![RawSection {
                metadata_lines: vec!["> id: intro", "> title: Introduction"],
                body: "# Welcome\nText",
            }],
            split.sections
        );
    }

    #[test]
    fn drops_empty_sections() {
        let split = split_sections("---\nfirst\n---\n\n  \n---\nsecond\n---\n");

        let bodies: Vec<_> = split.sections.iter().map(|section| section.body).collect();

        assert_eq!(vec!["first", "second"], bodies);
    }

    #[test]
    fn treats_undelimited_documents_as_one_section() {
        let split = split_sections("> title: Circles\n\n# Welcome\nHello");

        assert_eq!("Circles", split.metadata["title"]);
        assert_eq!("", split.preamble);
        assert_eq!(
            vec![RawSection {
                metadata_lines: Vec::new(),
                body: "# Welcome\nHello",
            }],
            split.sections
        );
    }

    #[test]
    fn empty_input_still_has_a_section() {
        let split = split_sections("");

        assert_eq!(1, split.sections.len());
        assert_eq!("", split.sections[0].body);
    }

    #[test]
    fn keeps_preamble_content_apart() {
        let split = split_sections("> color: #cd0e66\n# Circles and Pi\n---\nbody");

        assert_eq!("# Circles and Pi", split.preamble);
        assert_eq!(1, split.sections.len());
    }
}
