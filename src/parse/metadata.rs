use regex::Regex;
use std::sync::LazyLock;

use crate::model::Metadata;

static METADATA_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^> ([\w-]+):\s*(.+)$").expect("metadata pattern is valid"));

/// The result of scanning a block of lines for leading `> key: value` metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedMetadata {
    pub metadata: Metadata,
    /// Number of leading lines that belong to the metadata block. Blank lines after the last
    /// `> ` line are not counted.
    pub consumed: usize,
}

/// Collects `> key: value` lines from the start of `lines`.
///
/// Scanning stops at the first non-blank line that does not start with `> `. A `> ` line that
/// is not a `key: value` pair is still part of the block but contributes no entry. When a key
/// repeats, the later value wins.
pub fn extract_metadata<S: AsRef<str>>(lines: &[S]) -> ExtractedMetadata {
    let mut extracted = ExtractedMetadata::default();

    for (index, line) in lines.iter().enumerate() {
        let line = line.as_ref();

        if line.trim().is_empty() {
            continue;
        }

        if !line.starts_with("> ") {
            break;
        }

        match METADATA_LINE.captures(line.trim_end()) {
            Some(captures) => {
                extracted
                    .metadata
                    .insert(captures[1].to_string(), captures[2].trim().to_string());
            }
            None => tracing::debug!(line, "ignoring metadata line without a key"),
        }

        extracted.consumed = index + 1;
    }

    extracted
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn collects_leading_pairs() {
        let lines = ["> title: Circles", "> level: advanced", "# Heading"];

        let extracted = extract_metadata(&lines);

        assert_eq!(Some("Circles"), extracted.metadata.get("title").map(String::as_str));
        assert_eq!(Some("advanced"), extracted.metadata.get("level").map(String::as_str));
        assert_eq!(2, extracted.consumed);
    }

    #[test]
    fn returns_nothing_without_metadata() {
        let lines = ["", "# Heading", "> title: too late"];

        let extracted = extract_metadata(&lines);

        assert!(extracted.metadata.is_empty());
        assert_eq!(0, extracted.consumed);
    }

    #[test]
    fn later_duplicates_win_in_place() {
        let lines = ["> title: First", "> id: intro", "> title: Second"];

        let extracted = extract_metadata(&lines);
        let keys: Vec<_> = extracted.metadata.keys().map(String::as_str).collect();

        assert_eq!(vec!["title", "id"], keys);
        assert_eq!("Second", extracted.metadata["title"]);
    }

    #[test]
    fn blank_lines_inside_the_block_are_skipped() {
        let lines = ["> id: intro", "", "> section: basics", "", "Body"];

        let extracted = extract_metadata(&lines);

        assert_eq!(2, extracted.metadata.len());
        assert_eq!(3, extracted.consumed);
    }

    #[test]
    fn quote_lines_without_a_key_are_consumed() {
        let lines = ["> id: intro", "> just a quote", "Body"];

        let extracted = extract_metadata(&lines);

        assert_eq!(1, extracted.metadata.len());
        assert_eq!(2, extracted.consumed);
    }

    #[test]
    fn values_are_trimmed_and_may_contain_colons() {
        let lines = ["> goals:   video-1 time: 10:30  "];

        let extracted = extract_metadata(&lines);

        assert_eq!("video-1 time: 10:30", extracted.metadata["goals"]);
    }
}
