use kha_mark::model::ContentDocument;
use regex::Regex;
use std::{
    fs,
    path::{Path, PathBuf},
};

pub fn test_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
}

#[allow(dead_code)] // Avoid a false positive on the dead code analysis.
pub fn courses_dir() -> PathBuf {
    test_dir().join("courses")
}

#[allow(dead_code)] // Avoid a false positive on the dead code analysis.
pub fn read_course(id: &str) -> String {
    let path = courses_dir().join(id).join("content.md");

    fs::read_to_string(&path)
        .unwrap_or_else(|error| panic!("failed to read {}: {error}", path.display()))
}

#[allow(dead_code)] // Avoid a false positive on the dead code analysis.
pub fn read_document(path: &Path) -> ContentDocument {
    let json = fs::read_to_string(path)
        .unwrap_or_else(|error| panic!("failed to read {}: {error}", path.display()));

    serde_json::from_str(&json).expect("output should be a content document")
}

/// Ids of the top-level section wrappers in document HTML, in order.
#[allow(dead_code)] // Avoid a false positive on the dead code analysis.
pub fn wrapper_ids(html: &str) -> Vec<String> {
    Regex::new(r#"<div class="mathigon-section" id="([^"]*)" data-section-id="([^"]*)">"#)
        .expect("valid pattern")
        .captures_iter(html)
        .map(|captures| {
            assert_eq!(&captures[1], &captures[2], "wrapper ids disagree");
            captures[1].to_string()
        })
        .collect()
}
