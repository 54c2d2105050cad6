use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::{
    error::Result,
    model::{
        catalog::{Catalog, CatalogEntry},
        Metadata, CONTENT_FILE,
    },
    parse::split_sections,
    service::is_valid_id,
};

/// What is known about a course without rendering it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CourseInfo {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl CourseInfo {
    /// Course info from a course document's preamble. The title falls back to the first
    /// `# Heading` and then to the id.
    pub fn from_markdown(id: &str, markdown: &str) -> Self {
        let markdown = markdown.replace("\r\n", "\n");
        let split = split_sections(&markdown);
        let heading = std::iter::once(split.preamble)
            .chain(split.sections.first().map(|section| section.body))
            .find_map(first_heading);

        Self::from_metadata(id, &split.metadata, heading)
    }

    fn from_metadata(id: &str, metadata: &Metadata, heading: Option<&str>) -> Self {
        let value = |key: &str| metadata.get(key).cloned();

        Self {
            id: id.to_string(),
            title: value("title")
                .or_else(|| heading.map(str::to_string))
                .unwrap_or_else(|| id.to_string()),
            description: value("description"),
            category: value("category"),
            level: value("level"),
            color: value("color"),
        }
    }
}

fn first_heading(text: &str) -> Option<&str> {
    text.lines()
        .find_map(|line| line.strip_prefix("# "))
        .map(str::trim)
        .filter(|heading| !heading.is_empty())
}

/// The known courses of a content root. Built once and then only read; share it behind an
/// `Arc`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct CourseRegistry {
    courses: Vec<CourseInfo>,
}

impl CourseRegistry {
    pub fn new(courses: Vec<CourseInfo>) -> Self {
        Self { courses }
    }

    /// Lists every course directory under `root`.
    ///
    /// Courses are sorted by id unless `root` has a `CATALOG.md`, in which case catalog order
    /// and categories apply and courses missing from the catalog follow in id order.
    pub fn scan(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let mut courses = Vec::new();

        for directory in course_directories(root)? {
            let Some(id) = directory.file_name().and_then(|name| name.to_str()) else {
                continue;
            };

            let path = directory.join(CONTENT_FILE);
            let course = if path.is_file() {
                let markdown = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to open {}", path.display()))?;
                CourseInfo::from_markdown(id, &markdown)
            } else {
                CourseInfo::from_metadata(id, &Metadata::new(), None)
            };

            courses.push(course);
        }

        if let Some(catalog) = Catalog::load(root)? {
            courses = apply_catalog(courses, &catalog.entries());
        }

        tracing::debug!(root = %root.display(), courses = courses.len(), "scanned courses");

        Ok(Self { courses })
    }

    pub fn get(&self, id: &str) -> Option<&CourseInfo> {
        self.courses.iter().find(|course| course.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn courses(&self) -> &[CourseInfo] {
        &self.courses
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }
}

/// Sorted subdirectories of `root` whose names are usable course ids. Hidden directories are
/// skipped quietly, other unusable names with a warning.
fn course_directories(root: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(root)
        .with_context(|| format!("Failed to read course directory {}", root.display()))?;

    let mut directories = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read {}", root.display()))?;
        let path = entry.path();

        if !path.is_dir() {
            continue;
        }

        let name = entry.file_name();
        let name = name.to_string_lossy();

        if name.starts_with('.') {
            continue;
        }

        if !is_valid_id(&name) {
            tracing::warn!(
                directory = %path.display(),
                "skipping directory that is not a valid course id"
            );
            continue;
        }

        directories.push(path);
    }

    directories.sort();
    Ok(directories)
}

fn apply_catalog(courses: Vec<CourseInfo>, entries: &[CatalogEntry<'_>]) -> Vec<CourseInfo> {
    let mut remaining: HashMap<_, _> = courses
        .into_iter()
        .enumerate()
        .map(|(position, course)| (course.id.clone(), (position, course)))
        .collect();
    let mut ordered = Vec::with_capacity(remaining.len());

    for entry in entries {
        let Some((_, mut course)) = remaining.remove(&entry.link.id) else {
            tracing::warn!(course = %entry.link.id, "catalog lists a course with no directory");
            continue;
        };

        // A title taken from the id alone is replaced by the catalog's link text.
        if course.title == course.id {
            course.title = entry.link.title.clone();
        }

        if let Some(category) = entry.category {
            course.category = Some(category.to_string());
        }

        ordered.push(course);
    }

    let mut rest: Vec<_> = remaining.into_values().collect();
    rest.sort_by_key(|(position, _)| *position);
    ordered.extend(rest.into_iter().map(|(_, course)| course));

    ordered
}
