//! Ahead-of-time rendering of a course-source tree into static JSON.
//!
//! For every course directory the build:
//! - renders `content.md` to `<destination>/<course>/content.json`, unless the cached content
//!   hash is unchanged and the output still exists,
//! - writes a placeholder document for courses without markdown,
//! - copies the configured assets verbatim.
//!
//! Courses are built one at a time, in registry order, so the log reads top to bottom. The
//! registry itself is written to `<destination>/courses.json`.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::{
    config::BuildConfig,
    error::Result,
    model::CONTENT_FILE,
    parse::{assemble::placeholder, parse_document},
    registry::{CourseInfo, CourseRegistry},
};

pub use self::{
    assets::copy_assets,
    cache::{content_hash, HashCache},
};

mod assets;
mod cache;

pub const CONTENT_JSON: &str = "content.json";
pub const COURSES_JSON: &str = "courses.json";
pub const PLACEHOLDER_MESSAGE: &str = "Content for this course is coming soon.";

/// Course ids grouped by what the build did with them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildReport {
    pub built: Vec<String>,
    pub skipped: Vec<String>,
    pub placeholders: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BuildPipeline {
    config: BuildConfig,
}

impl BuildPipeline {
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    /// Builds the configured source tree into the configured destination.
    pub fn build(&self) -> Result<BuildReport> {
        self.build_all(&self.config.source, &self.config.destination)
    }

    pub fn build_all(
        &self,
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
    ) -> Result<BuildReport> {
        let (source, destination) = (source.as_ref(), destination.as_ref());

        let registry = CourseRegistry::scan(source)?;
        fs::create_dir_all(destination)
            .with_context(|| format!("Failed to create {}", destination.display()))?;

        let cache_path = destination.join(&self.config.cache_file);
        let mut cache = HashCache::load(&cache_path);
        let mut report = BuildReport::default();

        tracing::info!(
            source = %source.display(),
            destination = %destination.display(),
            courses = registry.len(),
            "building courses"
        );

        for course in registry.courses() {
            self.build_course(course, source, destination, &mut cache, &mut report)
                .with_context(|| format!("Failed to build course '{}'", course.id))?;
        }

        cache.retain_courses(registry.courses().iter().map(|course| course.id.as_str()));
        cache.save(&cache_path)?;
        write_json(&destination.join(COURSES_JSON), &registry)?;

        tracing::info!(
            built = report.built.len(),
            skipped = report.skipped.len(),
            placeholders = report.placeholders.len(),
            "build finished"
        );

        Ok(report)
    }

    fn build_course(
        &self,
        course: &CourseInfo,
        source: &Path,
        destination: &Path,
        cache: &mut HashCache,
        report: &mut BuildReport,
    ) -> Result<()> {
        let course_source = source.join(&course.id);
        let course_destination = destination.join(&course.id);
        let output = course_destination.join(CONTENT_JSON);
        let markdown_path = course_source.join(CONTENT_FILE);

        fs::create_dir_all(&course_destination)
            .with_context(|| format!("Failed to create {}", course_destination.display()))?;

        if markdown_path.is_file() {
            let markdown = fs::read_to_string(&markdown_path)
                .with_context(|| format!("Failed to open {}", markdown_path.display()))?;
            let hash = content_hash(&markdown);

            if cache.is_fresh(&course.id, &hash) && output.is_file() {
                tracing::info!(course = %course.id, "unchanged, skipping");
                report.skipped.push(course.id.clone());
            } else {
                let document = parse_document(&markdown);
                write_json(&output, &document)?;
                cache.insert(course.id.as_str(), hash);

                tracing::info!(course = %course.id, sections = document.sections.len(), "built");
                report.built.push(course.id.clone());
            }
        } else {
            let document = placeholder(
                &course.title,
                course.description.as_deref(),
                PLACEHOLDER_MESSAGE,
            );
            write_json(&output, &document)?;
            cache.remove(&course.id);

            tracing::warn!(course = %course.id, "no {CONTENT_FILE}, wrote placeholder");
            report.placeholders.push(course.id.clone());
        }

        let copied = copy_assets(&course_source, &course_destination, &self.config.assets)?;
        if copied > 0 {
            tracing::debug!(course = %course.id, copied, "copied assets");
        }

        Ok(())
    }
}

fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;

    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::ContentDocument;
    use std::path::PathBuf;
    use pretty_assertions::assert_eq;

    fn course(root: &Path, id: &str, markdown: &str) {
        fs::create_dir_all(root.join(id)).expect("create course");
        fs::write(root.join(id).join(CONTENT_FILE), markdown).expect("write markdown");
    }

    fn read_document(path: &Path) -> ContentDocument {
        serde_json::from_str(&fs::read_to_string(path).expect("read output")).expect("parse output")
    }

    #[test]
    fn builds_then_skips_unchanged_courses() {
        let source = tempfile::tempdir().expect("tempdir");
        let destination = tempfile::tempdir().expect("tempdir");
        course(source.path(), "circles", "> title: Circles\n---\nHello");
        let pipeline = BuildPipeline::default();

        let first = pipeline
            .build_all(source.path(), destination.path())
            .expect("first build");
        let second = pipeline
            .build_all(source.path(), destination.path())
            .expect("second build");

        assert_eq!(vec![String::from("circles")], first.built);
        assert_eq!(vec![String::from("circles")], second.skipped);
        assert!(second.built.is_empty());

        let document = read_document(&destination.path().join("circles").join(CONTENT_JSON));
        assert_eq!("Circles", document.metadata["title"]);
    }

    #[test]
    fn rebuilds_changed_and_deleted_outputs() {
        let source = tempfile::tempdir().expect("tempdir");
        let destination = tempfile::tempdir().expect("tempdir");
        course(source.path(), "circles", "one");
        let pipeline = BuildPipeline::default();
        pipeline
            .build_all(source.path(), destination.path())
            .expect("first build");

        course(source.path(), "circles", "two");
        let changed = pipeline
            .build_all(source.path(), destination.path())
            .expect("changed build");

        fs::remove_file(destination.path().join("circles").join(CONTENT_JSON)).expect("remove");
        let deleted = pipeline
            .build_all(source.path(), destination.path())
            .expect("rebuild");

        assert_eq!(vec![String::from("circles")], changed.built);
        assert_eq!(vec![String::from("circles")], deleted.built);
    }

    #[test]
    fn courses_without_markdown_get_placeholders() {
        let source = tempfile::tempdir().expect("tempdir");
        let destination = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(source.path().join("squares")).expect("create course");

        let report = BuildPipeline::default()
            .build_all(source.path(), destination.path())
            .expect("build");

        assert_eq!(vec![String::from("squares")], report.placeholders);
        let document = read_document(&destination.path().join("squares").join(CONTENT_JSON));
        assert_eq!(1, document.sections.len());
        assert!(document.html.contains(PLACEHOLDER_MESSAGE));
    }

    #[test]
    fn corrupt_cache_means_a_full_rebuild() {
        let source = tempfile::tempdir().expect("tempdir");
        let destination = tempfile::tempdir().expect("tempdir");
        course(source.path(), "circles", "Hello");
        let pipeline = BuildPipeline::default();
        pipeline
            .build_all(source.path(), destination.path())
            .expect("first build");

        fs::write(destination.path().join("cache.json"), "[oops").expect("corrupt cache");
        let report = pipeline
            .build_all(source.path(), destination.path())
            .expect("rebuild");

        assert_eq!(vec![String::from("circles")], report.built);
    }

    #[test]
    fn hash_cache_lives_in_the_destination() {
        let source = tempfile::tempdir().expect("tempdir");
        let destination = tempfile::tempdir().expect("tempdir");
        course(source.path(), "circles", "Hello");
        let pipeline = BuildPipeline::new(BuildConfig {
            cache_file: PathBuf::from("hashes.json"),
            ..BuildConfig::default()
        });

        pipeline
            .build_all(source.path(), destination.path())
            .expect("build");

        let cache = HashCache::load(&destination.path().join("hashes.json"));
        assert!(cache.is_fresh("circles", &content_hash("Hello")));
        assert!(!destination.path().join("cache.json").exists());
    }

    #[test]
    fn missing_source_aborts_the_build() {
        let destination = tempfile::tempdir().expect("tempdir");

        let result = BuildPipeline::default()
            .build_all(destination.path().join("missing"), destination.path());

        assert!(result.is_err());
    }
}
