//! Runtime access to course content.
//!
//! [`CourseContentService::get_content`] never fails. When no source can supply a course it
//! answers with a placeholder document built from what the [`CourseRegistry`] knows.

use std::{path::PathBuf, sync::Arc, time::Duration};

use crate::{
    config::ContentConfig,
    model::{ContentDocument, CourseContent},
    parse::{
        assemble::{document_html, placeholder, render_body},
        extract_metadata, parse_document,
    },
    registry::CourseRegistry,
};

pub use self::{
    cache::ContentCache,
    source::{is_valid_id, ContentSource, DirectorySource, HttpSource, SourceError},
};

mod cache;
mod source;

pub const UNAVAILABLE_MESSAGE: &str =
    "The content for this course is not available right now. Please try again later.";

pub struct CourseContentService {
    registry: Arc<CourseRegistry>,
    primary: Box<dyn ContentSource>,
    secondary: Vec<Box<dyn ContentSource>>,
    translations: Option<PathBuf>,
    default_language: String,
    cache: ContentCache,
}

impl CourseContentService {
    pub fn new(registry: Arc<CourseRegistry>, primary: impl ContentSource + 'static) -> Self {
        let defaults = ContentConfig::default();

        Self {
            registry,
            primary: Box::new(primary),
            secondary: Vec::new(),
            translations: None,
            default_language: defaults.default_language.clone(),
            cache: ContentCache::new(defaults.cache_ttl()),
        }
    }

    pub fn from_config(config: &ContentConfig, registry: Arc<CourseRegistry>) -> Self {
        let mut service = Self::new(registry, DirectorySource::new(&config.root));

        service
            .with_cache_ttl(config.cache_ttl())
            .with_default_language(&config.default_language);

        if let Some(translations) = &config.translations {
            service.with_translations(translations);
        }

        for legacy in &config.legacy {
            service.with_source(DirectorySource::new(legacy));
        }

        if let Some(remote) = &config.remote {
            service.with_source(HttpSource::new(remote));
        }

        service
    }

    /// Adds a source tried after the primary and translation stores.
    pub fn with_source(&mut self, source: impl ContentSource + 'static) -> &mut Self {
        self.secondary.push(Box::new(source));
        self
    }

    pub fn with_translations(&mut self, root: impl Into<PathBuf>) -> &mut Self {
        self.translations = Some(root.into());
        self
    }

    pub fn with_cache_ttl(&mut self, ttl: Duration) -> &mut Self {
        self.cache = ContentCache::new(ttl);
        self
    }

    pub fn with_default_language(&mut self, language: &str) -> &mut Self {
        self.default_language = language.to_string();
        self
    }

    pub fn registry(&self) -> &CourseRegistry {
        &self.registry
    }

    /// Loads, parses and caches a course. `None` or an empty language means the default
    /// language.
    pub fn get_content(&self, course_id: &str, language: Option<&str>) -> CourseContent {
        let language = language
            .filter(|language| !language.is_empty())
            .unwrap_or(&self.default_language);

        if let Some(document) = self.cache.get(course_id, language) {
            tracing::debug!(course = course_id, language, "serving cached content");
            return CourseContent::Loaded(document);
        }

        match self.load(course_id, language) {
            Some(document) => {
                let document = Arc::new(document);
                self.cache.insert(course_id, language, Arc::clone(&document));
                CourseContent::Loaded(document)
            }
            None => {
                tracing::warn!(course = course_id, language, "content unavailable, using fallback");
                CourseContent::Fallback(self.fallback(course_id))
            }
        }
    }

    fn load(&self, course_id: &str, language: &str) -> Option<ContentDocument> {
        if !is_valid_id(course_id) {
            tracing::debug!(course = course_id, "rejecting invalid course id");
            return None;
        }

        let translation = self.translation_source(language);
        let candidates = std::iter::once(self.primary.as_ref())
            .chain(translation.as_ref().map(|source| source as &dyn ContentSource))
            .chain(self.secondary.iter().map(|source| source.as_ref()));

        for source in candidates {
            if !source.exists(course_id) {
                tracing::debug!(source = source.name(), course = course_id, "no such course");
                continue;
            }

            let markdown = match source.fetch(course_id) {
                Ok(markdown) => markdown,
                Err(SourceError::NotFound(what)) => {
                    tracing::debug!(source = source.name(), %what, "not found");
                    continue;
                }
                Err(error) => {
                    tracing::warn!(source = source.name(), %error, "failed to fetch course");
                    continue;
                }
            };

            tracing::debug!(source = source.name(), course = course_id, "loaded course");
            let mut document = parse_document(&markdown);

            if let Some(translation) = &translation {
                apply_translations(&mut document, translation, course_id);
            }

            return Some(document);
        }

        None
    }

    /// Translations are looked up only for languages other than English and the default.
    fn translation_source(&self, language: &str) -> Option<DirectorySource> {
        if language == "en" || language == self.default_language || !is_valid_id(language) {
            return None;
        }

        let root = self.translations.as_ref()?;
        Some(DirectorySource::new(root.join(language)))
    }

    fn fallback(&self, course_id: &str) -> ContentDocument {
        let course = self.registry.get(course_id);

        placeholder(
            course.map_or(course_id, |course| course.title.as_str()),
            course.and_then(|course| course.description.as_deref()),
            UNAVAILABLE_MESSAGE,
        )
    }
}

impl std::fmt::Debug for CourseContentService {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("CourseContentService")
            .field("primary", &self.primary.name())
            .field("translations", &self.translations)
            .field("default_language", &self.default_language)
            .field("cache_ttl", &self.cache.ttl())
            .finish()
    }
}

/// Replaces the body (and title, if given) of every section that has a translated section
/// file. Sections without one keep their original content.
fn apply_translations(
    document: &mut ContentDocument,
    source: &dyn ContentSource,
    course_id: &str,
) {
    let mut translated = 0;

    for section in &mut document.sections {
        let markdown = match source.fetch_section(course_id, &section.id) {
            Ok(markdown) => markdown.replace("\r\n", "\n"),
            Err(SourceError::NotFound(_)) => continue,
            Err(error) => {
                tracing::warn!(section = %section.id, %error, "failed to fetch translated section");
                continue;
            }
        };

        let lines: Vec<_> = markdown.lines().collect();
        let extracted = extract_metadata(&lines);
        let body = lines[extracted.consumed..].join("\n");

        section.content = render_body(body.trim());
        if let Some(title) = extracted.metadata.get("title") {
            section.title = title.clone();
        }
        translated += 1;
    }

    if translated > 0 {
        tracing::debug!(course = course_id, translated, "applied section translations");
        document.html = document_html(&document.sections);
    }
}
