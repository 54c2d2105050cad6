use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, io, path::Path};

use crate::error::Result;

/// Hash of a course's raw markdown, as stored in the build cache.
pub fn content_hash(markdown: &str) -> String {
    blake3::hash(markdown.as_bytes()).to_hex().to_string()
}

/// `course id -> content hash` of the last successful build of each course.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct HashCache {
    hashes: BTreeMap<String, String>,
}

impl HashCache {
    /// Reads the cache at `path`. A missing file is an empty cache, and so is one that cannot be
    /// read or parsed; the build then simply rebuilds everything.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no build cache yet");
                return Self::default();
            }
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "unreadable build cache, rebuilding");
                return Self::default();
            }
        };

        serde_json::from_str(&source).unwrap_or_else(|error| {
            tracing::warn!(path = %path.display(), %error, "corrupt build cache, rebuilding");
            Self::default()
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;

        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn is_fresh(&self, course_id: &str, hash: &str) -> bool {
        self.hashes.get(course_id).is_some_and(|cached| cached == hash)
    }

    pub fn insert(&mut self, course_id: impl Into<String>, hash: impl Into<String>) {
        self.hashes.insert(course_id.into(), hash.into());
    }

    pub fn remove(&mut self, course_id: &str) {
        self.hashes.remove(course_id);
    }

    /// Drops every entry whose course no longer exists.
    pub fn retain_courses<'a>(&mut self, course_ids: impl IntoIterator<Item = &'a str>) {
        let keep: Vec<_> = course_ids.into_iter().collect();
        self.hashes.retain(|id, _| keep.contains(&id.as_str()));
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hashes_are_stable_and_content_sensitive() {
        assert_eq!(content_hash("# Circles"), content_hash("# Circles"));
        assert_ne!(content_hash("# Circles"), content_hash("# Circles!"));
        assert_eq!(64, content_hash("").len());
    }

    #[test]
    fn survives_a_save_and_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cache.json");
        let mut cache = HashCache::default();
        cache.insert("circles", content_hash("body"));

        cache.save(&path).expect("save");

        assert!(HashCache::load(&path).is_fresh("circles", &content_hash("body")));
    }

    #[test]
    fn corrupt_caches_load_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cache.json");
        fs::write(&path, "{ not json").expect("write");

        assert!(HashCache::load(&path).is_empty());
        assert!(HashCache::load(dir.path().join("missing.json")).is_empty());
    }

    #[test]
    fn forgets_removed_courses() {
        let mut cache = HashCache::default();
        cache.insert("circles", "a");
        cache.insert("squares", "b");

        cache.retain_courses(["circles"]);

        assert_eq!(1, cache.len());
        assert!(cache.is_fresh("circles", "a"));
    }
}
