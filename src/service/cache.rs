use dashmap::DashMap;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use crate::model::ContentDocument;

#[derive(Debug)]
struct Entry {
    stored: Instant,
    document: Arc<ContentDocument>,
}

/// Parsed documents keyed by `(course, language)`. Entries only ever leave by expiring; a
/// second insert for the same key replaces the first.
#[derive(Debug)]
pub struct ContentCache {
    ttl: Duration,
    entries: DashMap<(String, String), Entry>,
}

impl ContentCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, course_id: &str, language: &str) -> Option<Arc<ContentDocument>> {
        let key = (course_id.to_string(), language.to_string());

        // The shard guard must be released before `remove_if` locks it again.
        {
            let entry = self.entries.get(&key)?;
            if entry.stored.elapsed() < self.ttl {
                return Some(Arc::clone(&entry.document));
            }
        }

        self.entries
            .remove_if(&key, |_, entry| entry.stored.elapsed() >= self.ttl);
        None
    }

    pub fn insert(&self, course_id: &str, language: &str, document: Arc<ContentDocument>) {
        self.entries.insert(
            (course_id.to_string(), language.to_string()),
            Entry {
                stored: Instant::now(),
                document,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
