use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::model::CONTENT_FILE;

/// Directory holding per-section translations inside a course directory.
pub const SECTIONS_DIR: &str = "sections";

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("{0} does not exist")]
    NotFound(String),
    #[error("failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("request to {url} failed: {message}")]
    Http { url: String, message: String },
}

/// A place course markdown can be read from.
pub trait ContentSource: Send + Sync {
    fn name(&self) -> &str;

    fn exists(&self, course_id: &str) -> bool;

    /// The raw markdown of a whole course.
    fn fetch(&self, course_id: &str) -> Result<String, SourceError>;

    /// The raw markdown of one section, used for per-section translations.
    fn fetch_section(&self, course_id: &str, section_id: &str) -> Result<String, SourceError>;
}

/// Ids are single path segments. Anything else never reaches the filesystem or a URL.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Reads `<root>/<course>/content.md` and `<root>/<course>/sections/<section>.md`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    name: String,
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();

        Self {
            name: root.display().to_string(),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read(&self, path: PathBuf) -> Result<String, SourceError> {
        fs::read_to_string(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => SourceError::NotFound(path.display().to_string()),
            _ => SourceError::Io { path, source },
        })
    }
}

impl ContentSource for DirectorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn exists(&self, course_id: &str) -> bool {
        is_valid_id(course_id) && self.root.join(course_id).join(CONTENT_FILE).is_file()
    }

    fn fetch(&self, course_id: &str) -> Result<String, SourceError> {
        if !is_valid_id(course_id) {
            return Err(SourceError::NotFound(course_id.to_string()));
        }

        self.read(self.root.join(course_id).join(CONTENT_FILE))
    }

    fn fetch_section(&self, course_id: &str, section_id: &str) -> Result<String, SourceError> {
        if !is_valid_id(course_id) || !is_valid_id(section_id) {
            return Err(SourceError::NotFound(format!("{course_id}/{section_id}")));
        }

        self.read(
            self.root
                .join(course_id)
                .join(SECTIONS_DIR)
                .join(format!("{section_id}.md")),
        )
    }
}

/// Fetches `GET <base>/<course>/content.md` over HTTP.
pub struct HttpSource {
    base: String,
    agent: ureq::Agent,
    attempts: usize,
}

impl HttpSource {
    const TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(base: impl Into<String>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Self::TIMEOUT))
            .build()
            .into();

        Self {
            base: base.into().trim_end_matches('/').to_string(),
            agent,
            attempts: 3,
        }
    }

    fn get(&self, url: &str) -> Result<String, SourceError> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.agent.get(url).call() {
                Ok(response) => {
                    return response
                        .into_body()
                        .read_to_string()
                        .map_err(|error| SourceError::Http {
                            url: url.to_string(),
                            message: error.to_string(),
                        });
                }
                Err(ureq::Error::StatusCode(404)) => {
                    return Err(SourceError::NotFound(url.to_string()));
                }
                Err(error) if is_connection_reset(&error) && attempt < self.attempts => {
                    tracing::debug!(%url, attempt, "retrying after connection reset");
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(error) => {
                    return Err(SourceError::Http {
                        url: url.to_string(),
                        message: error.to_string(),
                    });
                }
            }
        }
    }
}

fn is_connection_reset(error: &ureq::Error) -> bool {
    match error {
        ureq::Error::Io(io) => io.kind() == io::ErrorKind::ConnectionReset,
        _ => false,
    }
}

impl fmt::Debug for HttpSource {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("HttpSource")
            .field("base", &self.base)
            .finish()
    }
}

impl ContentSource for HttpSource {
    fn name(&self) -> &str {
        &self.base
    }

    /// A failed request other than a 404 is logged and counts as missing.
    fn exists(&self, course_id: &str) -> bool {
        if !is_valid_id(course_id) {
            return false;
        }

        let url = format!("{}/{course_id}/{CONTENT_FILE}", self.base);

        match self.agent.head(&url).call() {
            Ok(_) => true,
            Err(ureq::Error::StatusCode(404)) => false,
            Err(error) => {
                tracing::warn!(%url, %error, "failed to check remote course");
                false
            }
        }
    }

    fn fetch(&self, course_id: &str) -> Result<String, SourceError> {
        if !is_valid_id(course_id) {
            return Err(SourceError::NotFound(course_id.to_string()));
        }

        self.get(&format!("{}/{course_id}/{CONTENT_FILE}", self.base))
    }

    fn fetch_section(&self, course_id: &str, section_id: &str) -> Result<String, SourceError> {
        if !is_valid_id(course_id) || !is_valid_id(section_id) {
            return Err(SourceError::NotFound(format!("{course_id}/{section_id}")));
        }

        self.get(&format!(
            "{}/{course_id}/{SECTIONS_DIR}/{section_id}.md",
            self.base
        ))
    }
}
