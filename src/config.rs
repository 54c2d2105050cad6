use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use toml::Value;

use crate::error::{Error, Result};

pub const CONFIG_FILE: &str = "kmark.toml";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// Configuration for the offline build.
    pub build: BuildConfig,
    /// Configuration for serving course content at runtime.
    pub content: ContentConfig,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Config> {
        let mut buffer = String::new();
        File::open(path)
            .with_context(|| "Failed to open config file")?
            .read_to_string(&mut buffer)
            .with_context(|| "Failed to read config file")?;

        Config::from_str(&buffer)
    }

    /// Loads `<root>/kmark.toml` when present, otherwise the defaults, and resolves every
    /// relative path against `root`.
    pub fn discover(root: impl AsRef<Path>) -> Result<Config> {
        let root = root.as_ref();
        let path = root.join(CONFIG_FILE);

        let mut config = if path.is_file() {
            Config::load(&path).with_context(|| format!("Failed to load {}", path.display()))?
        } else {
            tracing::debug!(root = %root.display(), "no {CONFIG_FILE}, using defaults");
            Config::default()
        };

        config.resolve(root);
        Ok(config)
    }

    fn resolve(&mut self, root: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = root.join(&*path);
            }
        };

        resolve(&mut self.build.source);
        resolve(&mut self.build.destination);
        resolve(&mut self.content.root);
        if let Some(translations) = self.content.translations.as_mut() {
            resolve(translations);
        }
        self.content.legacy.iter_mut().for_each(resolve);
    }
}

impl<'de> Deserialize<'de> for Config {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        let raw = Value::deserialize(deserializer)?;
        let Value::Table(mut table) = raw else {
            return Err(D::Error::custom("kmark.toml must always be a toml table"));
        };

        let build: BuildConfig = table
            .remove("build")
            .map(|build| build.try_into().map_err(D::Error::custom))
            .transpose()?
            .unwrap_or_default();

        let content: ContentConfig = table
            .remove("content")
            .map(|content| content.try_into().map_err(D::Error::custom))
            .transpose()?
            .unwrap_or_default();

        for key in table.keys() {
            tracing::warn!(%key, "ignoring unknown {CONFIG_FILE} section");
        }

        Ok(Config { build, content })
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        toml::from_str(source).with_context(|| "Attempted to parse invalid configuration file")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildConfig {
    /// Course-source tree, one directory per course.
    pub source: PathBuf,
    /// Output tree receiving `content.json` and assets per course.
    pub destination: PathBuf,
    /// Hash cache file, relative to the destination.
    pub cache_file: PathBuf,
    /// Files and directories copied verbatim from each course directory.
    pub assets: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("./courses"),
            destination: PathBuf::from("./public/content"),
            cache_file: PathBuf::from("cache.json"),
            assets: [
                "images",
                "hero.jpg",
                "hero.png",
                "styles.css",
                "styles.less",
                "functions.ts",
                "functions.js",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct ContentConfig {
    /// Primary content store.
    pub root: PathBuf,
    /// Translation store laid out as `<translations>/<language>/<course>/...`.
    pub translations: Option<PathBuf>,
    /// Secondary content stores, tried after the primary and translation stores.
    pub legacy: Vec<PathBuf>,
    /// Base URL of a remote content store, tried last.
    pub remote: Option<String>,
    /// Seconds a parsed document stays cached.
    pub cache_ttl: u64,
    pub default_language: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./courses"),
            translations: None,
            legacy: Vec::new(),
            remote: None,
            cache_ttl: 300,
            default_language: String::from("en"),
        }
    }
}

impl ContentConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }
}
