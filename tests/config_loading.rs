use crate::common::test_dir;
use kha_mark::config::{Config, CONFIG_FILE};
use pretty_assertions::assert_eq;
use std::time::Duration;

mod common;

#[test]
fn it_loads_project_configuration() {
    let config = Config::load(test_dir().join(CONFIG_FILE)).expect("failed to load config");

    assert_eq!(
        vec!["images", "hero.jpg", "styles.css", "functions.ts"],
        config.build.assets
    );
    assert_eq!(Duration::from_secs(600), config.content.cache_ttl());
    assert_eq!("en", config.content.default_language);
}

#[test]
fn it_resolves_paths_against_the_project_root() {
    let config = Config::discover(test_dir()).expect("failed to discover config");

    assert_eq!(test_dir().join("courses"), config.build.source);
    assert_eq!(test_dir().join("public/content"), config.build.destination);
    assert_eq!(Some(test_dir().join("translations")), config.content.translations);
}

#[test]
fn it_rejects_invalid_documents() {
    let error = "= 1".parse::<Config>().expect_err("should not parse");

    assert!(!error.to_string().is_empty());
}
