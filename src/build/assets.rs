use anyhow::Context;
use std::{
    fs,
    path::{Component, Path},
};
use walkdir::WalkDir;

use crate::error::Result;

/// Copies the listed files and directories from `source` to `destination` byte for byte.
/// Names that do not exist in `source` are skipped. Returns the number of files copied.
pub fn copy_assets(source: &Path, destination: &Path, assets: &[String]) -> Result<usize> {
    let mut copied = 0;

    for name in assets {
        let relative = Path::new(name);
        if !relative
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
        {
            tracing::warn!(asset = %name, "skipping asset outside the course directory");
            continue;
        }

        let path = source.join(relative);
        if !path.exists() {
            continue;
        }

        for entry in WalkDir::new(&path).follow_links(true) {
            let entry = entry.with_context(|| format!("Failed to walk {}", path.display()))?;
            let target = destination.join(entry.path().strip_prefix(source)?);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)
                    .with_context(|| format!("Failed to create {}", target.display()))?;
                continue;
            }

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }

            fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
            copied += 1;
        }
    }

    Ok(copied)
}
