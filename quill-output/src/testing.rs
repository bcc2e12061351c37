//! Test utilities for generators driving a pass.
//!
//! This module is only available when the `testing` feature is enabled
//! or during tests.

use std::{fs, path::Path};

use eyre::{Result, WrapErr};
use quill_core::paths;

/// Run a generation pass against a temporary artifact root.
///
/// The directory will be cleaned up when the returned `TempDir` is dropped.
pub fn generate_to_temp<F>(generate: F) -> Result<tempfile::TempDir>
where
    F: FnOnce(&Path) -> Result<()>,
{
    let temp_dir = tempfile::TempDir::new()?;
    generate(temp_dir.path())?;
    Ok(temp_dir)
}

/// Lines of `<artifact_root>/META-INF/services/<service_type>`.
pub fn read_descriptor(artifact_root: &Path, service_type: &str) -> Result<Vec<String>> {
    let path = artifact_root
        .join(paths::META_INF_DIR)
        .join(paths::SERVICES_DIR)
        .join(service_type);
    let content = fs::read_to_string(&path)
        .wrap_err_with(|| format!("failed to read descriptor {}", path.display()))?;
    Ok(content.lines().map(str::to_string).collect())
}

/// True when `dir` exists and contains no entries.
pub fn is_empty_dir(dir: &Path) -> bool {
    fs::read_dir(dir).is_ok_and(|mut entries| entries.next().is_none())
}
