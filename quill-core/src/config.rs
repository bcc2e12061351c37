//! Output configuration loaded from `quill.toml`.
//!
//! ```toml
//! [output]
//! artifact-root = "target/classes"
//! generated-sources-root = "target/generated-sources"
//! class-extension = "class"
//! merge-existing-descriptors = false
//! ```

use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{Error, Result, paths};

/// Root document of a `quill.toml` file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    output: OutputConfig,
}

/// Where one compilation pass writes its output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct OutputConfig {
    /// Root of the artifact tree (classes and `META-INF`).
    pub artifact_root: PathBuf,

    /// Root of the generated-source tree. Generated-source files are
    /// unsupported when absent.
    #[serde(default)]
    pub generated_sources_root: Option<PathBuf>,

    /// Extension appended to class artifacts, without the leading dot.
    #[serde(default = "default_class_extension")]
    pub class_extension: String,

    /// Union existing descriptor lines with the registry on finish.
    #[serde(default)]
    pub merge_existing_descriptors: bool,
}

fn default_class_extension() -> String {
    paths::DEFAULT_CLASS_EXTENSION.to_string()
}

impl OutputConfig {
    pub fn new(artifact_root: impl Into<PathBuf>) -> Self {
        Self {
            artifact_root: artifact_root.into(),
            generated_sources_root: None,
            class_extension: default_class_extension(),
            merge_existing_descriptors: false,
        }
    }

    pub fn with_generated_sources_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.generated_sources_root = Some(root.into());
        self
    }

    pub fn with_class_extension(mut self, extension: impl Into<String>) -> Self {
        self.class_extension = extension.into();
        self
    }

    pub fn with_merge_existing_descriptors(mut self, merge: bool) -> Self {
        self.merge_existing_descriptors = merge;
        self
    }

    /// Parse a `quill.toml` file from the given path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Box::new(Error::Io {
                path: path.to_path_buf(),
                source: e,
            })
        })?;
        Self::from_str_with_filename(&content, &path.display().to_string())
    }

    /// Parse a `quill.toml` from a string with a custom filename for error reporting.
    pub fn from_str_with_filename(content: &str, filename: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| Error::parse(e, content, filename))?;
        let config = file.output;

        if let Some(message) = config.validate() {
            return Err(Error::validation(message, content, filename));
        }
        Ok(config)
    }

    /// Returns a description of the first semantic problem, if any.
    fn validate(&self) -> Option<String> {
        if self.artifact_root.as_os_str().is_empty() {
            return Some("artifact-root cannot be empty".to_string());
        }
        if matches!(&self.generated_sources_root, Some(root) if root.as_os_str().is_empty()) {
            return Some("generated-sources-root cannot be empty".to_string());
        }
        if self.class_extension.is_empty() {
            return Some("class-extension cannot be empty".to_string());
        }
        if self.class_extension.contains(['.', '/', '\\']) {
            return Some(format!(
                "class-extension '{}' must not contain '.', '/' or '\\'",
                self.class_extension
            ));
        }
        None
    }
}

impl FromStr for OutputConfig {
    type Err = Box<Error>;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_str_with_filename(s, paths::CONFIG_FILE)
    }
}
