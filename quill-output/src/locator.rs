//! Mapping of logical identifiers to output destinations.

use std::path::PathBuf;

use quill_core::{
    ArtifactHandle, ArtifactWriter, OutputConfig, QualifiedName, RelativePath, Result,
    ensure_parent_dir, paths,
};

/// Hands generation logic a fresh destination for each artifact.
///
/// Identifiers are validated when they are constructed, so an implementation
/// only deals with storage. `Ok(None)` from the ancillary visits means the
/// locator does not support that kind of file; it is never an error.
pub trait OutputLocator {
    /// Open a writer for the artifact of a class.
    ///
    /// Visiting the same name twice targets the same destination but yields
    /// two independent write sessions.
    fn visit_class(&self, name: &QualifiedName) -> Result<ArtifactWriter>;

    /// A file under the artifact tree's `META-INF` directory.
    fn visit_meta_inf_file(&self, path: &RelativePath) -> Result<Option<ArtifactHandle>>;

    /// A file under the generated-source tree.
    fn visit_generated_file(&self, path: &RelativePath) -> Result<Option<ArtifactHandle>>;
}

impl<L: OutputLocator + ?Sized> OutputLocator for &L {
    fn visit_class(&self, name: &QualifiedName) -> Result<ArtifactWriter> {
        (**self).visit_class(name)
    }

    fn visit_meta_inf_file(&self, path: &RelativePath) -> Result<Option<ArtifactHandle>> {
        (**self).visit_meta_inf_file(path)
    }

    fn visit_generated_file(&self, path: &RelativePath) -> Result<Option<ArtifactHandle>> {
        (**self).visit_generated_file(path)
    }
}

/// Locator writing to the directories named by an [`OutputConfig`].
///
/// Directory layout:
///
/// ```text
/// <artifact-root>/com/example/Foo.class
/// <artifact-root>/META-INF/services/com.example.Plugin
/// <generated-sources-root>/<relative path>
/// ```
#[derive(Debug, Clone)]
pub struct DirectoryLocator {
    artifact_root: PathBuf,
    generated_sources_root: Option<PathBuf>,
    class_extension: String,
}

impl DirectoryLocator {
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            artifact_root: config.artifact_root.clone(),
            generated_sources_root: config.generated_sources_root.clone(),
            class_extension: config.class_extension.clone(),
        }
    }

    /// Physical destination of a class artifact.
    pub fn class_path(&self, name: &QualifiedName) -> PathBuf {
        self.artifact_root.join(name.to_path(&self.class_extension))
    }

    /// Physical destination of a `META-INF` file.
    pub fn meta_inf_path(&self, path: &RelativePath) -> PathBuf {
        self.artifact_root
            .join(paths::META_INF_DIR)
            .join(path.to_path_buf())
    }

    /// Physical destination of a generated-source file, if supported.
    pub fn generated_path(&self, path: &RelativePath) -> Option<PathBuf> {
        self.generated_sources_root
            .as_ref()
            .map(|root| root.join(path.to_path_buf()))
    }

    fn handle(&self, path: &RelativePath, target: PathBuf) -> Result<ArtifactHandle> {
        ensure_parent_dir(&target)?;
        tracing::debug!(name = %path, path = %target.display(), "visited ancillary file");
        Ok(ArtifactHandle::new(path.as_str(), target))
    }
}

impl OutputLocator for DirectoryLocator {
    fn visit_class(&self, name: &QualifiedName) -> Result<ArtifactWriter> {
        let path = self.class_path(name);
        let handle = ArtifactHandle::new(name.as_str(), &path);
        let writer = handle.open_writer()?;
        tracing::debug!(class = %name, path = %path.display(), "visited class");
        Ok(writer)
    }

    fn visit_meta_inf_file(&self, path: &RelativePath) -> Result<Option<ArtifactHandle>> {
        let target = self.meta_inf_path(path);
        self.handle(path, target).map(Some)
    }

    fn visit_generated_file(&self, path: &RelativePath) -> Result<Option<ArtifactHandle>> {
        match self.generated_path(path) {
            Some(target) => self.handle(path, target).map(Some),
            None => Ok(None),
        }
    }
}
