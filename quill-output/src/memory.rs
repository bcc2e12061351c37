//! In-memory locator for generators that only need class artifacts.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use quill_core::{
    ArtifactHandle, ArtifactWriter, MemoryBuffer, QualifiedName, RelativePath, Result,
};

use crate::locator::OutputLocator;

/// Keeps class artifacts in memory and supports no ancillary files.
///
/// Every [`visit_class`](OutputLocator::visit_class) replaces the buffer for
/// that name with a fresh one, so the last session wins.
#[derive(Debug, Default)]
pub struct MemoryLocator {
    classes: Mutex<BTreeMap<QualifiedName, MemoryBuffer>>,
}

impl MemoryLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written for a class, if it was visited.
    pub fn contents(&self, name: &QualifiedName) -> Option<Vec<u8>> {
        self.classes
            .lock()
            .get(name)
            .map(|buffer| buffer.lock().clone())
    }

    /// Every visited class name in lexicographic order.
    pub fn class_names(&self) -> Vec<QualifiedName> {
        self.classes.lock().keys().cloned().collect()
    }
}

impl OutputLocator for MemoryLocator {
    fn visit_class(&self, name: &QualifiedName) -> Result<ArtifactWriter> {
        let buffer = MemoryBuffer::default();
        self.classes.lock().insert(name.clone(), buffer.clone());
        Ok(ArtifactWriter::memory(name.as_str(), buffer))
    }

    fn visit_meta_inf_file(&self, _path: &RelativePath) -> Result<Option<ArtifactHandle>> {
        Ok(None)
    }

    fn visit_generated_file(&self, _path: &RelativePath) -> Result<Option<ArtifactHandle>> {
        Ok(None)
    }
}
