//! End-of-pass persistence of service descriptors.

use std::{collections::BTreeSet, io::Write};

use parking_lot::Mutex;
use quill_core::{
    ArtifactHandle, ArtifactWriter, Error, OutputConfig, PassState, QualifiedName, RelativePath,
    Result, ServiceType, paths,
};

use crate::{
    locator::{DirectoryLocator, OutputLocator},
    registry::{ServiceRegistry, ServiceSnapshot},
};

/// Outcome of a successful [`FinalizationCoordinator::finish`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FinishReport {
    /// Service types whose descriptor was written.
    pub written: Vec<ServiceType>,
    /// Service types skipped because the locator has no `META-INF` support.
    pub skipped: Vec<ServiceType>,
}

#[derive(Debug, Default)]
struct Pass {
    registry: ServiceRegistry,
    state: PassState,
}

/// Moves the pass to `Closed` when dropped, including during unwinding.
struct CloseOnDrop<'a>(&'a Mutex<Pass>);

impl Drop for CloseOnDrop<'_> {
    fn drop(&mut self) {
        self.0.lock().state = PassState::Closed;
    }
}

/// Front door of one compilation pass.
///
/// Generation calls visit artifacts and register services through it; the
/// driver calls [`finish`](Self::finish) once at the end. All methods take
/// `&self` so a driver may share the coordinator between threads.
#[derive(Debug)]
pub struct FinalizationCoordinator<L> {
    locator: L,
    pass: Mutex<Pass>,
    merge_existing: bool,
}

impl FinalizationCoordinator<DirectoryLocator> {
    /// Coordinator writing to the directories of `config`.
    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(DirectoryLocator::new(config))
            .with_merge_existing(config.merge_existing_descriptors)
    }
}

impl<L: OutputLocator> FinalizationCoordinator<L> {
    pub fn new(locator: L) -> Self {
        Self {
            locator,
            pass: Mutex::new(Pass::default()),
            merge_existing: false,
        }
    }

    /// Union lines already present in descriptor files with the registry.
    pub fn with_merge_existing(mut self, merge: bool) -> Self {
        self.merge_existing = merge;
        self
    }

    pub fn locator(&self) -> &L {
        &self.locator
    }

    pub fn state(&self) -> PassState {
        self.pass.lock().state
    }

    pub fn visit_class(&self, name: &QualifiedName) -> Result<ArtifactWriter> {
        self.locator.visit_class(name)
    }

    pub fn visit_meta_inf_file(&self, path: &RelativePath) -> Result<Option<ArtifactHandle>> {
        self.locator.visit_meta_inf_file(path)
    }

    pub fn visit_generated_file(&self, path: &RelativePath) -> Result<Option<ArtifactHandle>> {
        self.locator.visit_generated_file(path)
    }

    /// Register `implementation` under `service_type`.
    ///
    /// Fails with `InvalidState` once [`finish`](Self::finish) has started.
    pub fn visit_service_descriptor(
        &self,
        service_type: ServiceType,
        implementation: QualifiedName,
    ) -> Result<()> {
        let mut pass = self.pass.lock();
        if pass.state != PassState::Open {
            return Err(Error::invalid_state("register a service entry", pass.state));
        }
        pass.registry.register(service_type, implementation);
        Ok(())
    }

    /// Register against the service type named by a Rust type.
    pub fn visit_service_descriptor_for<S: ?Sized>(
        &self,
        implementation: QualifiedName,
    ) -> Result<()> {
        self.visit_service_descriptor(QualifiedName::of::<S>()?, implementation)
    }

    /// Snapshot of the entries registered so far.
    pub fn service_entries(&self) -> ServiceSnapshot {
        self.pass.lock().registry.snapshot()
    }

    /// Write one `META-INF/services/<type>` descriptor per service type.
    ///
    /// Every type is attempted; failures are collected into a single
    /// `AggregatedWriteFailure`. Calling this again after the pass closed
    /// rewrites the same content.
    pub fn finish(&self) -> Result<FinishReport> {
        let snapshot = {
            let mut pass = self.pass.lock();
            if pass.state == PassState::Finalizing {
                return Err(Error::invalid_state("finish", pass.state));
            }
            pass.state = PassState::Finalizing;
            pass.registry.snapshot()
        };
        let _close = CloseOnDrop(&self.pass);

        let mut report = FinishReport::default();
        let mut failed_types = Vec::new();
        let mut failures = Vec::new();

        for (service_type, impls) in &snapshot {
            match self.write_descriptor(service_type, impls) {
                Ok(true) => report.written.push(service_type.clone()),
                Ok(false) => {
                    tracing::debug!(service = %service_type, "service descriptors unsupported, skipping");
                    report.skipped.push(service_type.clone());
                }
                Err(e) => {
                    tracing::warn!(service = %service_type, error = %e, "failed to write service descriptor");
                    failed_types.push(service_type.to_string());
                    failures.push(*e);
                }
            }
        }

        tracing::info!(
            written = report.written.len(),
            skipped = report.skipped.len(),
            failed = failures.len(),
            "finished writing service descriptors"
        );

        if !failures.is_empty() {
            return Err(Box::new(Error::AggregatedWriteFailure {
                service_types: failed_types,
                failures,
                written: report.written.iter().map(ToString::to_string).collect(),
                skipped: report.skipped.iter().map(ToString::to_string).collect(),
            }));
        }
        Ok(report)
    }

    /// Returns `false` when the locator does not support `META-INF` files.
    fn write_descriptor(&self, service_type: &ServiceType, impls: &[QualifiedName]) -> Result<bool> {
        let path = RelativePath::new(paths::service_descriptor_path(service_type.as_str()))?;
        let Some(handle) = self.locator.visit_meta_inf_file(&path)? else {
            return Ok(false);
        };

        let mut lines: BTreeSet<String> = impls.iter().map(|i| i.to_string()).collect();
        if self.merge_existing {
            if let Some(existing) = handle.text_content()? {
                lines.extend(existing_entries(&existing));
            }
        }

        let mut writer = handle.open_writer()?;
        for line in &lines {
            writeln!(writer, "{}", line)
                .map_err(|e| Error::destination_unavailable(handle.path(), e))?;
        }
        writer.close()?;

        tracing::debug!(
            service = %service_type,
            path = %handle.path().display(),
            entries = lines.len(),
            "wrote service descriptor"
        );
        Ok(true)
    }
}

/// Implementation names listed in an existing descriptor, ignoring blank
/// lines and `#` comments.
fn existing_entries(content: &str) -> impl Iterator<Item = String> + '_ {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        panic::{self, AssertUnwindSafe},
        sync::atomic::{AtomicBool, Ordering},
    };

    use tempfile::TempDir;

    use super::*;
    use crate::{
        memory::MemoryLocator,
        testing::{generate_to_temp, read_descriptor},
    };

    fn name(s: &str) -> QualifiedName {
        QualifiedName::new(s).unwrap()
    }

    fn coordinator(temp: &TempDir) -> FinalizationCoordinator<DirectoryLocator> {
        FinalizationCoordinator::from_config(&OutputConfig::new(temp.path()))
    }

    #[test]
    fn test_finish_writes_sorted_descriptor() {
        let temp = TempDir::new().unwrap();
        let coordinator = coordinator(&temp);
        let plugin = name("com.example.Plugin");

        coordinator
            .visit_service_descriptor(plugin.clone(), name("com.example.impl.B"))
            .unwrap();
        coordinator
            .visit_service_descriptor(plugin.clone(), name("com.example.impl.A"))
            .unwrap();

        let report = coordinator.finish().unwrap();

        assert_eq!(report.written, vec![plugin]);
        assert!(report.skipped.is_empty());
        let content = fs::read_to_string(
            temp.path()
                .join("META-INF")
                .join("services")
                .join("com.example.Plugin"),
        )
        .unwrap();
        assert_eq!(content, "com.example.impl.A\ncom.example.impl.B\n");
        insta::assert_snapshot!(content, @r"
        com.example.impl.A
        com.example.impl.B
        ");
    }

    #[test]
    fn test_finish_twice_is_byte_identical() {
        let temp = TempDir::new().unwrap();
        let coordinator = coordinator(&temp);
        coordinator
            .visit_service_descriptor(name("a.T"), name("a.X"))
            .unwrap();

        coordinator.finish().unwrap();
        let first = read_descriptor(temp.path(), "a.T").unwrap();
        coordinator.finish().unwrap();
        let second = read_descriptor(temp.path(), "a.T").unwrap();

        assert_eq!(first, second);
        assert_eq!(coordinator.state(), PassState::Closed);
    }

    #[test]
    fn test_registration_after_close_is_rejected() {
        let temp = TempDir::new().unwrap();
        let coordinator = coordinator(&temp);
        assert_eq!(coordinator.state(), PassState::Open);

        coordinator.finish().unwrap();
        let err = coordinator
            .visit_service_descriptor(name("a.T"), name("a.X"))
            .unwrap_err();

        assert!(matches!(
            *err,
            Error::InvalidState {
                state: PassState::Closed,
                ..
            }
        ));
        assert!(coordinator.service_entries().is_empty());
    }

    #[test]
    fn test_empty_registry_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let coordinator = coordinator(&temp);

        let report = coordinator.finish().unwrap();

        assert_eq!(report, FinishReport::default());
        assert!(!temp.path().join("META-INF").exists());
    }

    #[test]
    fn test_unsupported_locator_skips_types() {
        let coordinator = FinalizationCoordinator::new(MemoryLocator::new());
        coordinator
            .visit_service_descriptor(name("a.T"), name("a.X"))
            .unwrap();

        let report = coordinator.finish().unwrap();

        assert!(report.written.is_empty());
        assert_eq!(report.skipped, vec![name("a.T")]);
    }

    #[test]
    fn test_partial_failure_reports_every_failing_type() {
        let temp = TempDir::new().unwrap();
        let coordinator = coordinator(&temp);
        let services = temp.path().join("META-INF").join("services");
        fs::create_dir_all(services.join("a.Broken1")).unwrap();
        fs::create_dir_all(services.join("a.Broken2")).unwrap();

        for service_type in ["a.Broken1", "a.Fine", "a.Broken2"] {
            coordinator
                .visit_service_descriptor(name(service_type), name("a.Impl"))
                .unwrap();
        }

        let err = coordinator.finish().unwrap_err();

        assert_eq!(err.failed_service_types(), ["a.Broken1", "a.Broken2"]);
        match *err {
            Error::AggregatedWriteFailure {
                ref failures,
                ref written,
                ref skipped,
                ..
            } => {
                assert_eq!(failures.len(), 2);
                assert_eq!(written, &["a.Fine"]);
                assert!(skipped.is_empty());
            }
            ref other => panic!("expected aggregated failure, got {other:?}"),
        }
        assert_eq!(read_descriptor(temp.path(), "a.Fine").unwrap(), ["a.Impl"]);
        assert_eq!(coordinator.state(), PassState::Closed);
    }

    #[test]
    fn test_unavailable_meta_inf_dir_fails_the_type() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("META-INF"), "occupied").unwrap();
        let coordinator = coordinator(&temp);
        coordinator
            .visit_service_descriptor(name("x.T"), name("x.A"))
            .unwrap();

        let err = coordinator.finish().unwrap_err();

        assert_eq!(err.to_string(), "failed to write 1 service descriptor(s): x.T");
        assert_eq!(err.failed_service_types(), ["x.T"]);
        match *err {
            Error::AggregatedWriteFailure { ref failures, .. } => assert!(matches!(
                failures.as_slice(),
                [Error::DestinationUnavailable { .. }]
            )),
            ref other => panic!("expected aggregated failure, got {other:?}"),
        }
        assert_eq!(
            fs::read_to_string(temp.path().join("META-INF")).unwrap(),
            "occupied"
        );
    }

    /// Locator whose first descriptor visit panics.
    struct PanicOnceLocator {
        inner: MemoryLocator,
        panicked: AtomicBool,
    }

    impl OutputLocator for PanicOnceLocator {
        fn visit_class(&self, name: &QualifiedName) -> Result<ArtifactWriter> {
            self.inner.visit_class(name)
        }

        fn visit_meta_inf_file(&self, path: &RelativePath) -> Result<Option<ArtifactHandle>> {
            if !self.panicked.swap(true, Ordering::SeqCst) {
                panic!("locator failure");
            }
            self.inner.visit_meta_inf_file(path)
        }

        fn visit_generated_file(&self, path: &RelativePath) -> Result<Option<ArtifactHandle>> {
            self.inner.visit_generated_file(path)
        }
    }

    #[test]
    fn test_panicking_locator_still_closes_the_pass() {
        let coordinator = FinalizationCoordinator::new(PanicOnceLocator {
            inner: MemoryLocator::new(),
            panicked: AtomicBool::new(false),
        });
        coordinator
            .visit_service_descriptor(name("x.T"), name("x.A"))
            .unwrap();

        let result = panic::catch_unwind(AssertUnwindSafe(|| coordinator.finish()));
        assert!(result.is_err());
        assert_eq!(coordinator.state(), PassState::Closed);

        let report = coordinator.finish().unwrap();
        assert_eq!(report.skipped, vec![name("x.T")]);
    }

    #[test]
    fn test_merge_existing_descriptor() {
        let temp = TempDir::new().unwrap();
        let services = temp.path().join("META-INF").join("services");
        fs::create_dir_all(&services).unwrap();
        fs::write(
            services.join("a.T"),
            "# previous build\na.Old\n\na.Shared  # comment\n",
        )
        .unwrap();

        let coordinator = FinalizationCoordinator::from_config(
            &OutputConfig::new(temp.path()).with_merge_existing_descriptors(true),
        );
        coordinator
            .visit_service_descriptor(name("a.T"), name("a.Shared"))
            .unwrap();
        coordinator
            .visit_service_descriptor(name("a.T"), name("a.New"))
            .unwrap();

        coordinator.finish().unwrap();
        let first = read_descriptor(temp.path(), "a.T").unwrap();
        coordinator.finish().unwrap();

        assert_eq!(first, ["a.New", "a.Old", "a.Shared"]);
        assert_eq!(read_descriptor(temp.path(), "a.T").unwrap(), first);
    }

    #[test]
    fn test_existing_descriptor_replaced_without_merge() {
        let temp = TempDir::new().unwrap();
        let services = temp.path().join("META-INF").join("services");
        fs::create_dir_all(&services).unwrap();
        fs::write(services.join("a.T"), "a.Stale\n").unwrap();

        let coordinator = coordinator(&temp);
        coordinator
            .visit_service_descriptor(name("a.T"), name("a.Fresh"))
            .unwrap();
        coordinator.finish().unwrap();

        assert_eq!(read_descriptor(temp.path(), "a.T").unwrap(), ["a.Fresh"]);
    }

    #[test]
    fn test_generate_into_temp_dir() {
        let temp = generate_to_temp(|dir| {
            let coordinator = FinalizationCoordinator::from_config(&OutputConfig::new(dir));
            coordinator.visit_service_descriptor_for::<FinishReport>(name("a.Report"))?;
            coordinator.finish()?;
            Ok(())
        })
        .unwrap();

        let service_type = QualifiedName::of::<FinishReport>().unwrap();
        assert_eq!(
            read_descriptor(temp.path(), service_type.as_str()).unwrap(),
            ["a.Report"]
        );
    }

    #[test]
    fn test_existing_entries_ignores_comments() {
        let entries: Vec<_> = existing_entries("a.B\n  # note\n\n c.D # trailing\n").collect();
        assert_eq!(entries, ["a.B", "c.D"]);
    }
}
