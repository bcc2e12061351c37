//! Service registration aggregated across one compilation pass.
//!
//! Generation calls register implementations as they produce them; the
//! registry collapses duplicates and hands out a sorted snapshot for
//! descriptor output.
//!
//! # Example
//!
//! ```ignore
//! let mut registry = ServiceRegistry::new();
//!
//! registry.register(plugin.clone(), impl_b);
//! registry.register(plugin.clone(), impl_a.clone());
//! registry.register(plugin.clone(), impl_a);
//!
//! // { "com.example.Plugin": ["com.example.impl.A", "com.example.impl.B"] }
//! let snapshot = registry.snapshot();
//! ```

use std::collections::{BTreeMap, BTreeSet};

use quill_core::{QualifiedName, Result, ServiceType};

/// Service type to implementations, each list sorted lexicographically.
pub type ServiceSnapshot = BTreeMap<ServiceType, Vec<QualifiedName>>;

/// In-memory `service type -> implementations` relation.
///
/// Single writer by design; [`FinalizationCoordinator`](crate::FinalizationCoordinator)
/// wraps it in a mutex when a pass is shared between threads.
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    entries: BTreeMap<ServiceType, BTreeSet<QualifiedName>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `implementation` to the set for `service_type`. Idempotent.
    pub fn register(&mut self, service_type: ServiceType, implementation: QualifiedName) {
        self.entries
            .entry(service_type)
            .or_default()
            .insert(implementation);
    }

    /// Register against the service type named by a Rust type.
    pub fn register_type<S: ?Sized>(&mut self, implementation: QualifiedName) -> Result<()> {
        let service_type = QualifiedName::of::<S>()?;
        self.register(service_type, implementation);
        Ok(())
    }

    pub fn contains(&self, service_type: &ServiceType, implementation: &QualifiedName) -> bool {
        self.entries
            .get(service_type)
            .is_some_and(|impls| impls.contains(implementation))
    }

    /// Current state with implementations in lexicographic order.
    pub fn snapshot(&self) -> ServiceSnapshot {
        self.entries
            .iter()
            .map(|(service_type, impls)| (service_type.clone(), impls.iter().cloned().collect()))
            .collect()
    }

    /// Number of service types with at least one implementation.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
