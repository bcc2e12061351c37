//! Output coordination for a code-generation pass.
//!
//! This crate decides where generated output goes and persists the service
//! registration metadata aggregated across a pass.
//!
//! # Module Organization
//!
//! - [`locator`] - Destinations for class artifacts and ancillary files
//!   ([`OutputLocator`], [`DirectoryLocator`])
//! - [`memory`] - In-memory locator without ancillary file support
//! - [`registry`] - Service type to implementation aggregation
//! - [`coordinator`] - Pass lifecycle and descriptor persistence
//! - [`testing`] - Test utilities (feature-gated)
//!
//! # Example
//!
//! ```ignore
//! let coordinator = FinalizationCoordinator::from_config(&OutputConfig::from_file("quill.toml")?);
//!
//! let mut out = coordinator.visit_class(&"com.example.impl.A".parse()?)?;
//! out.write_all(&bytes)?;
//! out.close()?;
//!
//! coordinator.visit_service_descriptor("com.example.Plugin".parse()?, "com.example.impl.A".parse()?)?;
//! coordinator.finish()?;
//! ```

pub mod coordinator;
pub mod locator;
pub mod memory;
pub mod registry;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use coordinator::{FinalizationCoordinator, FinishReport};
pub use locator::{DirectoryLocator, OutputLocator};
pub use memory::MemoryLocator;
pub use registry::{ServiceRegistry, ServiceSnapshot};
