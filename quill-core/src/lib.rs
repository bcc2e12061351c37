//! Core types for the Quill output layer.
//!
//! This crate provides the identifiers, artifact handles, configuration and
//! error type shared by every output locator.

// Miette's derive macro generates code that triggers these warnings
#![allow(unused_assignments)]

mod config;
mod error;
mod file;
mod name;
pub mod paths;

pub use config::OutputConfig;
pub use error::{Error, PassState, Result};
// File operations
pub use file::{ArtifactHandle, ArtifactWriter, MemoryBuffer, ensure_parent_dir};
// Identifiers
pub use name::{QualifiedName, RelativePath, ServiceType};
