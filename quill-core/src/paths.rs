//! Path constants for the output trees.

/// Directory under the artifact root holding ancillary metadata.
pub const META_INF_DIR: &str = "META-INF";

/// Directory under `META-INF` holding service descriptors.
pub const SERVICES_DIR: &str = "services";

/// Default extension appended to class artifacts.
pub const DEFAULT_CLASS_EXTENSION: &str = "class";

/// Default configuration file name.
pub const CONFIG_FILE: &str = "quill.toml";

/// Relative path (under `META-INF`) of the descriptor for a service type.
pub fn service_descriptor_path(service_type: &str) -> String {
    format!("{}/{}", SERVICES_DIR, service_type)
}
