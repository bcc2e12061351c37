//! Validated identifiers used as output keys.
//!
//! Both identifier kinds are checked before any filesystem interaction:
//! an unchecked mapping would allow writing outside the configured roots.

use std::{fmt, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize, Serializer};

use crate::{Error, Result};

/// A dotted identifier such as `com.example.Foo`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct QualifiedName(String);

/// A discoverable service contract.
pub type ServiceType = QualifiedName;

impl QualifiedName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if let Some(reason) = validate_qualified_name(&name) {
            return Err(Error::invalid_identifier("qualified name", name, reason));
        }
        Ok(Self(name))
    }

    /// Name derived from a Rust type path, e.g. `my_crate::api::Plugin` becomes
    /// `my_crate.api.Plugin`. Generic instantiations are rejected.
    pub fn of<T: ?Sized>() -> Result<Self> {
        Self::new(std::any::type_name::<T>().replace("::", "."))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// The last segment (`Foo` for `com.example.Foo`).
    pub fn simple_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    /// Everything before the last segment, if any.
    pub fn package(&self) -> Option<&str> {
        self.0.rsplit_once('.').map(|(package, _)| package)
    }

    /// Relative file path for this name with the given extension.
    pub fn to_path(&self, extension: &str) -> PathBuf {
        let mut path: PathBuf = self.segments().collect();
        path.set_extension(extension);
        path
    }
}

/// Returns the reason a qualified name is invalid, or `None` if it is valid.
fn validate_qualified_name(name: &str) -> Option<String> {
    if name.is_empty() {
        return Some("name cannot be empty".to_string());
    }
    if let Some(c) = name
        .chars()
        .find(|c| is_forbidden_char(*c) || matches!(c, '/' | '<' | '>' | ',' | '&' | '*' | '[' | ']' | ';'))
    {
        return Some(format!("contains illegal character {:?}", c));
    }
    if name.split('.').any(str::is_empty) {
        return Some("contains an empty segment".to_string());
    }
    None
}

fn is_forbidden_char(c: char) -> bool {
    matches!(c, '\\' | ':' | '\0') || c.is_whitespace() || c.is_control()
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for QualifiedName {
    type Err = Box<Error>;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for QualifiedName {
    type Error = Box<Error>;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<&str> for QualifiedName {
    type Error = Box<Error>;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl Serialize for QualifiedName {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl AsRef<str> for QualifiedName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A slash-separated path fragment rooted under one of the output trees.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelativePath(String);

impl RelativePath {
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if let Some(reason) = validate_relative_path(&path) {
            return Err(Error::invalid_identifier("relative path", path, reason));
        }
        Ok(Self(path))
    }

    /// Append one or more segments, validating the result.
    pub fn join(&self, tail: &str) -> Result<Self> {
        Self::new(format!("{}/{}", self.0, tail))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Platform path built from the segments.
    pub fn to_path_buf(&self) -> PathBuf {
        self.segments().collect()
    }
}

fn validate_relative_path(path: &str) -> Option<String> {
    if path.is_empty() {
        return Some("path cannot be empty".to_string());
    }
    // ':' would turn the first segment into a drive prefix on Windows.
    if let Some(c) = path
        .chars()
        .find(|c| matches!(c, '\\' | ':' | '\0') || c.is_control())
    {
        return Some(format!("contains illegal character {:?}", c));
    }
    for segment in path.split('/') {
        match segment {
            "" => return Some("contains an empty segment".to_string()),
            "." | ".." => return Some(format!("contains a '{}' segment", segment)),
            _ => {}
        }
    }
    None
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RelativePath {
    type Err = Box<Error>;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<&str> for RelativePath {
    type Error = Box<Error>;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(s)
    }
}
