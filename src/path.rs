//! Path utilities: logical file paths, library paths and library references.
//!
//! Logical file paths are always `/`-separated and relative, independent of
//! the host platform. A [`LibraryPath`] names a node of the library tree by
//! its segments from the root. A [`LibraryRef`] is the textual form found in
//! annotations, marks and flags, resolved against the library that declares it.

use std::fmt;

use glob::Pattern;

use crate::defaults::PRIVATE_LIBRARY_DIR;
use crate::error::{Error, Result};

/// Match a logical path against a glob pattern
pub fn glob_match(pattern: &str, path: &str) -> Result<bool> {
    let pattern = Pattern::new(pattern).map_err(Error::Glob)?;
    Ok(pattern.matches(path))
}

/// Normalize a host path fragment into a logical `/`-separated path.
///
/// Backslashes become slashes, `.` segments and empty segments are dropped.
/// `..` is rejected since logical paths never leave their source root.
pub fn normalize_logical_path(path: &str) -> Result<String> {
    let replaced = path.replace('\\', "/");
    let mut segments = Vec::new();
    for segment in replaced.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(Error::Path {
                    message: format!("Path '{}' must not contain '..'", path),
                })
            }
            other => segments.push(other),
        }
    }
    if segments.is_empty() {
        return Err(Error::Path {
            message: format!("Path '{}' is empty", path),
        });
    }
    Ok(segments.join("/"))
}

/// The position of a library in the tree, as segments from the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LibraryPath(Vec<String>);

impl LibraryPath {
    /// The root library.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from segments, validating each one.
    pub fn from_segments<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut path = Self::root();
        for segment in segments {
            path = path.join(segment)?;
        }
        Ok(path)
    }

    /// Parse a root-anchored path such as `a/b`, `/a/b` or `/` (the root).
    pub fn parse(text: &str) -> Result<Self> {
        Self::from_segments(text.split('/').filter(|s| !s.is_empty()))
    }

    /// Append a child segment.
    pub fn join(&self, segment: impl Into<String>) -> Result<Self> {
        let segment = segment.into();
        validate_segment(&segment)?;
        let mut segments = self.0.clone();
        segments.push(segment);
        Ok(Self(segments))
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The last segment, or `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.0.last().map(|s| s.as_str())
    }

    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// The ancestor made of the first `len` segments.
    pub fn prefix(&self, len: usize) -> Self {
        Self(self.0[..len.min(self.0.len())].to_vec())
    }
}

impl fmt::Display for LibraryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "(root)")
        } else {
            write!(f, "{}", self.0.join("/"))
        }
    }
}

fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty() || segment == "." || segment == ".." || segment.contains(['@', '/']) {
        return Err(Error::LibraryTree {
            message: format!("Invalid library name '{}'", segment),
            hint: Some("Library names must be non-empty and must not be '.', '..', or contain '@' or '/'".to_string()),
        });
    }
    Ok(())
}

/// A reference to a library as written in an annotation, mark or flag.
///
/// - `@a@b` is relative: it descends from the declaring library.
/// - `/a/b` is absolute: it starts at the root; `/` alone is the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryRef {
    pub absolute: bool,
    pub segments: Vec<String>,
    raw: String,
}

impl LibraryRef {
    pub fn parse(text: &str) -> Result<Self> {
        let raw = text.trim().trim_matches('"').trim_matches('\'').to_string();
        let invalid = |message: &str| Error::UnresolvedLibrary {
            reference: raw.clone(),
            origin: "library reference".to_string(),
            hint: Some(message.to_string()),
        };

        if let Some(rest) = raw.strip_prefix('/') {
            let segments: Vec<String> = rest
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            return Ok(Self {
                absolute: true,
                segments,
                raw,
            });
        }

        let rest = raw
            .strip_prefix('@')
            .ok_or_else(|| invalid("References look like '@name', '@a@b' or '/a/b'"))?;
        let segments: Vec<String> = rest.split('@').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(invalid("Library names in a reference must not be empty"));
        }
        Ok(Self {
            absolute: false,
            segments,
            raw,
        })
    }

    /// Resolve this reference against the library that declares it.
    pub fn resolve(&self, declaring: &LibraryPath) -> Result<LibraryPath> {
        let base = if self.absolute {
            LibraryPath::root()
        } else {
            declaring.clone()
        };
        let mut path = base;
        for segment in &self.segments {
            path = path.join(segment.clone())?;
        }
        Ok(path)
    }
}

impl fmt::Display for LibraryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Split a logical file path into the library it implicitly belongs to and
/// the path remaining inside that library.
///
/// `_lib/a/_lib/b/config.yml` yields (`a/b`, `config.yml`).
pub fn implicit_library(path: &str) -> Result<(LibraryPath, String)> {
    let segments: Vec<&str> = path.split('/').collect();
    let mut library = LibraryPath::root();
    let mut start = 0;
    let mut i = 0;
    // The last segment is the file name and never opens a library.
    while i + 1 < segments.len() {
        if segments[i] == PRIVATE_LIBRARY_DIR {
            if i + 2 >= segments.len() {
                return Err(Error::LibraryTree {
                    message: format!(
                        "File '{}' is directly inside a {} directory",
                        path, PRIVATE_LIBRARY_DIR
                    ),
                    hint: Some(format!(
                        "Place library files under {}/<library-name>/",
                        PRIVATE_LIBRARY_DIR
                    )),
                });
            }
            library = library.join(segments[i + 1])?;
            i += 2;
            start = i;
        } else {
            i += 1;
        }
    }
    Ok((library, segments[start..].join("/")))
}
