//! Merge operations for data values
//!
//! Values documents are layered onto each other with the rules in
//! [`yaml`]: maps merge key by key, arrays and scalars are replaced, and
//! keys missing from earlier layers need explicit permission.
//!
//! ## Key Paths
//!
//! The `PathSegment` enum and [`parse_path`] turn flag keys such as
//! `app.ports[0]` into segments used to build and look up nested values.

pub mod yaml;

/// One step of a key path
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSegment {
    /// A map key
    Key(String),
    /// A sequence index
    Index(usize),
}

/// Parse a key path such as `app.ports[0].name` into segments.
///
/// Keys are separated by dots; `[n]` after a key indexes into a sequence.
/// An empty path is the whole document.
///
/// ```
/// use strata::merge::parse_path;
///
/// let segments = parse_path("servers[0].host");
/// assert_eq!(segments.len(), 3);
/// ```
pub fn parse_path(path: &str) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    for part in path.split('.') {
        let (key, mut indices) = match part.find('[') {
            Some(start) => part.split_at(start),
            None => (part, ""),
        };
        if !key.is_empty() {
            segments.push(PathSegment::Key(key.to_string()));
        }
        while let Some(rest) = indices.strip_prefix('[') {
            let (index, tail) = rest.split_once(']').unwrap_or((rest, ""));
            match index.trim().parse::<usize>() {
                Ok(idx) => segments.push(PathSegment::Index(idx)),
                Err(_) if !index.trim().is_empty() => {
                    segments.push(PathSegment::Key(index.trim().to_string()))
                }
                Err(_) => {}
            }
            indices = tail;
        }
    }
    segments
}
