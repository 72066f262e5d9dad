//! Object-store locations of the form `scheme://bucket/object/path`.

use std::fmt;

/// A bucket/object pair split out of a location string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub bucket: String,
    pub object: String,
}

impl ObjectLocation {
    /// Split a location into bucket and object path.
    ///
    /// The scheme prefix is optional. The first path segment is the bucket and
    /// everything after it is the object path. Returns `None` when either part
    /// is empty.
    pub fn parse(location: &str) -> Option<Self> {
        let trimmed = location.trim();
        let path = match trimmed.split_once("://") {
            Some((_, rest)) => rest,
            None => trimmed,
        };

        let (bucket, object) = path.split_once('/')?;
        if bucket.is_empty() || object.is_empty() {
            return None;
        }

        Some(Self {
            bucket: bucket.to_string(),
            object: object.to_string(),
        })
    }

    /// Whether the object looks like a YAML document
    pub fn is_yaml(&self) -> bool {
        let lower = self.object.to_ascii_lowercase();
        lower.ends_with(".yaml") || lower.ends_with(".yml")
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gs://{}/{}", self.bucket, self.object)
    }
}
