//! Resource paths.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An ordered list of string segments addressing a remote resource.
///
/// Paths compare segment by segment, so `["user", "alice", "model"]` and
/// `["user/alice", "model"]` are different resources.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<String>);

impl Path {
    /// Build a path from its segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// The model path of `user`: `["user", <user>, "model"]`.
    #[must_use]
    pub fn model(user: &str) -> Self { Self::new(["user", user, "model"]) }

    /// Returns the segments of the path.
    #[must_use]
    pub fn segments(&self) -> &[String] { &self.0 }

    /// Returns `true` if the path has no segments.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0.join("/"))
    }
}

impl<S: Into<String>> FromIterator<S> for Path {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self { Self::new(iter) }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for Path {
    fn from(segments: [S; N]) -> Self { Self::new(segments) }
}

impl From<Vec<String>> for Path {
    fn from(segments: Vec<String>) -> Self { Self(segments) }
}

impl From<&[&str]> for Path {
    fn from(segments: &[&str]) -> Self { Self::new(segments.iter().copied()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_path_has_three_segments() {
        let path = Path::model("alice");
        assert_eq!(path.segments(), ["user", "alice", "model"]);
        assert_eq!(path.to_string(), "/user/alice/model");
    }

    #[test]
    fn segment_boundaries_matter() {
        assert_ne!(Path::from(["user", "alice"]), Path::from(["user/alice"]));
    }
}
