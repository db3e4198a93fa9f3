//! Request verbs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The operation kind of a request.
///
/// Every verb except [`Verb::Stream`] expects a single reply. `STREAM` opens a
/// subscription that pushes replies until a `STOP` for the same path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    /// Create a resource and write to it.
    Post,
    /// Create a resource.
    Create,
    /// Create a directory.
    Mkdir,
    /// Delete a resource.
    Delete,
    /// List a directory.
    List,
    /// Read a resource.
    Get,
    /// Write a resource.
    Put,
    /// Stop a previously started stream.
    Stop,
    /// Link a source resource into a destination.
    Link,
    /// Remove a link.
    Unlink,
    /// Subscribe to a resource.
    Stream,
}

impl Verb {
    /// Returns the wire spelling of the verb.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Create => "CREATE",
            Self::Mkdir => "MKDIR",
            Self::Delete => "DELETE",
            Self::List => "LIST",
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Stop => "STOP",
            Self::Link => "LINK",
            Self::Unlink => "UNLINK",
            Self::Stream => "STREAM",
        }
    }

    /// Returns `true` for verbs that produce a sequence of replies.
    #[must_use]
    pub const fn is_streaming(self) -> bool { matches!(self, Self::Stream) }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::codec::{Codec, MessagePackCodec};

    #[rstest]
    #[case(Verb::Post)]
    #[case(Verb::Mkdir)]
    #[case(Verb::Unlink)]
    #[case(Verb::Stream)]
    fn wire_spelling_matches_display(#[case] verb: Verb) {
        let bytes = MessagePackCodec.encode(&verb).expect("encode verb");
        let text: String = MessagePackCodec.decode(&bytes).expect("decode as string");
        assert_eq!(text, verb.to_string());
    }

    #[test]
    fn only_stream_is_streaming() {
        assert!(Verb::Stream.is_streaming());
        assert!(!Verb::Stop.is_streaming());
        assert!(!Verb::Get.is_streaming());
    }
}
