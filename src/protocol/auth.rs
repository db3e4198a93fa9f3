//! Caller credentials attached to every request.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Authentication credentials for a Lighthouse user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auth {
    /// The user name; also the `<user>` segment of model paths.
    #[serde(rename = "USER")]
    pub user: String,
    /// The API token issued for the user.
    #[serde(rename = "TOKEN")]
    pub token: String,
}

impl Auth {
    /// Create credentials from a user name and token.
    pub fn new(user: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            token: token.into(),
        }
    }
}

// Tokens stay out of logs.
impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_token() {
        let auth = Auth::new("alice", "s3cret");
        let rendered = format!("{auth:?}");
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("s3cret"));
    }
}
