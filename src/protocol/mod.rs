//! Wire message model for the Lighthouse protocol.
//!
//! Clients send [`Request`]s addressed by a [`Path`] and a [`Verb`]; the
//! server answers with [`Reply`] messages carrying an HTTP-like status code.
//! Field names on the wire are the short upper-case keys the server uses
//! (`REID`, `VERB`, `PAYL`, ...).

mod auth;
pub mod display;
pub mod input;
mod path;
mod reply;
mod request;
mod verb;

pub use auth::Auth;
pub use path::Path;
pub use reply::{MalformedMessage, Reply};
pub use request::{Request, RequestId};
pub use verb::Verb;
