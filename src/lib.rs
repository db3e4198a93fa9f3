#![doc(html_root_url = "https://docs.rs/nighthouse/latest")]
//! Asynchronous client for the Lighthouse display and input service.
//!
//! A [`Lighthouse`] connection sends path-addressed requests (`GET`, `PUT`,
//! `LIST`, ...) over a persistent link and correlates the server's replies
//! with them. Streams opened with [`Lighthouse::stream`] are shared: any
//! number of local consumers of one path ride on a single server-side
//! subscription.
//!
//! ```no_run
//! use futures::StreamExt;
//! use nighthouse::{Auth, LIGHTHOUSE_FRAME_BYTES};
//!
//! # #[tokio::main]
//! # async fn main() -> nighthouse::Result<()> {
//! let lh = nighthouse::connect(
//!     "wss://lighthouse.uni-kiel.de/websocket",
//!     Auth::new("alice", "API-TOKEN"),
//! )
//! .await?;
//! lh.put_model(&[255; LIGHTHOUSE_FRAME_BYTES]).await?;
//!
//! let mut model = lh.stream_model().await?;
//! if let Some(event) = model.next().await {
//!     println!("{:?}", event?.payload);
//! }
//! lh.close().await
//! # }
//! ```

pub mod builder;
pub mod codec;
pub mod config;
pub mod connection;
pub mod deferred;
pub mod error;
pub mod metrics;
pub mod protocol;
pub mod transport;

pub use builder::{DEFAULT_URL, LighthouseBuilder, connect};
pub use config::ReplayConfig;
pub use connection::{Lighthouse, ReplyStream};
pub use error::{CodecError, LighthouseError, Result, TransportError};
pub use protocol::{
    Auth,
    MalformedMessage,
    Path,
    Reply,
    Request,
    RequestId,
    Verb,
    display::{LIGHTHOUSE_COLS, LIGHTHOUSE_FRAME_BYTES, LIGHTHOUSE_ROWS, LIGHTHOUSE_WINDOWS},
};
