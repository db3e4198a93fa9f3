//! Builder for configuring and connecting a [`Lighthouse`].

use crate::{
    Lighthouse,
    codec::{Codec, MessagePackCodec},
    config::ReplayConfig,
    error::Result,
    protocol::Auth,
    transport::{Transport, WebSocketTransport},
};

/// URL of the public Lighthouse server.
pub const DEFAULT_URL: &str = "wss://lighthouse.uni-kiel.de/websocket";

/// Builder for [`Lighthouse`].
///
/// `C` is the wire codec (default: [`MessagePackCodec`]).
///
/// # Examples
///
/// ```no_run
/// use nighthouse::{Auth, LighthouseBuilder, ReplayConfig};
///
/// # #[tokio::main]
/// # async fn main() -> nighthouse::Result<()> {
/// let lh = LighthouseBuilder::new(Auth::new("alice", "API-TOKEN"))
///     .url("ws://localhost:3000/websocket")
///     .replay(ReplayConfig::default().with_max_ids(32))
///     .connect()
///     .await?;
/// lh.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct LighthouseBuilder<C = MessagePackCodec> {
    auth: Auth,
    url: String,
    codec: C,
    replay: ReplayConfig,
}

impl LighthouseBuilder<MessagePackCodec> {
    /// Create a builder for `auth` targeting [`DEFAULT_URL`].
    #[must_use]
    pub fn new(auth: Auth) -> Self {
        Self {
            auth,
            url: DEFAULT_URL.to_owned(),
            codec: MessagePackCodec,
            replay: ReplayConfig::default(),
        }
    }
}

impl<C> LighthouseBuilder<C>
where
    C: Codec,
{
    /// Set the WebSocket URL of the server.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the replay buffer bounds.
    #[must_use]
    pub fn replay(mut self, replay: ReplayConfig) -> Self {
        self.replay = replay;
        self
    }

    /// Replace the wire codec.
    #[must_use]
    pub fn codec<C2: Codec>(self, codec: C2) -> LighthouseBuilder<C2> {
        LighthouseBuilder {
            auth: self.auth,
            url: self.url,
            codec,
            replay: self.replay,
        }
    }

    /// The configured server URL.
    #[must_use]
    pub fn target(&self) -> &str { &self.url }

    /// Bind the connection to an already constructed transport.
    ///
    /// The URL is ignored.
    #[must_use]
    pub fn build<T: Transport>(self, transport: T) -> Lighthouse<T, C> {
        Lighthouse::with_parts(self.auth, transport, self.codec, self.replay)
    }

    /// Connect over WebSocket and wait for the link to come up.
    ///
    /// # Errors
    ///
    /// Returns [`LighthouseError::Transport`](crate::LighthouseError::Transport)
    /// if the server cannot be reached.
    pub async fn connect(self) -> Result<Lighthouse<WebSocketTransport, C>> {
        let transport = WebSocketTransport::connect(self.url.as_str());
        let lh = self.build(transport);
        lh.ready().await?;
        Ok(lh)
    }
}

/// Connect to the Lighthouse at `url` with the default configuration.
///
/// # Errors
///
/// Returns [`LighthouseError::Transport`](crate::LighthouseError::Transport)
/// if the server cannot be reached.
pub async fn connect(url: impl Into<String>, auth: Auth) -> Result<Lighthouse<WebSocketTransport>> {
    LighthouseBuilder::new(auth).url(url).connect().await
}
