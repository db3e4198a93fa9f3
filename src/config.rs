//! Connection configuration types.
//!
//! These values tune how a [`Lighthouse`](crate::Lighthouse) connection
//! holds on to replies nobody has asked for yet.

/// Bounds of the replay buffer.
///
/// Replies for request ids that have no registered consumer are kept until a
/// consumer registers for the id. Once `max_ids` distinct ids are buffered,
/// the id buffered first is evicted; once an id holds `max_per_id` replies,
/// its oldest reply is evicted. Both evictions are logged at warn level.
///
/// # Examples
///
/// ```
/// use nighthouse::ReplayConfig;
///
/// let config = ReplayConfig::default().with_max_ids(16);
/// assert_eq!(config.max_ids, 16);
/// assert_eq!(config.max_per_id, ReplayConfig::DEFAULT_MAX_PER_ID);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplayConfig {
    /// Maximum number of distinct request ids held at once.
    pub max_ids: usize,
    /// Maximum number of replies held per request id.
    pub max_per_id: usize,
}

impl ReplayConfig {
    /// Default for [`max_ids`](Self::max_ids).
    pub const DEFAULT_MAX_IDS: usize = 256;
    /// Default for [`max_per_id`](Self::max_per_id).
    pub const DEFAULT_MAX_PER_ID: usize = 64;

    /// Set the maximum number of buffered ids.
    #[must_use]
    pub fn with_max_ids(mut self, max_ids: usize) -> Self {
        self.max_ids = max_ids;
        self
    }

    /// Set the maximum number of replies buffered per id.
    #[must_use]
    pub fn with_max_per_id(mut self, max_per_id: usize) -> Self {
        self.max_per_id = max_per_id;
        self
    }

    /// Returns `true` if the configuration cannot hold any reply.
    #[must_use]
    pub fn is_disabled(&self) -> bool { self.max_ids == 0 || self.max_per_id == 0 }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            max_ids: Self::DEFAULT_MAX_IDS,
            max_per_id: Self::DEFAULT_MAX_PER_ID,
        }
    }
}
