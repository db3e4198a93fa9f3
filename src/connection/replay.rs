//! Bounded buffer for replies that arrive before anyone listens for them.

use std::collections::{HashMap, VecDeque};

use tracing::warn;

use crate::{
    config::ReplayConfig,
    protocol::{Reply, RequestId},
};

/// Per-id FIFO queues of unclaimed replies.
#[derive(Debug, Default)]
pub(crate) struct ReplayBuffer {
    config: ReplayConfig,
    queues: HashMap<RequestId, VecDeque<Reply>>,
    /// Buffered ids, first buffered first.
    order: VecDeque<RequestId>,
}

impl ReplayBuffer {
    pub(crate) fn new(config: ReplayConfig) -> Self {
        Self {
            config,
            queues: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Append `reply` to the queue of `id`, evicting old entries when full.
    pub(crate) fn push(&mut self, id: RequestId, reply: Reply) {
        if self.config.is_disabled() {
            warn!(request_id = %id, status = reply.status, "replay buffer disabled; dropping reply");
            return;
        }
        if !self.queues.contains_key(&id) && self.queues.len() >= self.config.max_ids {
            if let Some(evicted) = self.order.pop_front() {
                let dropped = self.queues.remove(&evicted).map_or(0, |q| q.len());
                warn!(request_id = %evicted, dropped, "replay buffer full; evicting oldest id");
            }
        }
        let queue = self.queues.entry(id).or_insert_with(|| {
            self.order.push_back(id);
            VecDeque::new()
        });
        if queue.len() >= self.config.max_per_id {
            queue.pop_front();
            warn!(request_id = %id, "replay queue full; evicting oldest reply");
        }
        queue.push_back(reply);
    }

    /// Take the oldest buffered reply for `id`.
    pub(crate) fn pop(&mut self, id: RequestId) -> Option<Reply> {
        let queue = self.queues.get_mut(&id)?;
        let reply = queue.pop_front();
        if queue.is_empty() {
            self.forget(id);
        }
        reply
    }

    /// Take every buffered reply for `id`, oldest first.
    pub(crate) fn drain(&mut self, id: RequestId) -> VecDeque<Reply> {
        match self.queues.remove(&id) {
            Some(queue) => {
                self.order.retain(|buffered| *buffered != id);
                queue
            }
            None => VecDeque::new(),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.queues.clear();
        self.order.clear();
    }

    /// Number of buffered replies across all ids.
    pub(crate) fn len(&self) -> usize { self.queues.values().map(VecDeque::len).sum() }

    fn forget(&mut self, id: RequestId) {
        self.queues.remove(&id);
        self.order.retain(|buffered| *buffered != id);
    }
}
