//! Simple In-Memory Cache
//!
//! Time-based caching for node query results. The clock is injected and the
//! entry count is bounded; when full, the oldest entry is evicted.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::clock::Clock;

/// Time-based cache with bounded capacity
pub struct Cache<T> {
    data: HashMap<String, (T, Instant)>,
    ttl: Duration,
    capacity: usize,
    clock: Arc<dyn Clock>,
}

impl<T: Clone> Cache<T> {
    pub fn with_clock(ttl: Duration, capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            data: HashMap::new(),
            ttl,
            capacity: capacity.max(1),
            clock,
        }
    }

    pub fn get(&self, key: &str) -> Option<T> {
        let now = self.clock.now();
        self.data.get(key).and_then(|(value, inserted)| {
            if now.saturating_duration_since(*inserted) < self.ttl {
                Some(value.clone())
            } else {
                None
            }
        })
    }

    pub fn set(&mut self, key: String, value: T) {
        if !self.data.contains_key(&key) && self.data.len() >= self.capacity {
            self.cleanup();
            if self.data.len() >= self.capacity {
                self.evict_oldest();
            }
        }
        let now = self.clock.now();
        self.data.insert(key, (value, now));
    }

    /// Remove expired entries
    fn cleanup(&mut self) {
        let now = self.clock.now();
        let ttl = self.ttl;
        self.data
            .retain(|_, (_, inserted)| now.saturating_duration_since(*inserted) < ttl);
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .data
            .iter()
            .min_by_key(|(_, (_, inserted))| *inserted)
            .map(|(k, _)| k.clone());
        if let Some(key) = oldest {
            self.data.remove(&key);
        }
    }
}
