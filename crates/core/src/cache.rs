use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::trac::TicketSummary;

/// Bounded write-through cache for ticket summaries.
///
/// Fetchers write into it after a successful lookup and never read it back as
/// a correctness dependency: a hit and a miss produce identical fetcher
/// output. The oldest entry is evicted once the cache is full. Shared across
/// concurrent tool calls behind its own lock; there is no other shared
/// mutable state in the system.
#[derive(Debug)]
pub struct TicketCache {
    capacity: usize,
    inner: Mutex<CacheState>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<u64, TicketSummary>,
    order: VecDeque<u64>,
}

impl TicketCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(CacheState::default()),
        }
    }

    /// Fire-and-forget insert; a poisoned lock drops the write.
    pub fn insert(&self, ticket: TicketSummary) {
        if self.capacity == 0 {
            return;
        }
        let Ok(mut state) = self.inner.lock() else {
            return;
        };

        if !state.entries.contains_key(&ticket.id) {
            while state.entries.len() >= self.capacity {
                match state.order.pop_front() {
                    Some(oldest) => {
                        state.entries.remove(&oldest);
                    }
                    None => break,
                }
            }
            state.order.push_back(ticket.id);
        }

        state.entries.insert(ticket.id, ticket);
    }

    pub fn get(&self, id: u64) -> Option<TicketSummary> {
        let state = self.inner.lock().ok()?;
        state.entries.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .map(|state| state.entries.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket(id: u64) -> TicketSummary {
        TicketSummary {
            id,
            title: format!("ticket {id}"),
            status: "new".to_string(),
            owner: "unassigned".to_string(),
            ticket_type: "defect".to_string(),
            priority: "normal".to_string(),
            milestone: "none".to_string(),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let cache = TicketCache::new(4);
        cache.insert(ticket(1));
        assert_eq!(cache.get(1).unwrap().title, "ticket 1");
        assert!(cache.get(2).is_none());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let cache = TicketCache::new(2);
        cache.insert(ticket(1));
        cache.insert(ticket(2));
        cache.insert(ticket(3));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(1).is_none());
        assert!(cache.get(2).is_some());
        assert!(cache.get(3).is_some());
    }

    #[test]
    fn test_reinsert_same_id_does_not_grow() {
        let cache = TicketCache::new(2);
        cache.insert(ticket(1));
        cache.insert(ticket(1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_zero_capacity_never_stores() {
        let cache = TicketCache::new(0);
        cache.insert(ticket(1));
        assert!(cache.is_empty());
    }
}
