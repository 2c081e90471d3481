//! Scheduling heap.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::RwLock;

use tokio::time::Instant;

/// Per-product probe scheduling record. Lives only in memory; the store
/// is the source of truth for products, so a restart simply reloads the
/// heap and loses in-flight retry counts.
#[derive(Debug, Clone)]
pub struct PingItem {
    pub product_id: i64,
    pub health_api: String,
    pub next_ping_at: Instant,
    pub retry_count: u32,
    pub is_down: bool,
}

impl PingItem {
    pub fn new(product_id: i64, health_api: impl Into<String>, next_ping_at: Instant) -> Self {
        Self {
            product_id,
            health_api: health_api.into(),
            next_ping_at,
            retry_count: 0,
            is_down: false,
        }
    }
}

/// Heap entry; min by `(next_ping_at, seq)` so items sharing a deadline
/// come out in insertion order.
struct Entry {
    item: PingItem,
    seq: u64,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.item.next_ping_at == other.item.next_ping_at && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse to pop the earliest deadline.
        other
            .item
            .next_ping_at
            .cmp(&self.item.next_ping_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct Inner {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
}

/// Min-heap of [`PingItem`] keyed by `next_ping_at`, guarded by a
/// reader-writer lock. All mutation goes through these methods; no
/// reference to the internals escapes.
pub struct PingHeap {
    inner: RwLock<Inner>,
}

impl PingHeap {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                heap: BinaryHeap::new(),
                next_seq: 0,
            }),
        }
    }

    pub fn push(&self, item: PingItem) {
        let mut inner = self.inner.write().expect("heap lock");
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.heap.push(Entry { item, seq });
    }

    /// Deadline of the earliest item, if any.
    pub fn peek_deadline(&self) -> Option<Instant> {
        let inner = self.inner.read().expect("heap lock");
        inner.heap.peek().map(|entry| entry.item.next_ping_at)
    }

    pub fn pop(&self) -> Option<PingItem> {
        let mut inner = self.inner.write().expect("heap lock");
        inner.heap.pop().map(|entry| entry.item)
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("heap lock").heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Linear membership scan under the read lock; used by rediscovery to
    /// keep one item per product.
    pub fn contains(&self, product_id: i64) -> bool {
        let inner = self.inner.read().expect("heap lock");
        inner
            .heap
            .iter()
            .any(|entry| entry.item.product_id == product_id)
    }
}

impl Default for PingHeap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn pop_returns_items_in_deadline_order() {
        let heap = PingHeap::new();
        let now = Instant::now();

        heap.push(PingItem::new(3, "http://c", now + Duration::from_secs(30)));
        heap.push(PingItem::new(1, "http://a", now + Duration::from_secs(10)));
        heap.push(PingItem::new(2, "http://b", now + Duration::from_secs(20)));

        assert_eq!(heap.peek_deadline(), Some(now + Duration::from_secs(10)));
        assert_eq!(heap.pop().map(|i| i.product_id), Some(1));
        assert_eq!(heap.pop().map(|i| i.product_id), Some(2));
        assert_eq!(heap.pop().map(|i| i.product_id), Some(3));
        assert_eq!(heap.pop().map(|i| i.product_id), None);
    }

    #[tokio::test(start_paused = true)]
    async fn equal_deadlines_pop_in_insertion_order() {
        let heap = PingHeap::new();
        let deadline = Instant::now() + Duration::from_secs(5);

        for product_id in [10, 20, 30, 40] {
            heap.push(PingItem::new(product_id, "http://x", deadline));
        }

        let order: Vec<i64> = std::iter::from_fn(|| heap.pop().map(|i| i.product_id)).collect();
        assert_eq!(order, vec![10, 20, 30, 40]);
    }

    #[tokio::test(start_paused = true)]
    async fn contains_finds_only_scheduled_products() {
        let heap = PingHeap::new();
        heap.push(PingItem::new(7, "http://a", Instant::now()));

        assert!(heap.contains(7));
        assert!(!heap.contains(8));
        assert_eq!(heap.len(), 1);
    }
}
