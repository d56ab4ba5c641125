use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Fixed-capacity, drop-oldest FIFO shared between a producer and a consumer thread.
///
/// Backed by a bounded `crossbeam_channel`, with both ends held here so the
/// producer can evict from the head. Inserts never block: while the queue
/// holds `eviction_threshold` or more items the oldest are dropped first, so
/// fresh audio always gets in. Polls never block either.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
    capacity: usize,
    eviction_threshold: usize,
}

impl<T> BoundedQueue<T> {
    /// Create a queue. `eviction_threshold` is clamped into `1..=capacity`.
    pub fn new(capacity: usize, eviction_threshold: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
            eviction_threshold: eviction_threshold.clamp(1, capacity),
        }
    }

    /// Insert an item, evicting the oldest entries as needed.
    ///
    /// Returns how many items were evicted.
    pub fn push(&self, item: T) -> usize {
        let mut evicted = 0;
        while self.receiver.len() >= self.eviction_threshold {
            if self.receiver.try_recv().is_err() {
                break;
            }
            evicted += 1;
        }

        let mut item = item;
        loop {
            match self.sender.try_send(item) {
                Ok(()) => return evicted,
                // Other producers filled the headroom between the check and the send.
                Err(TrySendError::Full(rejected)) => {
                    if self.receiver.try_recv().is_ok() {
                        evicted += 1;
                    }
                    item = rejected;
                }
                // Both ends live in `self`, so the channel cannot disconnect.
                Err(TrySendError::Disconnected(_)) => return evicted,
            }
        }
    }

    /// Take the oldest item, or `None` if the queue is empty.
    pub fn poll(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// Number of items currently queued.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Drop every queued item. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        self.receiver.try_iter().count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn eviction_threshold(&self) -> usize {
        self.eviction_threshold
    }
}
