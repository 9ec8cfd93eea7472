//! Bounded, closable dispatch queue.
//!
//! A thin wrapper over a bounded MPMC channel. Capacity is deliberately
//! small (the storage pools use 1): the queue exists for backpressure, not
//! buffering, so a producer enumerating the database can never race far
//! ahead of the workers draining it.

/// Fixed-capacity queue shared between one producer and several workers.
///
/// Cloning is cheap; all clones refer to the same channel.
pub struct BoundedQueue<T> {
    tx: async_channel::Sender<T>,
    rx: async_channel::Receiver<T>,
}

impl<T> Clone for BoundedQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
        }
    }
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` items.
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = async_channel::bounded(capacity);
        Self { tx, rx }
    }

    /// Push an item, waiting for capacity. Returns `false` if the queue
    /// has been closed.
    pub async fn push(&self, item: T) -> bool {
        self.tx.send(item).await.is_ok()
    }

    /// Pop an item, waiting for one to arrive. Returns `None` once the
    /// queue is closed and drained.
    pub async fn pop(&self) -> Option<T> {
        self.rx.recv().await.ok()
    }

    /// Close the queue, unblocking all pending and future `push`/`pop`
    /// calls. Idempotent. Items already queued can still be popped.
    pub fn close(&self) {
        self.tx.close();
    }
}
