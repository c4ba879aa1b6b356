//! Fixed-capacity single-producer/single-consumer byte ring.
//!
//! The background reader is the only writer and the control thread the only
//! reader. Index updates happen under one mutex; two condition variables wake
//! the consumer when bytes arrive and the producer when space frees up.

use crate::error::try_alloc;
use crate::Result;
use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

pub struct RingBuffer {
    inner: Mutex<Inner>,
    readable: Condvar,
    writable: Condvar,
    capacity: usize,
}

struct Inner {
    buf: Box<[u8]>,
    /// Write index.
    head: usize,
    /// Read index.
    tail: usize,
    fill: usize,
    /// Producer is done; no more bytes will arrive.
    finished: bool,
}

impl RingBuffer {
    /// Allocate a ring of `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let buf = try_alloc(capacity, "ring buffer")?;
        Ok(Self {
            inner: Mutex::new(Inner {
                buf,
                head: 0,
                tail: 0,
                fill: 0,
                finished: false,
            }),
            readable: Condvar::new(),
            writable: Condvar::new(),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently buffered.
    pub fn fill(&self) -> usize {
        self.inner.lock().fill
    }

    /// Bytes that can be written without overwriting unread data.
    pub fn free(&self) -> usize {
        self.capacity - self.inner.lock().fill
    }

    pub fn is_finished(&self) -> bool {
        self.inner.lock().finished
    }

    /// Copy as much of `data` as fits. Returns the number of bytes written.
    pub fn write(&self, data: &[u8]) -> usize {
        let mut inner = self.inner.lock();
        let len = data.len().min(self.capacity - inner.fill);
        if len == 0 {
            return 0;
        }

        let head = inner.head;
        let first = len.min(self.capacity - head);
        inner.buf[head..head + first].copy_from_slice(&data[..first]);
        if first < len {
            inner.buf[..len - first].copy_from_slice(&data[first..len]);
        }

        inner.head = (head + len) % self.capacity;
        inner.fill += len;
        drop(inner);
        self.readable.notify_one();
        len
    }

    /// Wait up to `timeout` until at least `needed` bytes are free.
    pub fn wait_for_space(&self, needed: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        while self.capacity - inner.fill < needed {
            if self.writable.wait_until(&mut inner, deadline).timed_out() {
                return self.capacity - inner.fill >= needed;
            }
        }
        true
    }

    /// Mark the producer as done and wake a blocked consumer.
    pub fn finish(&self) {
        self.inner.lock().finished = true;
        self.readable.notify_all();
    }

    /// Fill `out` completely, blocking while the ring is empty and the
    /// producer is still running.
    ///
    /// Returns fewer bytes than requested only once the producer has finished
    /// and the ring has drained.
    pub fn read(&self, out: &mut [u8]) -> usize {
        let mut copied = 0;
        let mut inner = self.inner.lock();
        while copied < out.len() {
            if inner.fill == 0 {
                if inner.finished {
                    break;
                }
                self.readable.wait(&mut inner);
                continue;
            }

            let len = (out.len() - copied).min(inner.fill);
            let tail = inner.tail;
            let first = len.min(self.capacity - tail);
            out[copied..copied + first].copy_from_slice(&inner.buf[tail..tail + first]);
            if first < len {
                out[copied + first..copied + len].copy_from_slice(&inner.buf[..len - first]);
            }

            inner.tail = (tail + len) % self.capacity;
            inner.fill -= len;
            copied += len;
            self.writable.notify_one();
        }
        copied
    }

    /// Block until `threshold` bytes are buffered or the producer finishes,
    /// re-checking every `poll`. Returns the fill level reached.
    pub fn wait_for_fill(&self, threshold: usize, poll: Duration) -> usize {
        let threshold = threshold.min(self.capacity);
        let mut inner = self.inner.lock();
        while inner.fill < threshold && !inner.finished {
            self.readable.wait_for(&mut inner, poll);
        }
        inner.fill
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity)
            .field("fill", &inner.fill)
            .field("head", &inner.head)
            .field("tail", &inner.tail)
            .field("finished", &inner.finished)
            .finish()
    }
}
