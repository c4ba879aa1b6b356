//! Background reader filling the ring buffer from storage.

use crate::config::ThreadHints;
use crate::error::try_alloc;
use crate::ring_buffer::RingBuffer;
use crate::Result;
use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Handle to a running reader thread.
///
/// The thread reads `chunk_size` bytes at a time and copies them into the
/// ring, waiting whenever less than a whole chunk is free. It finishes the ring
/// on end of input, on a read error, or when stopped.
pub struct BackgroundReader {
    running: Arc<AtomicBool>,
    done: Receiver<()>,
    handle: Option<JoinHandle<()>>,
}

impl BackgroundReader {
    /// Start reading `source` into `ring`.
    pub fn spawn<R>(
        source: R,
        ring: Arc<RingBuffer>,
        chunk_size: usize,
        backoff: Duration,
        hints: &ThreadHints,
    ) -> Result<Self>
    where
        R: Read + Send + 'static,
    {
        let chunk = try_alloc(chunk_size, "reader chunk")?;
        let running = Arc::new(AtomicBool::new(true));
        let (done_tx, done) = mpsc::channel();

        let handle = {
            let running = running.clone();
            hints.spawn(move || {
                fill_loop(source, &ring, chunk, backoff, &running);
                running.store(false, Ordering::SeqCst);
                ring.finish();
                let _ = done_tx.send(());
            })?
        };

        Ok(Self {
            running,
            done,
            handle: Some(handle),
        })
    }

    /// True while the thread is still producing.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask the thread to stop and wait up to `timeout` for it to exit.
    ///
    /// Returns false if the thread did not acknowledge in time; it is then
    /// detached and exits on its own after its current read.
    pub fn stop(mut self, timeout: Duration) -> bool {
        self.running.store(false, Ordering::SeqCst);
        match self.done.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(handle) = self.handle.take() {
                    if handle.join().is_err() {
                        tracing::error!("background reader panicked");
                    }
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                self.handle.take();
                false
            }
        }
    }
}

impl Drop for BackgroundReader {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

fn fill_loop<R: Read>(
    mut source: R,
    ring: &RingBuffer,
    mut chunk: Box<[u8]>,
    backoff: Duration,
    running: &AtomicBool,
) {
    let chunk_size = chunk.len();
    let mut total = 0u64;

    while running.load(Ordering::SeqCst) {
        if !ring.wait_for_space(chunk_size, backoff) {
            continue;
        }

        let len = match source.read(&mut chunk) {
            Ok(0) => {
                tracing::debug!(bytes = total, "reader reached end of file");
                break;
            }
            Ok(len) => len,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::error!(error = %e, bytes = total, "reader failed");
                break;
            }
        };

        ring.write(&chunk[..len]);
        total += len as u64;
        tracing::trace!(len, fill = ring.fill(), "reader chunk buffered");
    }
}
