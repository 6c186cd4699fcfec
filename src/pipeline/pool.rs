//! Fixed-size thread pool fed by a rendezvous channel.

use crossbeam_channel::{Receiver, Sender, bounded};
use log::{debug, warn};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use thiserror::Error;

type Task = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("{pool} pool size must be greater than zero")]
    ZeroSize { pool: &'static str },
    #[error("spawn {pool} pool worker: {source}")]
    Spawn {
        pool: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{pool} pool is shut down")]
    Closed { pool: &'static str },
}

/// `size` named worker threads pulling tasks from a zero-capacity queue, so [`submit`](Self::submit)
/// blocks until a worker is free. That blocking is the pipeline's backpressure.
pub struct WorkerPool {
    name: &'static str,
    size: usize,
    task_tx: Mutex<Option<Sender<Task>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

/// Single worker: run tasks until every sender is gone.
fn worker_loop(task_rx: Receiver<Task>) {
    while let Ok(task) = task_rx.recv() {
        task();
    }
}

impl WorkerPool {
    pub fn new(name: &'static str, size: usize) -> Result<Self, PoolError> {
        if size == 0 {
            return Err(PoolError::ZeroSize { pool: name });
        }
        let (task_tx, task_rx) = bounded::<Task>(0);
        let mut handles = Vec::with_capacity(size);
        for i in 0..size {
            let task_rx = task_rx.clone();
            let spawned = thread::Builder::new()
                .name(format!("{name}-{i}"))
                .spawn(move || worker_loop(task_rx));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    // Close the queue so the workers already spawned exit.
                    drop(task_tx);
                    for h in handles {
                        let _ = h.join();
                    }
                    return Err(PoolError::Spawn { pool: name, source });
                }
            }
        }
        debug!("{} pool started with {} workers", name, size);
        Ok(Self {
            name,
            size,
            task_tx: Mutex::new(Some(task_tx)),
            handles: Mutex::new(handles),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Hand `task` to a worker, blocking while all of them are busy.
    pub fn submit<F>(&self, task: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        // Clone the sender so the lock is not held while blocked on send.
        let task_tx = self
            .task_tx
            .lock()
            .unwrap()
            .clone()
            .ok_or(PoolError::Closed { pool: self.name })?;
        task_tx
            .send(Box::new(task))
            .map_err(|_| PoolError::Closed { pool: self.name })
    }

    /// Stop accepting tasks and wait for submitted ones to finish. Idempotent.
    /// Must not be called from one of this pool's own workers.
    pub fn shutdown(&self) {
        drop(self.task_tx.lock().unwrap().take());
        let handles = std::mem::take(&mut *self.handles.lock().unwrap());
        if handles.is_empty() {
            return;
        }
        for h in handles {
            if h.join().is_err() {
                warn!("{} pool worker panicked", self.name);
            }
        }
        debug!("{} pool drained", self.name);
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
