//! Fixed-size pool for fork-join branches.
//!
//! At most `size` branches run at once; the rest wait for a permit. Each submission returns a
//! [BranchHandle] the caller awaits with a timeout. [BranchPool::shutdown] stops queued
//! branches from starting and aborts running ones.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, oneshot};
use tokio::task::{AbortHandle, JoinSet};
use tracing::trace;

pub struct BranchPool {
  permits: Arc<Semaphore>,
  tasks: JoinSet<()>,
  size: usize,
}

/// Result of waiting on one branch.
#[derive(Debug)]
pub enum BranchWait<T> {
  Done(T),
  /// The branch did not finish in time and was aborted.
  TimedOut,
  /// The branch ended without producing a value (aborted or panicked).
  Dropped,
}

pub struct BranchHandle<T> {
  rx: oneshot::Receiver<T>,
  abort: AbortHandle,
}

impl BranchPool {
  /// A pool running at most `size` branches at once (at least one).
  pub fn new(size: usize) -> Self {
    let size = size.max(1);
    Self {
      permits: Arc::new(Semaphore::new(size)),
      tasks: JoinSet::new(),
      size,
    }
  }

  pub fn size(&self) -> usize {
    self.size
  }

  /// Queues `branch`. It starts once a permit is free. Must be called within a Tokio runtime.
  pub fn submit<F, T>(&mut self, branch: F) -> BranchHandle<T>
  where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
  {
    let (tx, rx) = oneshot::channel();
    let permits = self.permits.clone();
    let abort = self.tasks.spawn(async move {
      // Closed on shutdown: queued branches never start.
      let Ok(_permit) = permits.acquire_owned().await else {
        return;
      };
      let _ = tx.send(branch.await);
    });
    BranchHandle { rx, abort }
  }

  /// Prevents queued branches from starting, aborts running ones and waits for them to stop.
  pub async fn shutdown(&mut self) {
    self.permits.close();
    self.tasks.shutdown().await;
    trace!(size = self.size, "branch pool shut down");
  }
}

impl<T> BranchHandle<T> {
  /// Waits up to `timeout` for the branch. A branch that times out is aborted.
  pub async fn wait(&mut self, timeout: Duration) -> BranchWait<T> {
    match tokio::time::timeout(timeout, &mut self.rx).await {
      Ok(Ok(value)) => BranchWait::Done(value),
      Ok(Err(_)) => BranchWait::Dropped,
      Err(_) => {
        self.abort.abort();
        BranchWait::TimedOut
      }
    }
  }

  pub fn abort(&self) {
    self.abort.abort();
  }
}
