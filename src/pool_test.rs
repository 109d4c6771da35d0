//! Tests for `pool`.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::pool::{BranchPool, BranchWait};

#[tokio::test]
async fn results_come_back_per_handle() {
  let mut pool = BranchPool::new(2);
  let mut handles: Vec<_> = (0..4u64)
    .map(|i| {
      pool.submit(async move {
        tokio::time::sleep(Duration::from_millis(20 - i * 5)).await;
        i * 10
      })
    })
    .collect();
  let mut values = Vec::new();
  for handle in &mut handles {
    match handle.wait(Duration::from_secs(5)).await {
      BranchWait::Done(v) => values.push(v),
      other => panic!("unexpected wait result: {other:?}"),
    }
  }
  pool.shutdown().await;
  assert_eq!(values, vec![0, 10, 20, 30]);
}

#[tokio::test]
async fn never_runs_more_than_size_at_once() {
  let mut pool = BranchPool::new(2);
  let running = Arc::new(AtomicUsize::new(0));
  let peak = Arc::new(AtomicUsize::new(0));
  let mut handles = Vec::new();
  for _ in 0..6 {
    let running = running.clone();
    let peak = peak.clone();
    handles.push(pool.submit(async move {
      let now = running.fetch_add(1, Ordering::SeqCst) + 1;
      peak.fetch_max(now, Ordering::SeqCst);
      tokio::time::sleep(Duration::from_millis(10)).await;
      running.fetch_sub(1, Ordering::SeqCst);
    }));
  }
  for handle in &mut handles {
    assert!(matches!(handle.wait(Duration::from_secs(5)).await, BranchWait::Done(())));
  }
  pool.shutdown().await;
  assert!(peak.load(Ordering::SeqCst) <= 2);
  assert!(peak.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn slow_branch_times_out() {
  let mut pool = BranchPool::new(1);
  let mut handle = pool.submit(async {
    tokio::time::sleep(Duration::from_secs(30)).await;
  });
  assert!(matches!(
    handle.wait(Duration::from_millis(20)).await,
    BranchWait::TimedOut
  ));
  pool.shutdown().await;
}

#[tokio::test]
async fn shutdown_drops_queued_branches() {
  let mut pool = BranchPool::new(1);
  let started = Arc::new(AtomicUsize::new(0));
  let blocker = {
    let started = started.clone();
    pool.submit(async move {
      started.fetch_add(1, Ordering::SeqCst);
      tokio::time::sleep(Duration::from_secs(30)).await;
    })
  };
  let mut queued = {
    let started = started.clone();
    pool.submit(async move {
      started.fetch_add(1, Ordering::SeqCst);
    })
  };
  drop(blocker);
  pool.shutdown().await;
  assert!(matches!(
    queued.wait(Duration::from_millis(100)).await,
    BranchWait::Dropped
  ));
  assert!(started.load(Ordering::SeqCst) <= 1);
}

#[test]
fn size_is_at_least_one() {
  assert_eq!(BranchPool::new(0).size(), 1);
  assert_eq!(BranchPool::new(4).size(), 4);
}
