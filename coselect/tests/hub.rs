mod common;

use coselect::task::{self, JoinError};
use coselect::time::sleep;
use coselect::{HubBuilder, active_watchers, yield_now};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

#[coselect::test]
async fn test_spawn_returns_output() {
    let handle = task::spawn(async { 40 + 2 });

    assert_eq!(handle.await, Ok(42));
}

#[coselect::test]
async fn test_yield_now_lets_other_tasks_run() {
    let order = Arc::new(AtomicUsize::new(0));

    let seen = order.clone();
    let handle = task::spawn(async move {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(order.load(Ordering::SeqCst), 0);
    yield_now().await;
    assert_eq!(order.load(Ordering::SeqCst), 1);

    handle.await.unwrap();
}

#[coselect::test]
async fn test_abort_before_first_poll() {
    let ran = Arc::new(AtomicBool::new(false));

    let flag = ran.clone();
    let handle = task::spawn(async move {
        flag.store(true, Ordering::SeqCst);
    });
    handle.abort();

    assert_eq!(handle.await, Err(JoinError::Cancelled));
    assert!(!ran.load(Ordering::SeqCst));
}

#[coselect::test]
async fn test_abort_after_completion_keeps_output() {
    let handle = task::spawn(async { "done" });

    sleep(Duration::from_millis(5)).await;
    assert!(handle.is_finished());

    handle.abort();
    assert_eq!(handle.await, Ok("done"));
}

#[coselect::test(events_capacity = 4)]
async fn test_small_event_buffer() {
    let pairs: Vec<_> = (0..16).map(|_| common::pair()).collect();
    let writers: Vec<_> = pairs.iter().map(|(a, _)| a).collect();

    // More ready descriptors than the poller buffer holds.
    let ready = coselect::select(&[], &writers, &[], None).await.unwrap();

    assert_eq!(ready.writable.len(), 16);
    assert_eq!(active_watchers(), 0);
}

struct SetOnDrop(Arc<AtomicBool>);

impl Drop for SetOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[test]
fn test_dropping_hub_cancels_pending_tasks() {
    let dropped = Arc::new(AtomicBool::new(false));

    let hub = HubBuilder::new().name("cancel-on-drop").build().unwrap();

    let guard = SetOnDrop(dropped.clone());
    let handle = hub.spawn(async move {
        let _guard = guard;
        std::future::pending::<()>().await;
    });

    hub.block_on(async {
        sleep(Duration::from_millis(5)).await;
    });
    assert!(!dropped.load(Ordering::SeqCst));
    assert!(!handle.is_finished());

    drop(hub);

    assert!(dropped.load(Ordering::SeqCst));
    assert!(handle.is_finished());
}

#[test]
fn test_dropping_hub_releases_watchers() {
    let hub = HubBuilder::new().build().unwrap();
    let (reader, _writer) = common::pair();

    hub.spawn(async move {
        let _ = coselect::select(&[&reader], &[], &[], None).await;
    });

    hub.block_on(async {
        sleep(Duration::from_millis(5)).await;
    });
    assert_eq!(hub.active_watchers(), 1);

    drop(hub);
}

#[test]
#[should_panic(expected = "cannot block_on a hub from within a hub")]
fn test_nested_block_on_panics() {
    let hub = HubBuilder::new().build().unwrap();

    hub.block_on(async {
        let inner = HubBuilder::new().build().unwrap();
        inner.block_on(async {});
    });
}

#[test]
#[should_panic(expected = "must be called within the context of a hub")]
fn test_spawn_outside_hub_panics() {
    let _ = task::spawn(async {});
}

#[test]
fn test_hubs_can_be_reused_sequentially() {
    let hub = HubBuilder::new().build().unwrap();

    assert_eq!(hub.block_on(async { 1 }), 1);
    assert_eq!(hub.block_on(async { 2 }), 2);
}
