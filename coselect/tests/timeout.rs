use coselect::task;
use coselect::time::{Elapsed, sleep, sleep_until, timeout};
use std::future::pending;
use std::time::{Duration, Instant};

#[coselect::test]
async fn test_timeout_completes_before_deadline() {
    let handle = task::spawn(async {
        sleep(Duration::from_millis(10)).await;
        123
    });

    let result = timeout(Duration::from_millis(500), handle).await;

    assert!(
        matches!(result, Ok(Ok(v)) if v == 123),
        "Timeout should return Ok(123)"
    );
}

#[coselect::test]
async fn test_timeout_expires() {
    let handle = task::spawn(async {
        sleep(Duration::from_millis(100)).await;
        456
    });
    let result = timeout(Duration::from_millis(20), handle).await;

    assert_eq!(
        result.err(),
        Some(Elapsed),
        "Timeout should return an error when deadline is exceeded"
    );
}

#[coselect::test]
async fn test_ready_future_wins_zero_timeout() {
    let result = timeout(Duration::ZERO, async { 7 }).await;

    assert_eq!(result, Ok(7));
}

#[coselect::test]
async fn test_sleep_waits_at_least_duration() {
    let start = Instant::now();
    sleep(Duration::from_millis(30)).await;

    assert!(start.elapsed() >= Duration::from_millis(30));
}

#[coselect::test]
async fn test_timeout_on_pending_future() {
    let start = Instant::now();
    let result = timeout(Duration::from_millis(40), pending::<()>()).await;

    assert!(result.is_err());
    assert!(start.elapsed() >= Duration::from_millis(40));
}

#[test]
fn test_elapsed_message() {
    assert_eq!(Elapsed.to_string(), "deadline has elapsed");
}

#[coselect::test]
async fn test_sleep_until_waits_for_deadline() {
    let deadline = Instant::now() + Duration::from_millis(30);

    sleep_until(deadline).await;
    assert!(Instant::now() >= deadline);

    // Already elapsed: completes without waiting.
    let start = Instant::now();
    sleep_until(deadline).await;
    assert!(start.elapsed() < Duration::from_millis(30));
}
