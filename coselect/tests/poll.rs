mod common;

use coselect::task::{self, JoinError};
use coselect::time::sleep;
use coselect::{
    Error, POLLERR, POLLIN, POLLNVAL, POLLOUT, POLLPRI, Poll, PollFlags, active_watchers,
};
use std::io::{Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::time::{Duration, Instant};

#[coselect::test]
async fn test_poll_reports_readable_descriptor() {
    common::init_logger();

    let (reader, mut writer) = common::pair();
    let fd = reader.as_raw_fd();

    let mut poll = Poll::new();
    poll.register(&reader, Some(POLLIN)).unwrap();

    task::spawn(async move {
        sleep(Duration::from_millis(50)).await;
        writer.write_all(b"ping").unwrap();
        writer
    });

    let start = Instant::now();
    let events = poll.poll(Some(1000.0)).await.unwrap();

    assert_eq!(events, vec![(fd, POLLIN)]);
    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(active_watchers(), 0);

    let mut buf = [0u8; 4];
    (&reader).read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"ping");
}

#[coselect::test]
async fn test_poll_timeout_is_in_milliseconds() {
    let (reader, _writer) = common::pair();

    let mut poll = Poll::new();
    poll.register(&reader, Some(POLLIN)).unwrap();

    let start = Instant::now();
    let events = poll.poll(Some(200.0)).await.unwrap();
    let elapsed = start.elapsed();

    assert!(events.is_empty());
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_secs(5));
    assert_eq!(active_watchers(), 0);
}

#[coselect::test]
async fn test_poll_reports_closed_descriptor_as_nval() {
    common::init_logger();

    let fd: RawFd = common::closed_fd(600);

    let mut poll = Poll::new();
    poll.register(&fd, Some(POLLIN)).unwrap();

    let start = Instant::now();
    let events = poll.poll(Some(1000.0)).await.unwrap();

    assert_eq!(events, vec![(fd, POLLNVAL)]);
    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(active_watchers(), 0);
}

#[coselect::test]
async fn test_poll_none_blocks_until_event() {
    let (reader, mut writer) = common::pair();
    let fd = reader.as_raw_fd();

    let mut poll = Poll::new();
    poll.register(&reader, Some(POLLIN)).unwrap();

    task::spawn(async move {
        sleep(Duration::from_millis(30)).await;
        writer.write_all(b"x").unwrap();
        writer
    });

    let events = poll.poll(None).await.unwrap();

    assert_eq!(events, vec![(fd, POLLIN)]);
}

#[coselect::test]
async fn test_poll_negative_timeout_blocks_until_event() {
    let (reader, mut writer) = common::pair();
    let fd = reader.as_raw_fd();

    let mut poll = Poll::new();
    poll.register(&reader, Some(POLLIN)).unwrap();

    task::spawn(async move {
        sleep(Duration::from_millis(30)).await;
        writer.write_all(b"x").unwrap();
        writer
    });

    let start = Instant::now();
    let events = poll.poll(Some(-1.0)).await.unwrap();

    assert_eq!(events, vec![(fd, POLLIN)]);
    assert!(start.elapsed() >= Duration::from_millis(30));
}

#[coselect::test]
async fn test_poll_nan_timeout_is_rejected() {
    let poll = Poll::new();

    let err = poll.poll(Some(f64::NAN)).await.unwrap_err();

    assert!(matches!(err, Error::InvalidTimeout(_)));
}

#[test]
fn test_unregister_absent_descriptor_fails() {
    let (a, _b) = common::pair();
    let mut poll = Poll::new();

    let err = poll.unregister(&a).unwrap_err();

    assert!(matches!(err, Error::NotRegistered(fd) if fd == a.as_raw_fd()));
    assert_eq!(
        std::io::Error::from(err).kind(),
        std::io::ErrorKind::NotFound
    );
}

#[test]
fn test_register_negative_descriptor_fails() {
    let mut poll = Poll::new();

    let err = poll.register(&-1, Some(POLLIN)).unwrap_err();

    assert!(matches!(err, Error::NegativeDescriptor(-1)));
    assert!(poll.is_empty());
}

#[test]
fn test_unregister_removes_registration() {
    let (a, _b) = common::pair();
    let mut poll = Poll::new();

    poll.register(&a, None).unwrap();
    assert!(poll.contains(&a));

    poll.unregister(&a).unwrap();
    assert!(!poll.contains(&a));
    assert!(poll.unregister(&a).is_err());
}

#[coselect::test]
async fn test_register_twice_overwrites() {
    let (a, _b) = common::pair();
    let fd = a.as_raw_fd();

    let mut poll = Poll::new();
    poll.register(&a, Some(POLLIN)).unwrap();
    poll.register(&a, Some(POLLOUT)).unwrap();

    assert_eq!(poll.len(), 1);

    // Writable right away; the POLLIN registration is gone.
    let events = poll.poll(Some(1000.0)).await.unwrap();
    assert_eq!(events, vec![(fd, POLLOUT)]);
}

#[coselect::test]
async fn test_modify_registers_unknown_descriptor() {
    let (a, _b) = common::pair();
    let fd = a.as_raw_fd();

    let mut poll = Poll::new();
    poll.modify(&a, POLLOUT).unwrap();

    let events = poll.poll(Some(1000.0)).await.unwrap();
    assert_eq!(events, vec![(fd, POLLOUT)]);
}

#[coselect::test]
async fn test_default_mask_watches_both_directions() {
    let (mut a, b) = common::pair();
    let fd = b.as_raw_fd();
    a.write_all(b"x").unwrap();

    let mut poll = Poll::new();
    poll.register(&b, None).unwrap();

    let events = poll.poll(Some(1000.0)).await.unwrap();

    assert_eq!(events, vec![(fd, POLLIN | POLLOUT)]);
}

#[coselect::test]
async fn test_pollpri_alone_reports_nothing() {
    let (mut a, b) = common::pair();
    a.write_all(b"x").unwrap();

    let mut poll = Poll::new();
    poll.register(&b, Some(POLLPRI)).unwrap();

    let events = poll.poll(Some(50.0)).await.unwrap();

    assert!(events.is_empty());
    assert_eq!(active_watchers(), 0);
}

#[coselect::test]
async fn test_pollpri_alone_on_hung_up_peer_does_not_spin() {
    let (a, b) = common::pair();
    drop(a);

    let mut poll = Poll::new();
    poll.register(&b, Some(POLLPRI)).unwrap();

    let cpu = common::thread_cpu_time();
    let start = Instant::now();
    let events = poll.poll(Some(300.0)).await.unwrap();
    let cpu = common::thread_cpu_time() - cpu;

    assert!(events.is_empty());
    assert!(start.elapsed() >= Duration::from_millis(290));
    assert!(cpu < Duration::from_millis(100), "waiting used {cpu:?} of CPU");
    assert_eq!(active_watchers(), 0);
}

#[coselect::test]
async fn test_pollpri_alone_still_reports_nval() {
    let fd: RawFd = common::closed_fd(650);

    let mut poll = Poll::new();
    poll.register(&fd, Some(POLLPRI)).unwrap();

    let events = poll.poll(Some(1000.0)).await.unwrap();

    assert_eq!(events, vec![(fd, POLLNVAL)]);
}

#[coselect::test]
async fn test_other_bits_are_ignored() {
    let (a, _b) = common::pair();
    let fd = a.as_raw_fd();

    let mut poll = Poll::new();
    poll.register(&a, Some(POLLOUT | POLLERR | PollFlags::HUP)).unwrap();

    let events = poll.poll(Some(1000.0)).await.unwrap();
    assert_eq!(events, vec![(fd, POLLOUT)]);
}

#[coselect::test]
async fn test_poll_zero_timeout_sees_ready_descriptors() {
    let (a, _b) = common::pair();
    let fd = a.as_raw_fd();

    let mut poll = Poll::new();
    poll.register(&a, Some(POLLOUT)).unwrap();

    let events = poll.poll(Some(0.0)).await.unwrap();

    assert_eq!(events, vec![(fd, POLLOUT)]);
    assert_eq!(active_watchers(), 0);
}

#[coselect::test]
async fn test_poll_zero_timeout_returns_promptly() {
    let (a, _b) = common::pair();

    let mut poll = Poll::new();
    poll.register(&a, Some(POLLIN)).unwrap();

    let start = Instant::now();
    let events = poll.poll(Some(0.0)).await.unwrap();

    assert!(events.is_empty());
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[coselect::test]
async fn test_poll_several_descriptors() {
    let (mut a, b) = common::pair();
    let (c, _d) = common::pair();
    a.write_all(b"x").unwrap();

    let mut poll = Poll::new();
    poll.register(&b, Some(POLLIN)).unwrap();
    poll.register(&c, Some(POLLIN)).unwrap();
    poll.register(&a, Some(POLLOUT)).unwrap();

    let mut events = poll.poll(Some(1000.0)).await.unwrap();
    events.sort_by_key(|(fd, _)| *fd);

    let mut expected = vec![(b.as_raw_fd(), POLLIN), (a.as_raw_fd(), POLLOUT)];
    expected.sort_by_key(|(fd, _)| *fd);

    assert_eq!(events, expected);
}

#[coselect::test]
async fn test_cancelled_poll_leaves_no_watchers() {
    let (reader, _writer) = common::pair();

    let handle = task::spawn(async move {
        let mut poll = Poll::new();
        poll.register(&reader, Some(POLLIN)).unwrap();
        poll.poll(None).await.unwrap().len()
    });

    sleep(Duration::from_millis(20)).await;
    assert_eq!(active_watchers(), 1);

    handle.abort();

    assert_eq!(handle.await, Err(JoinError::Cancelled));
    assert_eq!(active_watchers(), 0);
}

#[coselect::test]
async fn test_empty_poll_times_out() {
    let poll = Poll::new();

    let start = Instant::now();
    let events = poll.poll(Some(30.0)).await.unwrap();

    assert!(events.is_empty());
    assert!(start.elapsed() >= Duration::from_millis(30));
}
