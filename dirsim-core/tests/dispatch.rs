mod common;

use std::sync::Arc;

use common::{OscReceiver, WAIT};
use dirsim_core::dispatch::{DispatchQueue, MemorySink, DEFAULT_POLL_INTERVAL};
use dirsim_core::types::OutboundMessage;
use rosc::OscType;

#[test]
fn test_udp_delivery_in_order() {
    let receiver = OscReceiver::bind().unwrap();
    let queue = DispatchQueue::spawn(Arc::new(receiver.sink()), DEFAULT_POLL_INTERVAL).unwrap();

    queue.enqueue("/stop", 1);
    queue.enqueue("/time", "0:00.000");
    queue.enqueue("/play", 1);
    queue.push(OutboundMessage::tempo(112.6));
    queue.enqueue("/track/5/volume", 0.65_f32);
    assert!(queue.flush(WAIT));

    assert_eq!(receiver.recv(), ("/stop".to_string(), vec![OscType::Int(1)]));
    assert_eq!(
        receiver.recv(),
        ("/time".to_string(), vec![OscType::String("0:00.000".to_string())])
    );
    assert_eq!(receiver.recv(), ("/play".to_string(), vec![OscType::Int(1)]));
    assert_eq!(receiver.recv(), ("/tempo/raw".to_string(), vec![OscType::Int(113)]));
    assert_eq!(
        receiver.recv(),
        ("/track/5/volume".to_string(), vec![OscType::Float(0.65)])
    );
    assert_eq!(queue.sent_count(), 5);
    assert_eq!(queue.failed_count(), 0);
}

#[test]
fn test_retarget_moves_later_messages() {
    let first = OscReceiver::bind().unwrap();
    let second = OscReceiver::bind().unwrap();
    let queue = DispatchQueue::spawn(Arc::new(first.sink()), DEFAULT_POLL_INTERVAL).unwrap();

    queue.enqueue("/a", 1);
    assert!(queue.flush(WAIT));
    queue.retarget("127.0.0.1", second.port()).unwrap();
    queue.enqueue("/b", 2);
    queue.enqueue("/c", 3);
    assert!(queue.flush(WAIT));

    assert_eq!(first.recv_addresses(1), vec!["/a"]);
    assert_eq!(second.recv_addresses(2), vec!["/b", "/c"]);
}

#[test]
fn test_failures_do_not_stall_queue() {
    let failing = Arc::new(MemorySink::failing());
    let queue = DispatchQueue::spawn(failing.clone(), DEFAULT_POLL_INTERVAL).unwrap();
    for i in 0..10 {
        queue.enqueue("/n", i);
    }
    assert!(queue.flush(WAIT));
    assert_eq!(queue.failed_count(), 10);

    let receiver = OscReceiver::bind().unwrap();
    queue.set_sink(Arc::new(receiver.sink()));
    queue.enqueue("/after", 1);
    assert!(queue.flush(WAIT));
    assert_eq!(receiver.recv_addresses(1), vec!["/after"]);
    assert_eq!(failing.attempted().len(), 10);
}

#[test]
fn test_drop_drains_queue() {
    let receiver = OscReceiver::bind().unwrap();
    {
        let queue = DispatchQueue::spawn(Arc::new(receiver.sink()), DEFAULT_POLL_INTERVAL).unwrap();
        for i in 0..3 {
            queue.enqueue("/n", i);
        }
    }
    let values: Vec<_> = (0..3).map(|_| receiver.recv().1).collect();
    assert_eq!(
        values,
        vec![vec![OscType::Int(0)], vec![OscType::Int(1)], vec![OscType::Int(2)]]
    );
}
