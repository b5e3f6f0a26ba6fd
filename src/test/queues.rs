use crate::net::{NodeId, Packet};
use crate::queue::{DropReason, DropTailQueue, PacketQueue};
use crate::sim::SimTime;

fn pkt(id: u64, size_bytes: u32) -> Packet {
    Packet::new(id, 0, size_bytes, vec![NodeId(0), NodeId(1)])
}

#[test]
fn droptail_queue_enforces_capacity_and_preserves_order() {
    let now = SimTime::ZERO;
    let mut q = DropTailQueue::new(100);
    assert_eq!(q.capacity_bytes(), 100);
    assert_eq!(q.len(), 0);
    assert_eq!(q.bytes(), 0);
    assert!(q.is_empty());

    assert!(q.enqueue(pkt(1, 60), now).is_ok());
    assert_eq!(q.len(), 1);
    assert_eq!(q.bytes(), 60);

    let rejected = q.enqueue(pkt(2, 50), now).expect_err("should drop");
    assert_eq!(rejected.pkt.id, 2);
    assert_eq!(rejected.reason, DropReason::Overflow);
    assert_eq!(q.len(), 1);
    assert_eq!(q.bytes(), 60);

    assert!(q.enqueue(pkt(3, 40), now).is_ok());
    assert_eq!(q.bytes(), 100);

    assert_eq!(q.dequeue(now).map(|p| p.id), Some(1));
    assert_eq!(q.dequeue(now).map(|p| p.id), Some(3));
    assert!(q.dequeue(now).is_none());
    assert_eq!(q.bytes(), 0);
}

#[test]
fn droptail_queue_reports_no_average() {
    let mut q = DropTailQueue::unbounded();
    for i in 0..3 {
        q.enqueue(pkt(i, 1000), SimTime::ZERO).expect("unbounded");
    }
    assert_eq!(q.occupancy(), 3);
    assert_eq!(q.average(), None);
    assert!(q.as_any().downcast_ref::<DropTailQueue>().is_some());
}
