//! 队列策略（Queue disciplines）
//!
//! 提供 DropTail（尾丢弃）与 RED（随机早期检测）两种出口队列。
//! 队列只负责准入与出队顺序；串行发送由链路的发送循环保证。

use std::any::Any;

use crate::net::Packet;
use crate::sim::SimTime;

mod drop_tail;
mod red;

pub use drop_tail::DropTailQueue;
pub use red::{QueueMode, RedConfig, RedQueue, RedState, RedStats};

/// 丢包原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// DropTail 缓冲区溢出
    Overflow,
    /// RED 按概率提前丢弃
    Early,
    /// RED 平均队长超过阈值后的强制丢弃
    Forced,
    /// 瞬时队长达到硬上限
    QueueLimit,
}

/// 被拒绝的 packet 及原因
#[derive(Debug)]
pub struct Rejected {
    pub pkt: Packet,
    pub reason: DropReason,
}

/// 队列事件类型：每次入队/出队/丢包都会产生一个
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueEventKind {
    Enqueue,
    Dequeue,
    Drop(DropReason),
}

/// 队列事件：从 packet 摘出的标识字段，供监控记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueEvent {
    pub kind: QueueEventKind,
    pub pkt_id: u64,
    pub flow_id: u64,
    pub seq: u64,
    pub size_bytes: u32,
    pub dst_port: u16,
}

impl QueueEvent {
    pub fn new(kind: QueueEventKind, pkt: &Packet) -> Self {
        Self {
            kind,
            pkt_id: pkt.id,
            flow_id: pkt.flow_id,
            seq: pkt.seq,
            size_bytes: pkt.size_bytes,
            dst_port: pkt.dst_port,
        }
    }
}

/// Packet 队列抽象
pub trait PacketQueue: std::fmt::Debug {
    /// 入队：成功返回 Ok；若被丢弃则返回 Err(Rejected)
    fn enqueue(&mut self, pkt: Packet, now: SimTime) -> Result<(), Rejected>;
    /// 出队：按队列策略返回下一个 packet
    fn dequeue(&mut self, now: SimTime) -> Option<Packet>;

    fn len(&self) -> usize;
    fn bytes(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 以队列自身计量单位表示的当前占用（packets 或 bytes）
    fn occupancy(&self) -> u64 {
        self.len() as u64
    }

    /// 平滑后的平均队长（仅 AQM 队列提供）
    fn average(&self) -> Option<f64> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}
