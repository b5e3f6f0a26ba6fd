//! 链路类型
//!
//! 定义网络链路及其传输时延计算。链路本身只是一个时延函数，
//! 串行发送由出口队列的发送循环保证（见 `Network::start_tx`）。

use super::id::NodeId;
use crate::error::{Result, invalid};
use crate::queue::{DropTailQueue, PacketQueue};
use crate::sim::SimTime;

/// ceil(bytes*8 / bps) 秒 -> 纳秒
pub(crate) fn serialization_time(bytes: u32, bandwidth_bps: u64) -> SimTime {
    let bits = (bytes as u128).saturating_mul(8);
    let bps = bandwidth_bps.max(1) as u128;
    let nanos = (bits.saturating_mul(1_000_000_000u128) + (bps - 1)) / bps;
    SimTime(nanos.min(u64::MAX as u128) as u64)
}

/// 网络链路（单向）
#[derive(Debug)]
pub struct Link {
    pub from: NodeId,
    pub to: NodeId,
    pub latency: SimTime,
    pub bandwidth_bps: u64,
    /// 是否正在序列化发送一个 packet
    pub busy: bool,
    /// 链路出口的排队策略（默认 DropTail，容量极大）
    pub queue: Box<dyn PacketQueue>,
}

impl Link {
    /// 创建新链路；带宽必须为正。
    pub fn new(from: NodeId, to: NodeId, latency: SimTime, bandwidth_bps: u64) -> Result<Self> {
        if bandwidth_bps == 0 {
            return Err(invalid(format!(
                "link {:?}->{:?}: bandwidth must be positive",
                from, to
            )));
        }
        Ok(Self {
            from,
            to,
            latency,
            bandwidth_bps,
            busy: false,
            queue: Box::new(DropTailQueue::unbounded()),
        })
    }

    /// 计算传输指定字节数所需的时间
    pub fn tx_time(&self, bytes: u32) -> SimTime {
        serialization_time(bytes, self.bandwidth_bps)
    }

    /// 单向总时延：传输时延 + 传播时延
    pub fn one_way_delay(&self, bytes: u32) -> SimTime {
        self.tx_time(bytes).saturating_add(self.latency)
    }
}
