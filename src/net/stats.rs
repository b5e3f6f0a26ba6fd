//! 统计信息
//!
//! 定义网络仿真统计数据结构。

use serde::Serialize;

/// 网络统计信息
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct Stats {
    pub sent_pkts: u64,
    pub sent_bytes: u64,
    pub delivered_pkts: u64,
    pub delivered_bytes: u64,
    pub dropped_pkts: u64,
    pub dropped_bytes: u64,
}

/// 单条流在源端的发送计数
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct FlowStats {
    pub sent_pkts: u64,
    pub sent_bytes: u64,
}
