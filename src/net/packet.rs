//! 数据包类型
//!
//! 定义网络数据包及其相关操作。

use std::sync::Arc;

use super::id::NodeId;
use crate::sim::SimTime;

/// 网络数据包
///
/// 除逐跳前进的 `hop` 外，创建后不再修改；同一时刻只归属一个队列/链路阶段。
#[derive(Debug, Clone)]
pub struct Packet {
    pub id: u64,
    pub flow_id: u64,
    pub size_bytes: u32,
    /// 该 packet 首字节在流内的字节偏移
    pub seq: u64,
    /// 目的端口，与目的节点一起确定接收端
    pub dst_port: u16,
    /// 源端发出时刻
    pub sent_at: SimTime,
    pub route: Arc<[NodeId]>,
    pub hop: usize, // 当前所在节点在 route 中的索引
}

impl Packet {
    /// 以默认元数据构造（seq=0，port=0，sent_at=0），主要用于测试和队列单元。
    pub fn new(id: u64, flow_id: u64, size_bytes: u32, route: impl Into<Arc<[NodeId]>>) -> Self {
        let route = route.into();
        assert!(!route.is_empty(), "route must be non-empty");
        Self {
            id,
            flow_id,
            size_bytes,
            seq: 0,
            dst_port: 0,
            sent_at: SimTime::ZERO,
            route,
            hop: 0,
        }
    }

    /// 获取源节点
    pub fn src(&self) -> NodeId {
        self.route[0]
    }

    /// 获取目标节点
    pub fn dst(&self) -> NodeId {
        *self.route.last().expect("route non-empty")
    }

    /// 获取当前所在节点
    pub fn at(&self) -> NodeId {
        self.route[self.hop]
    }

    /// 检查是否有下一跳
    pub fn has_next(&self) -> bool {
        self.hop + 1 < self.route.len()
    }

    /// 获取下一跳节点（如果有）
    pub fn next(&self) -> Option<NodeId> {
        self.route.get(self.hop + 1).copied()
    }

    /// 前进到下一跳
    pub fn advance(mut self) -> Self {
        self.hop += 1;
        self
    }
}
