use serde::Serialize;

use crate::queue::DropReason;
use crate::sim::SimTime;

/// 监控记录的类型与字段
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceKind {
    /// 周期采样
    Sample {
        size: u64,
        avg: f64,
        /// 到目前为止所有采样瞬时队长的算术平均
        sampled_mean: f64,
    },
    /// packet 被队列接受
    Enqueue {
        pkt_id: u64,
        flow_id: u64,
        seq: u64,
        size_bytes: u32,
        port: u16,
    },
    /// packet 被队列丢弃
    Drop {
        pkt_id: u64,
        flow_id: u64,
        seq: u64,
        size_bytes: u32,
        port: u16,
        reason: DropReason,
    },
}

/// 一条监控记录
#[derive(Debug, Clone, PartialEq)]
pub struct TraceRecord {
    pub at: SimTime,
    pub kind: TraceKind,
}

/// 采样点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueueSample {
    pub time: SimTime,
    pub instantaneous_size: u64,
    pub avg_size: f64,
    pub sampled_mean: f64,
}

impl TraceRecord {
    pub fn as_sample(&self) -> Option<QueueSample> {
        match self.kind {
            TraceKind::Sample {
                size,
                avg,
                sampled_mean,
            } => Some(QueueSample {
                time: self.at,
                instantaneous_size: size,
                avg_size: avg,
                sampled_mean,
            }),
            _ => None,
        }
    }

    pub fn is_drop(&self) -> bool {
        matches!(self.kind, TraceKind::Drop { .. })
    }

    pub fn is_enqueue(&self) -> bool {
        matches!(self.kind, TraceKind::Enqueue { .. })
    }
}
