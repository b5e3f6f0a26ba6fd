//! 场景与拓扑
//!
//! `ScenarioSpec` 是可序列化的场景描述，`build` 后得到可运行的 `Scenario`。
//! 内置三个参考场景：四源汇聚、双流、双向。

mod bidirectional;
mod fan_in;
mod scenario;
mod spec;
mod two_flow;

pub use bidirectional::bidirectional;
pub use fan_in::fan_in;
pub use scenario::{RedQueueSummary, RunSummary, Scenario};
pub use spec::{FlowEntry, LinkSpec, MonitorSpec, NodeKind, NodeSpec, QueueSpec, ScenarioSpec};
pub use two_flow::two_flow;

/// 参考场景的公共参数
pub const PACKET_BYTES: u32 = 958;
pub const SOURCE_RATE_BPS: u64 = 100_000_000;
pub const ACCESS_BPS: u64 = 100_000_000;
pub const BOTTLENECK_BPS: u64 = 45_000_000;
pub const STOP_S: f64 = 1.0;
pub const SAMPLE_PERIOD_S: f64 = 0.01;
/// 接入链路 DropTail 缓冲（按包数折算成字节）
pub const ACCESS_QUEUE_PKTS: u64 = 1000;

fn host(name: impl Into<String>) -> NodeSpec {
    NodeSpec {
        name: name.into(),
        kind: NodeKind::Host,
    }
}

fn router(name: impl Into<String>) -> NodeSpec {
    NodeSpec {
        name: name.into(),
        kind: NodeKind::Router,
    }
}

fn access_queue() -> QueueSpec {
    QueueSpec::DropTail {
        capacity_bytes: Some(ACCESS_QUEUE_PKTS * PACKET_BYTES as u64),
    }
}

fn access_link(from: usize, to: usize, delay_s: f64) -> LinkSpec {
    LinkSpec {
        from,
        to,
        bandwidth_bps: ACCESS_BPS,
        delay_s,
        duplex: true,
        queue: access_queue(),
        reverse_queue: access_queue(),
    }
}

/// 两个方向都挂 RED 的瓶颈链路
fn red_bottleneck(from: usize, to: usize, delay_s: f64, red: crate::queue::RedConfig) -> LinkSpec {
    LinkSpec {
        from,
        to,
        bandwidth_bps: BOTTLENECK_BPS,
        delay_s,
        duplex: true,
        queue: QueueSpec::Red(red.clone()),
        reverse_queue: QueueSpec::Red(red),
    }
}

fn cbr_flow(src: usize, dst: usize, via: Vec<usize>, port: u16, start_s: f64) -> FlowEntry {
    FlowEntry {
        src,
        dst,
        port,
        via,
        rate_bps: SOURCE_RATE_BPS,
        packet_bytes: PACKET_BYTES,
        start_s,
        stop_s: None,
    }
}
