//! 双向场景
//!
//! A 侧 4 台主机接路由器 ra，B 侧 4 台主机接 rb，ra <-> rb 为 45 Mbps / 2 ms，
//! 两个方向各有一个 RED 队列。每台主机向对侧每台主机发一条流（共 32 条），
//! 全部在 0 时刻开始，接收端口均为 8888。

use crate::queue::RedConfig;

use super::{
    FlowEntry, MonitorSpec, SAMPLE_PERIOD_S, STOP_S, ScenarioSpec, access_link, cbr_flow, host,
    red_bottleneck, router,
};

const SIDE_A_DELAYS_MS: [f64; 4] = [0.5, 1.0, 3.0, 5.0];
const SIDE_B_DELAYS_MS: [f64; 4] = [0.5, 1.0, 5.0, 2.0];
const PORT: u16 = 8888;

pub fn bidirectional() -> ScenarioSpec {
    let red = RedConfig {
        min_th: 5.0,
        max_th: 15.0,
        queue_limit: 400,
        wait: true,
        ..RedConfig::default()
    };

    let mut nodes = Vec::new();
    let side_a: Vec<usize> = (0..SIDE_A_DELAYS_MS.len())
        .map(|i| {
            nodes.push(host(format!("a{i}")));
            nodes.len() - 1
        })
        .collect();
    let side_b: Vec<usize> = (0..SIDE_B_DELAYS_MS.len())
        .map(|i| {
            nodes.push(host(format!("b{i}")));
            nodes.len() - 1
        })
        .collect();
    let ra = nodes.len();
    nodes.push(router("ra"));
    let rb = nodes.len();
    nodes.push(router("rb"));

    let mut links = Vec::new();
    for (h, ms) in side_a.iter().zip(SIDE_A_DELAYS_MS) {
        links.push(access_link(*h, ra, ms / 1e3));
    }
    for (h, ms) in side_b.iter().zip(SIDE_B_DELAYS_MS) {
        links.push(access_link(*h, rb, ms / 1e3));
    }
    links.push(red_bottleneck(ra, rb, 0.002, red));

    let mut flows: Vec<FlowEntry> = Vec::new();
    for &dst in &side_b {
        for &src in &side_a {
            flows.push(cbr_flow(src, dst, vec![ra, rb], PORT, 0.0));
        }
    }
    for &dst in &side_a {
        for &src in &side_b {
            flows.push(cbr_flow(src, dst, vec![rb, ra], PORT, 0.0));
        }
    }

    ScenarioSpec {
        name: "bidirectional".into(),
        stop_s: STOP_S,
        sample_period_s: SAMPLE_PERIOD_S,
        nodes,
        links,
        flows,
        monitors: vec![
            MonitorSpec {
                label: "redA".into(),
                from: ra,
                to: rb,
            },
            MonitorSpec {
                label: "redB".into(),
                from: rb,
                to: ra,
            },
        ],
    }
}
