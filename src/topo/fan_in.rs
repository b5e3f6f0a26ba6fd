//! 四源汇聚场景
//!
//! ```text
//! n0 --1ms--\
//! n1 --4ms---\
//!             r ==45Mbps/2ms, RED==> d
//! n2 --8ms---/
//! n3 --5ms--/
//! ```
//!
//! 第 i 条流在 0.2*i 秒开始，发往 d 的 8081+i 端口。

use crate::queue::RedConfig;

use super::{
    MonitorSpec, SAMPLE_PERIOD_S, STOP_S, ScenarioSpec, access_link, cbr_flow, host,
    red_bottleneck, router,
};

const ACCESS_DELAYS_MS: [f64; 4] = [1.0, 4.0, 8.0, 5.0];

pub fn fan_in() -> ScenarioSpec {
    let red = RedConfig {
        min_th: 5.0,
        max_th: 15.0,
        queue_limit: 40,
        wait: true,
        ..RedConfig::default()
    };

    let mut nodes: Vec<_> = (0..ACCESS_DELAYS_MS.len()).map(|i| host(format!("n{i}"))).collect();
    let r = nodes.len();
    nodes.push(router("r"));
    let d = nodes.len();
    nodes.push(host("d"));

    let mut links: Vec<_> = ACCESS_DELAYS_MS
        .iter()
        .enumerate()
        .map(|(i, ms)| access_link(i, r, ms / 1e3))
        .collect();
    links.push(red_bottleneck(r, d, 0.002, red));

    let flows = (0..ACCESS_DELAYS_MS.len())
        .map(|i| cbr_flow(i, d, vec![r], 8081 + i as u16, 0.2 * i as f64))
        .collect();

    ScenarioSpec {
        name: "fan_in".into(),
        stop_s: STOP_S,
        sample_period_s: SAMPLE_PERIOD_S,
        nodes,
        links,
        flows,
        monitors: vec![MonitorSpec {
            label: "red".into(),
            from: r,
            to: d,
        }],
    }
}
