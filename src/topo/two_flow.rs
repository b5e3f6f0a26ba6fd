//! 双流场景：n0、n1 经 r 发往 d，瓶颈 45 Mbps / 20 ms，阈值 15/140。

use crate::queue::RedConfig;

use super::{
    MonitorSpec, SAMPLE_PERIOD_S, STOP_S, ScenarioSpec, access_link, cbr_flow, host,
    red_bottleneck, router,
};

pub fn two_flow() -> ScenarioSpec {
    let red = RedConfig {
        min_th: 15.0,
        max_th: 140.0,
        queue_limit: 1000,
        wait: true,
        ..RedConfig::default()
    };

    let nodes = vec![host("n0"), host("n1"), router("r"), host("d")];
    let (r, d) = (2, 3);
    let links = vec![
        access_link(0, r, 0.001),
        access_link(1, r, 0.001),
        red_bottleneck(r, d, 0.020, red),
    ];
    let flows = vec![
        cbr_flow(0, d, vec![r], 8081, 0.0),
        cbr_flow(1, d, vec![r], 8082, 0.2),
    ];

    ScenarioSpec {
        name: "two_flow".into(),
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
