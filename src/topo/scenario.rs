//! 场景构建与运行
//!
//! 把 `ScenarioSpec` 展开成网络、队列、监控器与流量源，运行到结束时刻后汇总。

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Result, invalid};
use crate::monitor::{QueueMonitor, TraceSink};
use crate::net::{LinkId, MonitorId, NetWorld, Network, NodeId, Stats};
use crate::queue::DropTailQueue;
use crate::sim::{SimTime, Simulator};
use crate::traffic::{FlowSpec, SinkSummary, install_flow};

use super::spec::{NodeKind, QueueSpec, ScenarioSpec};

fn secs(value: f64, what: &str) -> Result<SimTime> {
    SimTime::from_secs_f64(value)
        .ok_or_else(|| invalid(format!("{what} ({value}) must be a non-negative number of seconds")))
}

/// 已构建、可运行的场景
pub struct Scenario {
    name: String,
    pub sim: Simulator,
    pub world: NetWorld,
    monitors: Vec<MonitorId>,
    flows: Vec<FlowSpec>,
    stop: SimTime,
}

/// 单个 RED 队列的运行结果
#[derive(Debug, Clone, Serialize)]
pub struct RedQueueSummary {
    pub from: String,
    pub to: String,
    pub enqueued: u64,
    pub dequeued: u64,
    pub early_drops: u64,
    pub forced_drops: u64,
    pub limit_drops: u64,
    pub avg_queue: f64,
}

/// 运行汇总
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub scenario: String,
    pub now_s: f64,
    pub events: u64,
    pub stats: Stats,
    pub sinks: Vec<SinkSummary>,
    pub total_rx_bytes: u64,
    pub red_queues: Vec<RedQueueSummary>,
}

impl ScenarioSpec {
    /// 校验并构建场景；任何非法参数都在仿真开始前以 `InvalidConfiguration` 返回。
    pub fn build(&self) -> Result<Scenario> {
        let stop = secs(self.stop_s, "stop_s")?;
        let period = secs(self.sample_period_s, "sample_period_s")?;
        if period == SimTime::ZERO {
            return Err(invalid("sample_period_s must be positive"));
        }

        let mut sim = Simulator::default();
        let mut world = NetWorld::default();
        let net = &mut world.net;

        let ids: Vec<NodeId> = self
            .nodes
            .iter()
            .map(|n| match n.kind {
                NodeKind::Host => net.add_host(n.name.as_str()),
                NodeKind::Router => net.add_router(n.name.as_str()),
            })
            .collect();
        let node = |i: usize| {
            ids.get(i)
                .copied()
                .ok_or_else(|| invalid(format!("node index {i} out of range ({} nodes)", ids.len())))
        };

        for l in &self.links {
            let (a, b) = (node(l.from)?, node(l.to)?);
            let delay = secs(l.delay_s, "link delay_s")?;
            let fwd = net.connect(a, b, delay, l.bandwidth_bps)?;
            install_queue(net, fwd, &l.queue)?;
            if l.duplex {
                let rev = net.connect(b, a, delay, l.bandwidth_bps)?;
                install_queue(net, rev, &l.reverse_queue)?;
            }
        }

        let mut monitors = Vec::with_capacity(self.monitors.len());
        for m in &self.monitors {
            let (a, b) = (node(m.from)?, node(m.to)?);
            let link = net
                .link_id(a, b)
                .ok_or_else(|| invalid(format!("monitor {}: no link {} -> {}", m.label, m.from, m.to)))?;
            let id = net.attach_monitor(link, m.label.as_str(), period)?;
            net.start_monitor(id, SimTime::ZERO, &mut sim)?;
            monitors.push(id);
        }

        let mut flows = Vec::with_capacity(self.flows.len());
        for (i, f) in self.flows.iter().enumerate() {
            let mut route = Vec::with_capacity(f.via.len() + 2);
            route.push(node(f.src)?);
            for v in &f.via {
                route.push(node(*v)?);
            }
            route.push(node(f.dst)?);
            let flow = FlowSpec {
                flow_id: i as u64 + 1,
                route,
                dst_port: f.port,
                rate_bps: f.rate_bps,
                packet_bytes: f.packet_bytes,
                start: secs(f.start_s, "flow start_s")?,
                stop: f.stop_s.map(|s| secs(s, "flow stop_s")).transpose()?,
            };
            install_flow(net, &mut sim, &flow)?;
            flows.push(flow);
        }

        info!(
            scenario = %self.name,
            nodes = ids.len(),
            links = net.links().len(),
            flows = flows.len(),
            monitors = monitors.len(),
            stop = %stop,
            "场景构建完成"
        );

        Ok(Scenario {
            name: self.name.clone(),
            sim,
            world,
            monitors,
            flows,
            stop,
        })
    }
}

fn install_queue(net: &mut Network, id: LinkId, spec: &QueueSpec) -> Result<()> {
    match spec {
        QueueSpec::DropTail { capacity_bytes } => {
            let q = capacity_bytes.map_or_else(DropTailQueue::unbounded, DropTailQueue::new);
            net.set_link_queue(id, Box::new(q))
        }
        QueueSpec::Red(cfg) => {
            let mut cfg = cfg.clone();
            // 每个 RED 队列独立的随机流
            cfg.seed = cfg.seed.wrapping_add(id.0 as u64);
            net.install_red(id, cfg)
        }
    }
}

impl Scenario {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stop(&self) -> SimTime {
        self.stop
    }

    pub fn network(&self) -> &Network {
        &self.world.net
    }

    pub fn flows(&self) -> &[FlowSpec] {
        &self.flows
    }

    pub fn monitor_ids(&self) -> &[MonitorId] {
        &self.monitors
    }

    pub fn monitors(&self) -> impl Iterator<Item = &QueueMonitor> {
        self.monitors.iter().filter_map(|id| self.world.net.monitor(*id))
    }

    /// 给每个监控器挂一个订阅者
    pub fn subscribe_all(&mut self, mut make: impl FnMut(&str) -> Box<dyn TraceSink>) {
        for id in &self.monitors {
            if let Some(m) = self.world.net.monitor_mut(*id) {
                let sink = make(m.label());
                m.subscribe(sink);
            }
        }
    }

    /// 运行到结束时刻，然后停止所有采样定时器
    pub fn run(&mut self) {
        info!(scenario = %self.name, stop = %self.stop, "开始仿真");
        self.sim.run_until(self.stop, &mut self.world);
        for id in &self.monitors {
            self.world.net.stop_monitor(*id, &mut self.sim);
        }
        debug!(pending = self.sim.pending(), "采样已停止");
        info!(
            scenario = %self.name,
            now = %self.sim.now(),
            events = self.sim.dispatched(),
            delivered = self.world.net.stats.delivered_pkts,
            dropped = self.world.net.stats.dropped_pkts,
            "仿真结束"
        );
    }

    pub fn summary(&self) -> RunSummary {
        let net = &self.world.net;
        let name = |n: NodeId| net.node_name(n).unwrap_or("?").to_string();
        let red_queues = net
            .links()
            .iter()
            .enumerate()
            .filter_map(|(i, l)| {
                let red = net.red_queue(LinkId(i))?;
                let st = red.stats();
                Some(RedQueueSummary {
                    from: name(l.from),
                    to: name(l.to),
                    enqueued: st.enqueued,
                    dequeued: st.dequeued,
                    early_drops: st.early_drops,
                    forced_drops: st.forced_drops,
                    limit_drops: st.limit_drops,
                    avg_queue: red.avg_queue(),
                })
            })
            .collect();

        RunSummary {
            scenario: self.name.clone(),
            now_s: self.sim.now().as_secs_f64(),
            events: self.sim.dispatched(),
            stats: net.stats,
            sinks: net.sinks().map(|s| s.summary()).collect(),
            total_rx_bytes: net.total_received_bytes(),
            red_queues,
        }
    }
}

#[cfg(test)]
impl Scenario {
    pub(crate) fn red_on(&self, from: &str, to: &str) -> Option<&crate::queue::RedQueue> {
        let net = &self.world.net;
        net.red_queue(net.link_id(net.find_node(from)?, net.find_node(to)?)?)
    }
}
