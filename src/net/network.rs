//! 网络拓扑管理
//!
//! 定义网络拓扑结构，包含节点、链路、出口队列、数据包转发、
//! 接收端统计以及挂在链路队列上的监控器。

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::events::{PacketArrival, TransmitComplete};
use super::id::{LinkId, MonitorId, NodeId};
use super::link::Link;
use super::node::{Host, Node, Router};
use super::packet::Packet;
use super::stats::{FlowStats, Stats};
use crate::error::{Result, invalid};
use crate::monitor::{QueueMonitor, SampleQueue};
use crate::queue::{PacketQueue, QueueEvent, QueueEventKind, RedConfig, RedQueue, Rejected};
use crate::sim::{SimTime, Simulator};
use crate::traffic::PacketSink;
use tracing::{debug, trace};

/// 网络拓扑
#[derive(Default)]
pub struct Network {
    nodes: Vec<Option<Box<dyn Node>>>,
    node_names: Vec<String>,
    links: Vec<Link>,
    edges: HashMap<(NodeId, NodeId), LinkId>,
    monitors: Vec<QueueMonitor>,
    sinks: BTreeMap<(NodeId, u16), PacketSink>,
    flows: BTreeMap<u64, FlowStats>,
    next_pkt_id: u64,
    pub stats: Stats,
}

impl Network {
    /// 添加主机节点
    pub fn add_host(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let name = name.into();
        self.node_names.push(name.clone());
        self.nodes.push(Some(Box::new(Host::new(id, name))));
        id
    }

    /// 添加路由器节点
    pub fn add_router(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let name = name.into();
        self.node_names.push(name.clone());
        self.nodes.push(Some(Box::new(Router::new(id, name))));
        id
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        self.node_names.get(id.0).map(String::as_str)
    }

    /// 节点正在处理 packet 时（已被临时取出）返回 `None`
    pub fn node(&self, id: NodeId) -> Option<&dyn Node> {
        self.nodes.get(id.0)?.as_deref()
    }

    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.node_names.iter().position(|n| n == name).map(NodeId)
    }

    fn check_node(&self, id: NodeId) -> Result<()> {
        if id.0 >= self.nodes.len() {
            return Err(invalid(format!("unknown node {:?}", id)));
        }
        Ok(())
    }

    /// 连接两个节点（创建单向链路）
    pub fn connect(
        &mut self,
        from: NodeId,
        to: NodeId,
        latency: SimTime,
        bandwidth_bps: u64,
    ) -> Result<LinkId> {
        self.check_node(from)?;
        self.check_node(to)?;
        if from == to {
            return Err(invalid(format!("link {:?}->{:?} is a self loop", from, to)));
        }
        if self.edges.contains_key(&(from, to)) {
            return Err(invalid(format!("duplicate link {:?}->{:?}", from, to)));
        }
        let id = LinkId(self.links.len());
        self.links.push(Link::new(from, to, latency, bandwidth_bps)?);
        self.edges.insert((from, to), id);
        Ok(id)
    }

    /// 创建一对方向相反、参数相同的链路（点对点全双工信道）
    pub fn connect_duplex(
        &mut self,
        a: NodeId,
        b: NodeId,
        latency: SimTime,
        bandwidth_bps: u64,
    ) -> Result<(LinkId, LinkId)> {
        let ab = self.connect(a, b, latency, bandwidth_bps)?;
        let ba = self.connect(b, a, latency, bandwidth_bps)?;
        Ok((ab, ba))
    }

    pub fn link_id(&self, from: NodeId, to: NodeId) -> Option<LinkId> {
        self.edges.get(&(from, to)).copied()
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.0)
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// 替换链路出口队列
    pub fn set_link_queue(&mut self, id: LinkId, queue: Box<dyn PacketQueue>) -> Result<()> {
        let link = self
            .links
            .get_mut(id.0)
            .ok_or_else(|| invalid(format!("unknown link {:?}", id)))?;
        link.queue = queue;
        Ok(())
    }

    /// 在链路出口安装 RED 队列；未指定链路带宽时取链路自身带宽。
    pub fn install_red(&mut self, id: LinkId, mut cfg: RedConfig) -> Result<()> {
        let link = self
            .links
            .get(id.0)
            .ok_or_else(|| invalid(format!("unknown link {:?}", id)))?;
        cfg.link_bandwidth_bps.get_or_insert(link.bandwidth_bps);
        debug!(link = ?id, from = ?link.from, to = ?link.to, ?cfg, "安装 RED 队列");
        let red = RedQueue::new(cfg)?;
        self.set_link_queue(id, Box::new(red))
    }

    /// 以具体类型访问链路出口队列
    pub fn queue_as<T: PacketQueue + 'static>(&self, id: LinkId) -> Option<&T> {
        self.links.get(id.0)?.queue.as_any().downcast_ref::<T>()
    }

    pub fn red_queue(&self, id: LinkId) -> Option<&RedQueue> {
        self.queue_as::<RedQueue>(id)
    }

    /// 检查显式路由：至少两个节点，且相邻节点之间存在链路
    pub fn validate_route(&self, route: &[NodeId]) -> Result<()> {
        if route.len() < 2 {
            return Err(invalid(format!(
                "route {:?} needs at least a source and a destination",
                route
            )));
        }
        for n in route {
            self.check_node(*n)?;
        }
        for w in route.windows(2) {
            if !self.edges.contains_key(&(w[0], w[1])) {
                return Err(invalid(format!("no link from {:?} to {:?}", w[0], w[1])));
            }
        }
        Ok(())
    }

    /// 创建数据包
    pub fn make_packet(
        &mut self,
        flow_id: u64,
        size_bytes: u32,
        seq: u64,
        dst_port: u16,
        route: Arc<[NodeId]>,
        now: SimTime,
    ) -> Packet {
        let id = self.next_pkt_id;
        self.next_pkt_id = self.next_pkt_id.wrapping_add(1);
        Packet {
            id,
            flow_id,
            size_bytes,
            seq,
            dst_port,
            sent_at: now,
            route,
            hop: 0,
        }
    }

    /// 将数据包交付给节点处理
    pub fn deliver(&mut self, to: NodeId, pkt: Packet, sim: &mut Simulator) {
        // 暂时把节点取出来，避免 &mut self 与 &mut node 的重叠借用。
        let mut node = self.nodes[to.0].take().expect("node exists");
        node.on_packet(pkt, sim, self);
        self.nodes[to.0] = Some(node);
    }

    /// 从指定节点转发数据包：放入下一跳链路的出口队列，链路空闲则立即开始发送。
    #[tracing::instrument(level = "trace", skip(self, pkt, sim), fields(pkt_id = pkt.id, from = ?from, hop = pkt.hop))]
    pub fn forward_from(&mut self, from: NodeId, pkt: Packet, sim: &mut Simulator) {
        let to = pkt.next().expect("has_next checked by caller");
        let link_id = *self
            .edges
            .get(&(from, to))
            .unwrap_or_else(|| panic!("no link from {:?} to {:?}", from, to));

        let now = sim.now();
        let arrived = QueueEvent::new(QueueEventKind::Enqueue, &pkt);
        let link = &mut self.links[link_id.0];
        match link.queue.enqueue(pkt, now) {
            Ok(()) => {
                trace!(link = ?link_id, qlen = link.queue.len(), "入队");
                let idle = !link.busy;
                self.notify(link_id, now, &arrived);
                if idle {
                    self.start_tx(link_id, sim);
                }
            }
            Err(Rejected { pkt, reason }) => {
                debug!(link = ?link_id, pkt_id = pkt.id, flow_id = pkt.flow_id, ?reason, "丢包");
                self.stats.dropped_pkts += 1;
                self.stats.dropped_bytes += pkt.size_bytes as u64;
                let dropped = QueueEvent {
                    kind: QueueEventKind::Drop(reason),
                    ..arrived
                };
                self.notify(link_id, now, &dropped);
            }
        }
    }

    /// 链路空闲时从出口队列取下一个 packet 开始序列化发送
    fn start_tx(&mut self, link_id: LinkId, sim: &mut Simulator) {
        let now = sim.now();
        let link = &mut self.links[link_id.0];
        let Some(pkt) = link.queue.dequeue(now) else {
            link.busy = false;
            return;
        };
        link.busy = true;
        let tx_time = link.tx_time(pkt.size_bytes);
        let arrive_in = tx_time.saturating_add(link.latency);
        let to = link.to;

        trace!(
            link = ?link_id,
            pkt_id = pkt.id,
            tx_time = ?tx_time,
            arrive = ?now.saturating_add(arrive_in),
            "开始发送"
        );

        let departed = QueueEvent::new(QueueEventKind::Dequeue, &pkt);
        self.notify(link_id, now, &departed);

        sim.schedule_in(tx_time, TransmitComplete { link: link_id });
        sim.schedule_in(arrive_in, PacketArrival { to, pkt: pkt.advance() });
    }

    /// 链路完成一次发送
    pub(crate) fn on_transmit_complete(&mut self, link_id: LinkId, sim: &mut Simulator) {
        self.links[link_id.0].busy = false;
        self.start_tx(link_id, sim);
    }

    /// 数据包送达目的地时的处理
    pub(crate) fn on_delivered(&mut self, pkt: Packet, now: SimTime) {
        self.stats.delivered_pkts += 1;
        self.stats.delivered_bytes += pkt.size_bytes as u64;

        let key = (pkt.dst(), pkt.dst_port);
        self.sinks
            .entry(key)
            .or_insert_with(|| PacketSink::new(key.0, key.1))
            .on_packet(&pkt, now);

        trace!(pkt_id = pkt.id, flow_id = pkt.flow_id, "✅ 数据包送达目的地");
    }

    /// 源端发出一个 packet 的计数
    pub(crate) fn on_sent(&mut self, flow_id: u64, size_bytes: u32) {
        self.stats.sent_pkts += 1;
        self.stats.sent_bytes += size_bytes as u64;
        let f = self.flows.entry(flow_id).or_default();
        f.sent_pkts += 1;
        f.sent_bytes += size_bytes as u64;
    }

    pub fn flow_stats(&self, flow_id: u64) -> Option<FlowStats> {
        self.flows.get(&flow_id).copied()
    }

    /// 预先登记接收端，使其即便没有收到数据也出现在汇总里
    pub fn register_sink(&mut self, node: NodeId, port: u16) -> Result<()> {
        self.check_node(node)?;
        self.sinks
            .entry((node, port))
            .or_insert_with(|| PacketSink::new(node, port));
        Ok(())
    }

    pub fn sink(&self, node: NodeId, port: u16) -> Option<&PacketSink> {
        self.sinks.get(&(node, port))
    }

    /// 按 (节点, 端口) 排序的接收端
    pub fn sinks(&self) -> impl Iterator<Item = &PacketSink> {
        self.sinks.values()
    }

    pub fn total_received_bytes(&self) -> u64 {
        self.sinks.values().map(PacketSink::total_rx).sum()
    }

    fn notify(&mut self, link_id: LinkId, now: SimTime, ev: &QueueEvent) {
        for m in self.monitors.iter_mut().filter(|m| m.link() == link_id) {
            m.on_queue_event(now, ev);
        }
    }

    /// 在链路出口队列上挂一个监控器（订阅入队/丢包事件，并周期采样）
    pub fn attach_monitor(
        &mut self,
        link: LinkId,
        label: impl Into<String>,
        period: SimTime,
    ) -> Result<MonitorId> {
        if link.0 >= self.links.len() {
            return Err(invalid(format!("unknown link {:?}", link)));
        }
        if period == SimTime::ZERO {
            return Err(invalid("monitor sampling period must be positive"));
        }
        let id = MonitorId(self.monitors.len());
        self.monitors.push(QueueMonitor::new(label, link, period));
        Ok(id)
    }

    /// 在 `at` 时刻开始周期采样
    pub fn start_monitor(&mut self, id: MonitorId, at: SimTime, sim: &mut Simulator) -> Result<()> {
        let m = self
            .monitors
            .get_mut(id.0)
            .ok_or_else(|| invalid(format!("unknown monitor {:?}", id)))?;
        if let Some(old) = m.take_timer() {
            sim.cancel(old);
        }
        let ev = sim.schedule(at, SampleQueue { monitor: id })?;
        m.set_timer(ev);
        Ok(())
    }

    /// 取消采样定时器；重复调用无副作用
    pub fn stop_monitor(&mut self, id: MonitorId, sim: &mut Simulator) -> bool {
        match self.monitors.get_mut(id.0).and_then(QueueMonitor::take_timer) {
            Some(ev) => sim.cancel(ev),
            None => false,
        }
    }

    /// 采样一次并重新调度自身
    pub(crate) fn sample_monitor(&mut self, id: MonitorId, sim: &mut Simulator) {
        let Some(m) = self.monitors.get_mut(id.0) else {
            return;
        };
        let queue = &self.links[m.link().0].queue;
        let size = queue.occupancy();
        let avg = queue.average().unwrap_or(size as f64);
        m.record_sample(sim.now(), size, avg);

        let next = sim.schedule_in(m.period(), SampleQueue { monitor: id });
        m.set_timer(next);
    }

    pub fn monitor(&self, id: MonitorId) -> Option<&QueueMonitor> {
        self.monitors.get(id.0)
    }

    pub fn monitor_mut(&mut self, id: MonitorId) -> Option<&mut QueueMonitor> {
        self.monitors.get_mut(id.0)
    }

    pub fn monitors(&self) -> &[QueueMonitor] {
        &self.monitors
    }
}
