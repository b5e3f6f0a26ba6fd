//! 节点
//!
//! 路由是 packet 自带的显式路径：还有下一跳就转发，否则在本节点交付。

use tracing::{trace, warn};

use super::id::NodeId;
use super::network::Network;
use super::packet::Packet;
use crate::sim::Simulator;

pub trait Node: Send {
    fn id(&self) -> NodeId;
    fn name(&self) -> &str;
    fn on_packet(&mut self, pkt: Packet, sim: &mut Simulator, net: &mut Network);
    /// 经本节点转发出去的 packet 数
    fn forwarded(&self) -> u64;
    /// 在本节点交付的 packet 数
    fn delivered(&self) -> u64;
}

/// 流的源端与接收端
#[derive(Debug)]
pub struct Host {
    id: NodeId,
    name: String,
    forwarded: u64,
    delivered: u64,
}

impl Host {
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            forwarded: 0,
            delivered: 0,
        }
    }
}

impl Node for Host {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn on_packet(&mut self, pkt: Packet, sim: &mut Simulator, net: &mut Network) {
        if pkt.has_next() {
            self.forwarded += 1;
            net.forward_from(self.id, pkt, sim);
        } else {
            self.delivered += 1;
            net.on_delivered(pkt, sim.now());
        }
    }

    fn forwarded(&self) -> u64 {
        self.forwarded
    }

    fn delivered(&self) -> u64 {
        self.delivered
    }
}

/// 路由器：只做转发
#[derive(Debug)]
pub struct Router {
    id: NodeId,
    name: String,
    forwarded: u64,
    delivered: u64,
}

impl Router {
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            forwarded: 0,
            delivered: 0,
        }
    }
}

impl Node for Router {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn on_packet(&mut self, pkt: Packet, sim: &mut Simulator, net: &mut Network) {
        if pkt.has_next() {
            trace!(router = %self.name, pkt_id = pkt.id, next = ?pkt.next(), "转发");
            self.forwarded += 1;
            net.forward_from(self.id, pkt, sim);
        } else {
            warn!(router = %self.name, pkt_id = pkt.id, flow_id = pkt.flow_id, "路由终止于路由器");
            self.delivered += 1;
            net.on_delivered(pkt, sim.now());
        }
    }

    fn forwarded(&self) -> u64 {
        self.forwarded
    }

    fn delivered(&self) -> u64 {
        self.delivered
    }
}
