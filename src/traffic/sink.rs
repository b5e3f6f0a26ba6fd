use serde::Serialize;

use crate::net::{NodeId, Packet};
use crate::sim::SimTime;

/// Receive-side byte counter bound to one `(node, port)` endpoint.
#[derive(Debug, Clone)]
pub struct PacketSink {
    node: NodeId,
    port: u16,
    rx_pkts: u64,
    rx_bytes: u64,
    first_rx: Option<SimTime>,
    last_rx: Option<SimTime>,
}

/// Serializable per-sink report line.
#[derive(Debug, Clone, Serialize)]
pub struct SinkSummary {
    pub node: usize,
    pub port: u16,
    pub rx_pkts: u64,
    pub rx_bytes: u64,
}

impl PacketSink {
    pub fn new(node: NodeId, port: u16) -> Self {
        Self {
            node,
            port,
            rx_pkts: 0,
            rx_bytes: 0,
            first_rx: None,
            last_rx: None,
        }
    }

    pub fn on_packet(&mut self, pkt: &Packet, now: SimTime) {
        self.rx_pkts += 1;
        self.rx_bytes += pkt.size_bytes as u64;
        self.first_rx.get_or_insert(now);
        self.last_rx = Some(now);
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Bytes received so far.
    pub fn total_rx(&self) -> u64 {
        self.rx_bytes
    }

    pub fn rx_pkts(&self) -> u64 {
        self.rx_pkts
    }

    pub fn first_rx(&self) -> Option<SimTime> {
        self.first_rx
    }

    pub fn last_rx(&self) -> Option<SimTime> {
        self.last_rx
    }

    pub fn summary(&self) -> SinkSummary {
        SinkSummary {
            node: self.node.0,
            port: self.port,
            rx_pkts: self.rx_pkts,
            rx_bytes: self.rx_bytes,
        }
    }
}
