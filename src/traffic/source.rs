use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{Result, invalid};
use crate::net::{NetWorld, Network, NodeId, serialization_time};
use crate::sim::{Event, EventId, SimTime, Simulator, World};

/// One constant-rate flow: where it goes, how fast, and when.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSpec {
    pub flow_id: u64,
    /// Explicit path, source first, sink node last.
    pub route: Vec<NodeId>,
    pub dst_port: u16,
    pub rate_bps: u64,
    pub packet_bytes: u32,
    pub start: SimTime,
    /// No packet departs at or after this instant.
    pub stop: Option<SimTime>,
}

impl FlowSpec {
    pub fn src(&self) -> Option<NodeId> {
        self.route.first().copied()
    }

    pub fn dst(&self) -> Option<NodeId> {
        self.route.last().copied()
    }

    /// Gap between successive departures.
    pub fn interval(&self) -> SimTime {
        serialization_time(self.packet_bytes, self.rate_bps)
    }

    pub fn validate(&self, net: &Network) -> Result<()> {
        if self.rate_bps == 0 {
            return Err(invalid(format!("flow {}: rate must be positive", self.flow_id)));
        }
        if self.packet_bytes == 0 {
            return Err(invalid(format!(
                "flow {}: packet size must be positive",
                self.flow_id
            )));
        }
        if let Some(stop) = self.stop {
            if stop < self.start {
                return Err(invalid(format!(
                    "flow {}: stop ({}) precedes start ({})",
                    self.flow_id, stop, self.start
                )));
            }
        }
        net.validate_route(&self.route)
    }
}

/// Self-rescheduling departure event of a constant-rate source.
#[derive(Debug)]
pub struct ConstantRateSource {
    pub flow_id: u64,
    pub route: Arc<[NodeId]>,
    pub dst_port: u16,
    pub packet_bytes: u32,
    pub gap: SimTime,
    pub stop: Option<SimTime>,
    /// Byte offset of the next packet.
    pub next_seq: u64,
}

impl Event for ConstantRateSource {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let me = *self;
        let now = sim.now();
        if me.stop.is_some_and(|stop| now >= stop) {
            debug!(flow_id = me.flow_id, now = ?now, "source stopped");
            return;
        }

        let w = NetWorld::downcast(world);
        let pkt = w.net.make_packet(
            me.flow_id,
            me.packet_bytes,
            me.next_seq,
            me.dst_port,
            Arc::clone(&me.route),
            now,
        );
        trace!(flow_id = me.flow_id, seq = me.next_seq, "source departure");
        w.net.on_sent(me.flow_id, me.packet_bytes);
        let src = me.route[0];
        w.net.forward_from(src, pkt, sim);

        let gap = me.gap;
        sim.schedule_in(
            gap,
            ConstantRateSource {
                next_seq: me.next_seq + me.packet_bytes as u64,
                ..me
            },
        );
    }
}

/// Validate a flow, register its sink and schedule its first departure.
pub fn install_flow(net: &mut Network, sim: &mut Simulator, spec: &FlowSpec) -> Result<EventId> {
    spec.validate(net)?;
    let dst = spec.dst().ok_or_else(|| invalid("flow route is empty"))?;
    net.register_sink(dst, spec.dst_port)?;

    debug!(
        flow_id = spec.flow_id,
        route = ?spec.route,
        rate_bps = spec.rate_bps,
        packet_bytes = spec.packet_bytes,
        start = %spec.start,
        "install flow"
    );

    sim.schedule(
        spec.start,
        ConstantRateSource {
            flow_id: spec.flow_id,
            route: spec.route.as_slice().into(),
            dst_port: spec.dst_port,
            packet_bytes: spec.packet_bytes,
            gap: spec.interval(),
            stop: spec.stop,
            next_seq: 0,
        },
    )
}
