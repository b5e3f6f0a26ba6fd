//! 链路上的两类事件：发送完成与到达下一跳

use tracing::trace;

use super::id::{LinkId, NodeId};
use super::net_world::NetWorld;
use super::packet::Packet;
use crate::sim::{Event, Simulator, World};

/// 链路串行化发送完一个 packet，空出来发送下一个
#[derive(Debug)]
pub struct TransmitComplete {
    pub link: LinkId,
}

impl Event for TransmitComplete {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        NetWorld::downcast(world).net.on_transmit_complete(self.link, sim);
    }
}

/// packet 经过传输与传播时延后到达 `to`
#[derive(Debug)]
pub struct PacketArrival {
    pub to: NodeId,
    pub pkt: Packet,
}

impl Event for PacketArrival {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let PacketArrival { to, pkt } = *self;
        trace!(pkt_id = pkt.id, flow_id = pkt.flow_id, hop = pkt.hop, to = ?to, now = %sim.now(), "到达");
        NetWorld::downcast(world).net.deliver(to, pkt, sim);
    }
}
