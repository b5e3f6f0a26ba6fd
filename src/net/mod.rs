//! 网络层
//!
//! 节点、单向链路及其出口队列、显式路由的 packet，以及把它们串起来的 `Network`。

mod events;
mod id;
mod link;
mod net_world;
mod network;
mod node;
mod packet;
mod stats;

pub use events::{PacketArrival, TransmitComplete};
pub use id::{LinkId, MonitorId, NodeId};
pub use link::Link;
pub(crate) use link::serialization_time;
pub use net_world::NetWorld;
pub use network::Network;
pub use node::{Host, Node, Router};
pub use packet::Packet;
pub use stats::{FlowStats, Stats};
