//! Traffic sources and sinks.
//!
//! Sources are constant-rate packet generators: the transport layer is
//! reduced to "one fixed-size packet every `packet_bytes * 8 / rate_bps`
//! seconds" starting at the flow's start time. Sinks count what arrives.

mod sink;
mod source;

pub use sink::{PacketSink, SinkSummary};
pub use source::{ConstantRateSource, FlowSpec, install_flow};
