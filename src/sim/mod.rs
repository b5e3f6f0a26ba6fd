//! 离散事件仿真内核
//!
//! 按 (时间, 调度序号) 的顺序执行事件；同一时刻的事件按调度先后执行。

mod event;
mod simulator;
mod time;

pub use event::{Event, FnEvent, World};
pub use simulator::{EventId, Simulator};
pub use time::SimTime;
