//! 队列监控（Instrumentation）
//!
//! 监控器订阅某条链路出口队列的入队/丢包事件，并用一个自我重调度的
//! 采样事件周期性记录瞬时队长与平均队长。记录只追加、按时间有序。

mod output;
mod queue_monitor;
mod record;

pub use output::{write_plot_files, write_trace_json};
pub use queue_monitor::{QueueMonitor, SampleQueue, TraceSink, TracingSink};
pub use record::{QueueSample, TraceKind, TraceRecord};
