use tracing::debug;

use crate::net::{LinkId, MonitorId, NetWorld};
use crate::queue::{QueueEvent, QueueEventKind};
use crate::sim::{Event, EventId, SimTime, Simulator, World};

use super::record::{QueueSample, TraceKind, TraceRecord};

/// 记录订阅者：任何能接收 (时间, 类型, 字段) 的收集器
pub trait TraceSink {
    fn record(&mut self, label: &str, rec: &TraceRecord);
}

/// 把每条记录输出为 tracing 事件（target = `redsim::trace`）
#[derive(Debug, Default)]
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn record(&mut self, label: &str, rec: &TraceRecord) {
        debug!(target: "redsim::trace", queue = label, t = %rec.at, kind = ?rec.kind, "trace");
    }
}

/// 挂在一条链路出口队列上的监控器
pub struct QueueMonitor {
    label: String,
    link: LinkId,
    period: SimTime,
    timer: Option<EventId>,
    records: Vec<TraceRecord>,
    subscribers: Vec<Box<dyn TraceSink>>,
    sampled_total: f64,
    checks: u64,
    enqueues: u64,
    dequeues: u64,
    drops: u64,
}

impl QueueMonitor {
    pub fn new(label: impl Into<String>, link: LinkId, period: SimTime) -> Self {
        Self {
            label: label.into(),
            link,
            period,
            timer: None,
            records: Vec::new(),
            subscribers: Vec::new(),
            sampled_total: 0.0,
            checks: 0,
            enqueues: 0,
            dequeues: 0,
            drops: 0,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn link(&self) -> LinkId {
        self.link
    }

    pub fn period(&self) -> SimTime {
        self.period
    }

    /// 是否有已调度的采样事件
    pub fn is_sampling(&self) -> bool {
        self.timer.is_some()
    }

    pub(crate) fn set_timer(&mut self, ev: EventId) {
        self.timer = Some(ev);
    }

    pub(crate) fn take_timer(&mut self) -> Option<EventId> {
        self.timer.take()
    }

    pub fn subscribe(&mut self, sink: Box<dyn TraceSink>) {
        self.subscribers.push(sink);
    }

    fn push(&mut self, rec: TraceRecord) {
        for s in &mut self.subscribers {
            s.record(&self.label, &rec);
        }
        self.records.push(rec);
    }

    /// 队列事件回调。出队只计数，不产生记录。
    pub fn on_queue_event(&mut self, now: SimTime, ev: &QueueEvent) {
        let kind = match ev.kind {
            QueueEventKind::Dequeue => {
                self.dequeues += 1;
                return;
            }
            QueueEventKind::Enqueue => {
                self.enqueues += 1;
                TraceKind::Enqueue {
                    pkt_id: ev.pkt_id,
                    flow_id: ev.flow_id,
                    seq: ev.seq,
                    size_bytes: ev.size_bytes,
                    port: ev.dst_port,
                }
            }
            QueueEventKind::Drop(reason) => {
                self.drops += 1;
                TraceKind::Drop {
                    pkt_id: ev.pkt_id,
                    flow_id: ev.flow_id,
                    seq: ev.seq,
                    size_bytes: ev.size_bytes,
                    port: ev.dst_port,
                    reason,
                }
            }
        };
        self.push(TraceRecord { at: now, kind });
    }

    /// 追加一个采样点
    pub fn record_sample(&mut self, now: SimTime, size: u64, avg: f64) {
        self.sampled_total += size as f64;
        self.checks += 1;
        let sampled_mean = self.sampled_total / self.checks as f64;
        self.push(TraceRecord {
            at: now,
            kind: TraceKind::Sample {
                size,
                avg,
                sampled_mean,
            },
        });
    }

    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    pub fn samples(&self) -> impl Iterator<Item = QueueSample> + '_ {
        self.records.iter().filter_map(TraceRecord::as_sample)
    }

    pub fn enqueue_count(&self) -> u64 {
        self.enqueues
    }

    pub fn dequeue_count(&self) -> u64 {
        self.dequeues
    }

    pub fn drop_count(&self) -> u64 {
        self.drops
    }

    /// 所有采样瞬时队长的平均值；尚未采样时为 `None`
    pub fn mean_sampled_size(&self) -> Option<f64> {
        (self.checks > 0).then(|| self.sampled_total / self.checks as f64)
    }
}

/// 事件：对某个监控器采样一次，然后按周期重新调度自己
#[derive(Debug)]
pub struct SampleQueue {
    pub monitor: MonitorId,
}

impl Event for SampleQueue {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let SampleQueue { monitor } = *self;
        NetWorld::downcast(world).net.sample_monitor(monitor, sim);
    }
}
