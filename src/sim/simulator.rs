//! 仿真器
//!
//! 维护当前时间与按 (at, seq) 排序的事件堆。

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use tracing::{debug, info, trace};

use super::event::{Event, World};
use super::time::SimTime;
use crate::error::{Error, Result};

/// 事件句柄：调度时分配的序列号，可用于取消。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub u64);

struct Entry {
    at: SimTime,
    seq: u64,
    ev: Box<dyn Event>,
}

// BinaryHeap 是大顶堆，反向比较得到最早 (at, seq) 优先
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.at, other.seq).cmp(&(self.at, self.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for Entry {}

/// 事件驱动仿真器
///
/// 取消采用惰性删除：`live` 只保存尚未执行也未取消的事件序列号，
/// 出堆时不在 `live` 中的条目直接丢弃。
#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    next_seq: u64,
    q: BinaryHeap<Entry>,
    live: HashSet<u64>,
    dispatched: u64,
}

impl Simulator {
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 尚未执行且未被取消的事件数
    pub fn pending(&self) -> usize {
        self.live.len()
    }

    /// 已执行的事件总数
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// 调度事件在绝对时间 `at` 执行；`at` 早于当前时间视为负时延。
    pub fn schedule<E: Event>(&mut self, at: SimTime, ev: E) -> Result<EventId> {
        if at < self.now {
            return Err(Error::InvalidDelay {
                delay_s: at.as_secs_f64() - self.now.as_secs_f64(),
            });
        }
        Ok(self.push(at, ev))
    }

    /// 调度事件在 `now + delay` 执行。
    pub fn schedule_in<E: Event>(&mut self, delay: SimTime, ev: E) -> EventId {
        let at = self.now.saturating_add(delay);
        self.push(at, ev)
    }

    /// 以秒为单位的相对调度；负数或非有限值返回 `InvalidDelay`。
    pub fn schedule_after_secs<E: Event>(&mut self, delay_s: f64, ev: E) -> Result<EventId> {
        let delay = SimTime::from_secs_f64(delay_s).ok_or(Error::InvalidDelay { delay_s })?;
        Ok(self.schedule_in(delay, ev))
    }

    /// 取消一个尚未执行的事件。已执行或已取消的句柄返回 `false`，无副作用。
    pub fn cancel(&mut self, id: EventId) -> bool {
        let removed = self.live.remove(&id.0);
        trace!(seq = id.0, removed, "取消事件");
        removed
    }

    fn push<E: Event>(&mut self, at: SimTime, ev: E) -> EventId {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        trace!(now = %self.now, at = %at, seq, event = std::any::type_name::<E>(), "调度事件");

        self.live.insert(seq);
        self.q.push(Entry {
            at,
            seq,
            ev: Box::new(ev),
        });
        EventId(seq)
    }

    /// 弹出下一个有效事件（跳过已取消的条目），但只在其时间不超过 `until` 时。
    fn pop_due(&mut self, until: SimTime) -> Option<Entry> {
        while let Some(top) = self.q.peek() {
            if !self.live.contains(&top.seq) {
                self.q.pop();
                continue;
            }
            if top.at > until {
                return None;
            }
            let entry = self.q.pop()?;
            self.live.remove(&entry.seq);
            return Some(entry);
        }
        None
    }

    fn dispatch(&mut self, entry: Entry, world: &mut dyn World) {
        self.now = entry.at;
        self.dispatched += 1;
        entry.ev.execute(self, world);
        world.on_tick(self);
    }

    /// 运行直到事件队列为空或到达 `until`（恰好在 `until` 的事件会执行），
    /// 之后时钟停在 `until`。
    pub fn run_until(&mut self, until: SimTime, world: &mut dyn World) {
        debug!(now = %self.now, until = %until, pending = self.live.len(), "run_until");
        while let Some(entry) = self.pop_due(until) {
            self.dispatch(entry, world);
        }
        self.now = self.now.max(until);
    }

    /// 运行所有事件直到队列为空。
    pub fn run(&mut self, world: &mut dyn World) {
        info!(now = %self.now, pending = self.live.len(), "▶️  开始运行仿真");
        let start = self.dispatched;
        while let Some(entry) = self.pop_due(SimTime::MAX) {
            self.dispatch(entry, world);
        }
        info!(events = self.dispatched - start, final_time = %self.now, "✅ 仿真完成");
    }
}
