//! Random Early Detection (RED) queue discipline.
//!
//! RED keeps an exponentially weighted moving average (EWMA) of the queue
//! length, updated on every arrival, and drops arrivals with a probability
//! that grows with that average:
//!
//! ```text
//!  p
//!  1 |                         ______  (gentle: linear ramp to 1 at 2*max_th)
//!    |                    ___/
//! max_p                 /|
//!    |            ___/   |
//!  0 |___________/       |
//!    +-----------+-------+--------+---- avg
//!              min_th  max_th  2*max_th
//! ```
//!
//! While the queue is idle the average is decayed as if `m` packets of the
//! configured mean size had been transmitted through an empty queue, where
//! `m` is the whole number of such transmissions that fit in the idle period.

use std::any::Any;
use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{Result, invalid};
use crate::net::Packet;
use crate::sim::SimTime;

use super::{DropReason, PacketQueue, Rejected};

/// Unit in which queue size, thresholds and the hard limit are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueMode {
    #[default]
    Packets,
    Bytes,
}

/// RED parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedConfig {
    /// Lower average-queue threshold (unit given by `mode`).
    pub min_th: f64,
    /// Upper average-queue threshold (unit given by `mode`).
    pub max_th: f64,
    /// Drop probability at `avg == max_th`, before count correction.
    pub max_p: f64,
    /// EWMA weight, in (0, 1].
    pub weight: f64,
    /// Ramp the drop probability from `max_p` to 1 between `max_th` and
    /// `2 * max_th` instead of dropping everything above `max_th`.
    pub gentle: bool,
    /// Use the "wait" count correction, which spaces drops more evenly.
    pub wait: bool,
    pub mode: QueueMode,
    /// Hard cap on the instantaneous queue size.
    pub queue_limit: u64,
    /// Typical packet size, used by the idle-time correction.
    pub mean_pkt_size: u32,
    /// Bandwidth of the link the queue feeds. When unset, topology builders
    /// fill it in from the link itself.
    pub link_bandwidth_bps: Option<u64>,
    /// Seed for the per-queue random stream.
    pub seed: u64,
}

impl Default for RedConfig {
    fn default() -> Self {
        Self {
            min_th: 5.0,
            max_th: 15.0,
            max_p: 0.02,
            weight: 0.002,
            gentle: true,
            wait: false,
            mode: QueueMode::Packets,
            queue_limit: 40,
            mean_pkt_size: 500,
            link_bandwidth_bps: None,
            seed: 1,
        }
    }
}

impl RedConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.min_th.is_finite() && self.max_th.is_finite()) {
            return Err(invalid("red: thresholds must be finite"));
        }
        if self.min_th < 0.0 {
            return Err(invalid(format!("red: min_th ({}) must be >= 0", self.min_th)));
        }
        if self.min_th >= self.max_th {
            return Err(invalid(format!(
                "red: min_th ({}) must be below max_th ({})",
                self.min_th, self.max_th
            )));
        }
        if !(0.0..=1.0).contains(&self.max_p) {
            return Err(invalid(format!("red: max_p ({}) must be in [0, 1]", self.max_p)));
        }
        if !(self.weight > 0.0 && self.weight <= 1.0) {
            return Err(invalid(format!("red: weight ({}) must be in (0, 1]", self.weight)));
        }
        if self.queue_limit == 0 {
            return Err(invalid("red: queue_limit must be positive"));
        }
        if self.mean_pkt_size == 0 {
            return Err(invalid("red: mean_pkt_size must be positive"));
        }
        if self.link_bandwidth_bps == Some(0) {
            return Err(invalid("red: link_bandwidth_bps must be positive"));
        }
        Ok(())
    }

    /// Base drop probability for a given average queue size (no count
    /// correction).
    pub fn drop_probability(&self, avg: f64) -> f64 {
        if avg < self.min_th {
            0.0
        } else if avg < self.max_th {
            self.max_p * (avg - self.min_th) / (self.max_th - self.min_th)
        } else if self.gentle {
            if avg >= 2.0 * self.max_th {
                1.0
            } else {
                self.max_p + (1.0 - self.max_p) * (avg - self.max_th) / self.max_th
            }
        } else {
            1.0
        }
    }

    /// Spread drops out by raising `p_b` with the number of packets accepted
    /// since the last drop.
    pub fn count_corrected(&self, p_b: f64, count: u64) -> f64 {
        let cp = count as f64 * p_b;
        let p = if self.wait {
            if cp < 1.0 {
                0.0
            } else if cp < 2.0 {
                p_b / (2.0 - cp)
            } else {
                1.0
            }
        } else if cp >= 1.0 {
            1.0
        } else {
            p_b / (1.0 - cp)
        };
        p.min(1.0)
    }

    /// Typical packet transmissions per second on the attached link.
    fn packet_time_constant(&self) -> f64 {
        let bw = self.link_bandwidth_bps.unwrap_or(0) as f64;
        bw / (8.0 * self.mean_pkt_size as f64)
    }
}

/// Snapshot of the estimator state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RedState {
    pub avg_queue: f64,
    pub len_pkts: u64,
    pub len_bytes: u64,
    pub count_since_drop: u64,
    /// Set while the queue is empty; the average decays from this instant.
    pub idle_since: Option<SimTime>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedStats {
    pub enqueued: u64,
    pub dequeued: u64,
    pub early_drops: u64,
    pub forced_drops: u64,
    pub limit_drops: u64,
}

impl RedStats {
    pub fn drops(&self) -> u64 {
        self.early_drops + self.forced_drops + self.limit_drops
    }
}

#[derive(Debug)]
pub struct RedQueue {
    cfg: RedConfig,
    ptc: f64,
    state: RedState,
    stats: RedStats,
    q: VecDeque<Packet>,
    rng: StdRng,
}

impl RedQueue {
    pub fn new(cfg: RedConfig) -> Result<Self> {
        cfg.validate()?;
        let ptc = cfg.packet_time_constant();
        let rng = StdRng::seed_from_u64(cfg.seed);
        Ok(Self {
            cfg,
            ptc,
            state: RedState {
                avg_queue: 0.0,
                len_pkts: 0,
                len_bytes: 0,
                count_since_drop: 0,
                idle_since: Some(SimTime::ZERO),
            },
            stats: RedStats::default(),
            q: VecDeque::new(),
            rng,
        })
    }

    pub fn config(&self) -> &RedConfig {
        &self.cfg
    }

    pub fn state(&self) -> RedState {
        self.state
    }

    pub fn stats(&self) -> RedStats {
        self.stats
    }

    pub fn avg_queue(&self) -> f64 {
        self.state.avg_queue
    }

    pub fn is_idle(&self) -> bool {
        self.state.idle_since.is_some()
    }

    /// Instantaneous size in the configured unit.
    pub fn current_size(&self) -> u64 {
        match self.cfg.mode {
            QueueMode::Packets => self.state.len_pkts,
            QueueMode::Bytes => self.state.len_bytes,
        }
    }

    fn update_average(&mut self, now: SimTime) {
        let w = self.cfg.weight;
        let n = self.current_size() as f64;
        let mut m = 0u64;
        if let Some(since) = self.state.idle_since.take() {
            let idle_s = now.saturating_sub(since).as_secs_f64();
            m = (idle_s * self.ptc).floor() as u64;
        }
        let decay = (1.0 - w).powf(m as f64 + 1.0);
        self.state.avg_queue = self.state.avg_queue * decay + w * n;
        trace!(m, n, avg = self.state.avg_queue, "red: ewma update");
    }

    fn over_limit(&self, size_bytes: u32) -> bool {
        match self.cfg.mode {
            QueueMode::Packets => self.state.len_pkts >= self.cfg.queue_limit,
            QueueMode::Bytes => {
                self.state.len_bytes.saturating_add(size_bytes as u64) > self.cfg.queue_limit
            }
        }
    }

    /// Admission decision; `None` means accept.
    fn admit(&mut self, size_bytes: u32) -> Option<DropReason> {
        if self.over_limit(size_bytes) {
            return Some(DropReason::QueueLimit);
        }

        let avg = self.state.avg_queue;
        let cfg = &self.cfg;
        if avg < cfg.min_th {
            self.state.count_since_drop = 0;
            return None;
        }
        let forced = if cfg.gentle {
            avg >= 2.0 * cfg.max_th
        } else {
            avg >= cfg.max_th
        };
        if forced {
            self.state.count_since_drop = 0;
            return Some(DropReason::Forced);
        }

        let p_b = cfg.drop_probability(avg);
        // gentle 斜坡段直接用 p_b，不做 count 修正
        let p = if avg < cfg.max_th {
            cfg.count_corrected(p_b, self.state.count_since_drop)
        } else {
            p_b
        };
        let u: f64 = self.rng.gen_range(0.0..1.0);
        if u < p {
            self.state.count_since_drop = 0;
            Some(DropReason::Early)
        } else {
            self.state.count_since_drop += 1;
            None
        }
    }
}

impl PacketQueue for RedQueue {
    fn enqueue(&mut self, pkt: Packet, now: SimTime) -> Result<(), Rejected> {
        self.update_average(now);
        if let Some(reason) = self.admit(pkt.size_bytes) {
            match reason {
                DropReason::Early => self.stats.early_drops += 1,
                DropReason::QueueLimit => self.stats.limit_drops += 1,
                _ => self.stats.forced_drops += 1,
            }
            debug!(
                pkt_id = pkt.id,
                flow_id = pkt.flow_id,
                ?reason,
                avg = self.state.avg_queue,
                qlen = self.current_size(),
                "red: drop"
            );
            return Err(Rejected { pkt, reason });
        }

        self.state.len_pkts += 1;
        self.state.len_bytes += pkt.size_bytes as u64;
        self.stats.enqueued += 1;
        self.q.push_back(pkt);
        Ok(())
    }

    fn dequeue(&mut self, now: SimTime) -> Option<Packet> {
        let pkt = self.q.pop_front();
        if let Some(p) = &pkt {
            self.state.len_pkts -= 1;
            self.state.len_bytes -= p.size_bytes as u64;
            self.stats.dequeued += 1;
        }
        if self.q.is_empty() && self.state.idle_since.is_none() {
            self.state.idle_since = Some(now);
            trace!(now = ?now, "red: queue went idle");
        }
        pkt
    }

    fn len(&self) -> usize {
        self.q.len()
    }

    fn bytes(&self) -> u64 {
        self.state.len_bytes
    }

    fn occupancy(&self) -> u64 {
        self.current_size()
    }

    fn average(&self) -> Option<f64> {
        Some(self.state.avg_queue)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
