//! 场景描述（JSON）
//!
//! 节点用下标引用；路由是显式节点序列（`src`、`via...`、`dst`），不做路由计算。

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::queue::RedConfig;

fn default_sample_period_s() -> f64 {
    0.01
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub name: String,
    pub stop_s: f64,
    #[serde(default = "default_sample_period_s")]
    pub sample_period_s: f64,
    pub nodes: Vec<NodeSpec>,
    pub links: Vec<LinkSpec>,
    #[serde(default)]
    pub flows: Vec<FlowEntry>,
    #[serde(default)]
    pub monitors: Vec<MonitorSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    #[default]
    Host,
    Router,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    #[serde(default)]
    pub kind: NodeKind,
}

/// 出口队列类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueueSpec {
    DropTail {
        #[serde(default)]
        capacity_bytes: Option<u64>,
    },
    Red(RedConfig),
}

impl Default for QueueSpec {
    fn default() -> Self {
        QueueSpec::DropTail {
            capacity_bytes: None,
        }
    }
}

/// 点对点链路；`duplex` 时同时创建反向链路，反向出口队列由 `reverse_queue` 决定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSpec {
    pub from: usize,
    pub to: usize,
    pub bandwidth_bps: u64,
    pub delay_s: f64,
    #[serde(default = "default_true")]
    pub duplex: bool,
    #[serde(default)]
    pub queue: QueueSpec,
    #[serde(default)]
    pub reverse_queue: QueueSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowEntry {
    pub src: usize,
    pub dst: usize,
    pub port: u16,
    /// 源与目的之间依次经过的节点
    #[serde(default)]
    pub via: Vec<usize>,
    pub rate_bps: u64,
    pub packet_bytes: u32,
    #[serde(default)]
    pub start_s: f64,
    #[serde(default)]
    pub stop_s: Option<f64>,
}

/// 在 `from -> to` 链路的出口队列上挂监控器
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSpec {
    pub label: String,
    pub from: usize,
    pub to: usize,
}

impl ScenarioSpec {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 场景内所有 RED 队列的配置（用于统一覆盖命令行参数）
    pub fn red_configs_mut(&mut self) -> impl Iterator<Item = &mut RedConfig> {
        self.links
            .iter_mut()
            .flat_map(|l| [&mut l.queue, &mut l.reverse_queue])
            .filter_map(|q| match q {
                QueueSpec::Red(cfg) => Some(cfg),
                QueueSpec::DropTail { .. } => None,
            })
    }
}
