//! 监控记录导出：gnuplot 风格文本文件与 JSON

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::error::Result;

use super::queue_monitor::QueueMonitor;
use super::record::TraceKind;

/// 写出一个监控器的五个 plot 文件，返回写入的路径：
///
/// - `<label>Queue.plot`：`t size`
/// - `<label>QueueAvg.plot`：`t avg`（RED 的 EWMA）
/// - `<label>QueueMean.plot`：`t sampled_mean`
/// - `<label>PacketNum.plot`：`t seq port`（每次入队）
/// - `<label>PacketDrop.plot`：`t seq`（每次丢包）
pub fn write_plot_files(dir: &Path, monitor: &QueueMonitor) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let label = monitor.label();
    let path = |suffix: &str| dir.join(format!("{label}{suffix}.plot"));
    let paths = [
        path("Queue"),
        path("QueueAvg"),
        path("QueueMean"),
        path("PacketNum"),
        path("PacketDrop"),
    ];

    let mut queue = BufWriter::new(File::create(&paths[0])?);
    let mut avg = BufWriter::new(File::create(&paths[1])?);
    let mut mean = BufWriter::new(File::create(&paths[2])?);
    let mut arrive = BufWriter::new(File::create(&paths[3])?);
    let mut dropped = BufWriter::new(File::create(&paths[4])?);

    for rec in monitor.records() {
        let t = rec.at.as_secs_f64();
        match &rec.kind {
            TraceKind::Sample {
                size,
                avg: a,
                sampled_mean,
            } => {
                writeln!(queue, "{t} {size}")?;
                writeln!(avg, "{t} {a}")?;
                writeln!(mean, "{t} {sampled_mean}")?;
            }
            TraceKind::Enqueue { seq, port, .. } => writeln!(arrive, "{t} {seq} {port}")?,
            TraceKind::Drop { seq, .. } => writeln!(dropped, "{t} {seq}")?,
        }
    }
    for w in [&mut queue, &mut avg, &mut mean, &mut arrive, &mut dropped] {
        w.flush()?;
    }

    info!(queue = label, dir = %dir.display(), "wrote plot files");
    Ok(paths.into())
}

#[derive(Serialize)]
struct ExportRecord<'a> {
    t_s: f64,
    queue: &'a str,
    #[serde(flatten)]
    kind: &'a TraceKind,
}

/// 把所有监控器的记录合并（按时间稳定排序）写成一个 JSON 数组
pub fn write_trace_json(path: &Path, monitors: &[QueueMonitor]) -> Result<usize> {
    let mut all: Vec<(u64, ExportRecord<'_>)> = monitors
        .iter()
        .flat_map(|m| {
            m.records().iter().map(move |rec| {
                (
                    rec.at.0,
                    ExportRecord {
                        t_s: rec.at.as_secs_f64(),
                        queue: m.label(),
                        kind: &rec.kind,
                    },
                )
            })
        })
        .collect();
    all.sort_by_key(|(t, _)| *t);
    let out: Vec<_> = all.into_iter().map(|(_, r)| r).collect();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&out)?;
    fs::write(path, json)?;
    info!(path = %path.display(), records = out.len(), "wrote trace json");
    Ok(out.len())
}
