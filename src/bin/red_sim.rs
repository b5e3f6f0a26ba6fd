//! RED 瓶颈仿真
//!
//! 运行内置参考场景或 JSON 场景文件，输出每个接收端的字节数，
//! 并可选地写出队列曲线（plot 文件）与 JSON trace。

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use redsim_rs::monitor::{TracingSink, write_plot_files, write_trace_json};
use redsim_rs::queue::QueueMode;
use redsim_rs::topo::{self, ScenarioSpec};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ScenarioArg {
    /// 4 sources into one RED bottleneck
    FanIn,
    /// 2 sources, long-delay bottleneck
    TwoFlow,
    /// 4 hosts on each side, RED in both directions
    Bidirectional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Packets,
    Bytes,
}

#[derive(Debug, Parser)]
#[command(name = "red_sim", about = "RED 瓶颈仿真：恒定速率源 + RED 出口队列")]
struct Args {
    /// Built-in scenario
    #[arg(long, value_enum, default_value_t = ScenarioArg::FanIn)]
    scenario: ScenarioArg,

    /// Scenario JSON file (takes precedence over --scenario)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop time (seconds)
    #[arg(long)]
    stop_s: Option<f64>,

    /// Monitor sampling period (seconds)
    #[arg(long)]
    sample_period_s: Option<f64>,

    #[arg(long)]
    min_th: Option<f64>,
    #[arg(long)]
    max_th: Option<f64>,
    /// Hard queue limit, in the unit given by --mode
    #[arg(long)]
    queue_limit: Option<u64>,
    /// EWMA weight
    #[arg(long)]
    weight: Option<f64>,
    #[arg(long)]
    max_p: Option<f64>,
    /// Drop everything above max_th instead of ramping to 2*max_th
    #[arg(long)]
    no_gentle: bool,
    /// Use the "wait" count correction
    #[arg(long, conflicts_with = "no_wait")]
    wait: bool,
    /// Use the classic count correction
    #[arg(long)]
    no_wait: bool,
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,
    /// Base seed of the per-queue random streams
    #[arg(long)]
    seed: Option<u64>,

    /// Directory for the per-monitor plot files
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Write all monitor records as one JSON array
    #[arg(long)]
    trace_json: Option<PathBuf>,

    /// Write the run summary as JSON
    #[arg(long)]
    summary_json: Option<PathBuf>,

    /// Print the resolved scenario as JSON and exit
    #[arg(long)]
    dump_config: bool,
}

impl Args {
    fn scenario_spec(&self) -> redsim_rs::Result<ScenarioSpec> {
        let mut spec = match &self.config {
            Some(path) => ScenarioSpec::from_file(path)?,
            None => match self.scenario {
                ScenarioArg::FanIn => topo::fan_in(),
                ScenarioArg::TwoFlow => topo::two_flow(),
                ScenarioArg::Bidirectional => topo::bidirectional(),
            },
        };

        if let Some(s) = self.stop_s {
            spec.stop_s = s;
        }
        if let Some(p) = self.sample_period_s {
            spec.sample_period_s = p;
        }
        for red in spec.red_configs_mut() {
            if let Some(v) = self.min_th {
                red.min_th = v;
            }
            if let Some(v) = self.max_th {
                red.max_th = v;
            }
            if let Some(v) = self.queue_limit {
                red.queue_limit = v;
            }
            if let Some(v) = self.weight {
                red.weight = v;
            }
            if let Some(v) = self.max_p {
                red.max_p = v;
            }
            if self.no_gentle {
                red.gentle = false;
            }
            if self.wait {
                red.wait = true;
            }
            if self.no_wait {
                red.wait = false;
            }
            if let Some(m) = self.mode {
                red.mode = match m {
                    ModeArg::Packets => QueueMode::Packets,
                    ModeArg::Bytes => QueueMode::Bytes,
                };
            }
            if let Some(v) = self.seed {
                red.seed = v;
            }
        }
        Ok(spec)
    }
}

fn run(args: &Args) -> redsim_rs::Result<()> {
    let spec = args.scenario_spec()?;
    if args.dump_config {
        println!("{}", spec.to_json()?);
        return Ok(());
    }

    let mut scenario = spec.build()?;
    scenario.subscribe_all(|_| Box::new(TracingSink));
    scenario.run();

    let net = scenario.network();
    for (i, sink) in net.sinks().enumerate() {
        println!("\tSink\t{}\tBytes\t{}", i, sink.total_rx());
    }
    println!();
    println!("\tTotal\t\tBytes\t{}", net.total_received_bytes());

    let summary = scenario.summary();
    println!(
        "done @ {} sent_pkts={} delivered_pkts={} dropped_pkts={} events={}",
        scenario.sim.now(),
        summary.stats.sent_pkts,
        summary.stats.delivered_pkts,
        summary.stats.dropped_pkts,
        summary.events,
    );
    for q in &summary.red_queues {
        println!(
            "red {}->{} enqueued={} early_drops={} forced_drops={} limit_drops={} avg_queue={:.3}",
            q.from, q.to, q.enqueued, q.early_drops, q.forced_drops, q.limit_drops, q.avg_queue
        );
    }

    if let Some(dir) = &args.out_dir {
        fs::create_dir_all(dir)?;
        for m in scenario.monitors() {
            let files = write_plot_files(dir, m)?;
            info!(queue = m.label(), files = files.len(), dir = %dir.display(), "wrote plot files");
        }
    }
    if let Some(path) = &args.trace_json {
        let n = write_trace_json(path, net.monitors())?;
        eprintln!("wrote {} trace records to {}", n, path.display());
    }
    if let Some(path) = &args.summary_json {
        fs::write(path, serde_json::to_string_pretty(&summary)?)?;
        eprintln!("wrote summary to {}", path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    // 初始化 tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "red_sim failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
