use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "redsim-rs-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write_file(dir: &PathBuf, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write temp file");
    path
}

fn sink_lines(stdout: &str) -> Vec<u64> {
    stdout
        .lines()
        .filter(|line| line.starts_with("\tSink\t"))
        .map(|line| {
            line.rsplit('\t')
                .next()
                .expect("bytes column")
                .parse()
                .expect("bytes value")
        })
        .collect()
}

fn total_line(stdout: &str) -> u64 {
    stdout
        .lines()
        .find_map(|line| line.strip_prefix("\tTotal\t\tBytes\t"))
        .expect("total line")
        .parse()
        .expect("total value")
}

#[test]
fn red_sim_fan_in_prints_sinks_and_writes_outputs() {
    let dir = unique_temp_dir("fan-in");
    let plots = dir.join("plots");
    let trace = dir.join("trace.json");
    let summary = dir.join("summary.json");

    let output = Command::new(env!("CARGO_BIN_EXE_red_sim"))
        .args([
            "--scenario",
            "fan-in",
            "--stop-s",
            "0.2",
            "--out-dir",
            plots.to_str().unwrap(),
            "--trace-json",
            trace.to_str().unwrap(),
            "--summary-json",
            summary.to_str().unwrap(),
        ])
        .env("RUST_LOG", "warn")
        .output()
        .expect("run red_sim");
    assert!(
        output.status.success(),
        "red_sim failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let sinks = sink_lines(&stdout);
    assert_eq!(sinks.len(), 4);
    assert_eq!(sinks.iter().sum::<u64>(), total_line(&stdout));
    // 0.2 s 时只有第一条流开始发送
    assert!(sinks[0] > 0);
    assert_eq!(&sinks[1..], &[0, 0, 0]);
    assert!(stdout.lines().any(|l| l.starts_with("done @ ")));

    for name in [
        "redQueue.plot",
        "redQueueAvg.plot",
        "redQueueMean.plot",
        "redPacketNum.plot",
        "redPacketDrop.plot",
    ] {
        assert!(plots.join(name).exists(), "missing {name}");
    }
    let queue_plot = fs::read_to_string(plots.join("redQueue.plot")).expect("read plot");
    assert_eq!(queue_plot.lines().count(), 21);

    let raw = fs::read_to_string(&trace).expect("read trace json");
    let v: Value = serde_json::from_str(&raw).expect("parse trace json");
    let arr = v.as_array().expect("trace json array");
    assert!(!arr.is_empty());
    let times: Vec<f64> = arr
        .iter()
        .map(|r| r["t_s"].as_f64().expect("t_s"))
        .collect();
    assert!(times.windows(2).all(|w| w[0] <= w[1]));
    assert!(arr.iter().all(|r| r["queue"] == "red"));
    assert!(arr.iter().any(|r| r["kind"] == "sample"));
    assert!(arr.iter().any(|r| r["kind"] == "enqueue"));

    let raw = fs::read_to_string(&summary).expect("read summary json");
    let s: Value = serde_json::from_str(&raw).expect("parse summary json");
    assert_eq!(s["scenario"], "fan_in");
    assert_eq!(s["total_rx_bytes"].as_u64(), Some(total_line(&stdout)));
    assert_eq!(s["sinks"].as_array().map(Vec::len), Some(4));
}

#[test]
fn red_sim_dump_config_applies_overrides() {
    let output = Command::new(env!("CARGO_BIN_EXE_red_sim"))
        .args([
            "--scenario",
            "two-flow",
            "--min-th",
            "20",
            "--max-th",
            "80",
            "--no-gentle",
            "--no-wait",
            "--mode",
            "bytes",
            "--seed",
            "9",
            "--dump-config",
        ])
        .env("RUST_LOG", "warn")
        .output()
        .expect("run red_sim");
    assert!(output.status.success());

    let v: Value = serde_json::from_slice(&output.stdout).expect("parse config json");
    assert_eq!(v["name"], "two_flow");
    let reds: Vec<&Value> = v["links"]
        .as_array()
        .expect("links")
        .iter()
        .flat_map(|l| [&l["queue"], &l["reverse_queue"]])
        .filter(|q| q["kind"] == "red")
        .collect();
    assert_eq!(reds.len(), 2);
    for red in reds {
        assert_eq!(red["min_th"].as_f64(), Some(20.0));
        assert_eq!(red["max_th"].as_f64(), Some(80.0));
        assert_eq!(red["queue_limit"].as_u64(), Some(1000));
        assert_eq!(red["gentle"], false);
        assert_eq!(red["wait"], false);
        assert_eq!(red["mode"], "bytes");
        assert_eq!(red["seed"].as_u64(), Some(9));
    }
}

#[test]
fn red_sim_runs_a_json_scenario() {
    let dir = unique_temp_dir("config");
    let config = write_file(
        &dir,
        "scenario.json",
        r#"
{
    "name": "line",
    "stop_s": 0.1,
    "nodes": [ { "name": "a" }, { "name": "b" } ],
    "links": [
        { "from": 0, "to": 1, "bandwidth_bps": 10000000, "delay_s": 0.001,
          "queue": { "kind": "red", "min_th": 2, "max_th": 6, "queue_limit": 10 } }
    ],
    "flows": [
        { "src": 0, "dst": 1, "port": 7000, "rate_bps": 5000000, "packet_bytes": 500 }
    ],
    "monitors": [ { "label": "ab", "from": 0, "to": 1 } ]
}
"#,
    );

    let output = Command::new(env!("CARGO_BIN_EXE_red_sim"))
        .args(["--config", config.to_str().unwrap()])
        .env("RUST_LOG", "warn")
        .output()
        .expect("run red_sim");
    assert!(
        output.status.success(),
        "red_sim failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let sinks = sink_lines(&stdout);
    assert_eq!(sinks.len(), 1);
    // 5 Mbps 源、10 Mbps 链路：不排队不丢包
    assert!(sinks[0] > 0 && sinks[0] % 500 == 0);
    assert!(stdout.contains("early_drops=0 forced_drops=0 limit_drops=0"));
}

#[test]
fn red_sim_rejects_invalid_parameters() {
    let output = Command::new(env!("CARGO_BIN_EXE_red_sim"))
        .args(["--scenario", "fan-in", "--min-th", "50"])
        .env("RUST_LOG", "off")
        .output()
        .expect("run red_sim");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid configuration"), "stderr: {stderr}");
    assert!(output.stdout.is_empty());
}
