use crate::Error;
use crate::net::{NodeId, Packet};
use crate::queue::{DropReason, PacketQueue, QueueMode, RedConfig, RedQueue};
use crate::sim::SimTime;

fn pkt(id: u64, size_bytes: u32) -> Packet {
    Packet::new(id, 1, size_bytes, vec![NodeId(0), NodeId(1)])
}

/// weight = 1 时平均队长就是到达时刻的瞬时队长，便于构造确定的场景
fn instant(min_th: f64, max_th: f64, max_p: f64) -> RedConfig {
    RedConfig {
        min_th,
        max_th,
        max_p,
        weight: 1.0,
        queue_limit: 1000,
        link_bandwidth_bps: Some(45_000_000),
        ..RedConfig::default()
    }
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn drop_probability_follows_the_gentle_curve() {
    let cfg = RedConfig::default();
    assert_eq!(cfg.drop_probability(0.0), 0.0);
    assert_eq!(cfg.drop_probability(4.999), 0.0);
    assert_eq!(cfg.drop_probability(5.0), 0.0);
    assert!(approx(cfg.drop_probability(10.0), 0.01));
    assert!(approx(cfg.drop_probability(15.0), 0.02));
    assert!(approx(cfg.drop_probability(22.5), 0.02 + 0.98 * 0.5));
    assert_eq!(cfg.drop_probability(30.0), 1.0);
    assert_eq!(cfg.drop_probability(1e6), 1.0);
}

#[test]
fn drop_probability_without_gentle_jumps_to_one_at_max_th() {
    let cfg = RedConfig {
        gentle: false,
        ..RedConfig::default()
    };
    assert!(approx(cfg.drop_probability(14.999), 0.02 * 9.999 / 10.0));
    assert_eq!(cfg.drop_probability(15.0), 1.0);
    assert_eq!(cfg.drop_probability(20.0), 1.0);
}

#[test]
fn drop_probability_is_monotone_and_bounded() {
    for gentle in [true, false] {
        let cfg = RedConfig {
            gentle,
            max_p: 0.1,
            ..RedConfig::default()
        };
        let mut prev = 0.0;
        for i in 0..=4000 {
            let avg = i as f64 * 0.01;
            let p = cfg.drop_probability(avg);
            assert!((0.0..=1.0).contains(&p), "p={p} at avg={avg}");
            assert!(p >= prev, "p decreased at avg={avg}");
            prev = p;
        }
    }
}

#[test]
fn count_correction_spreads_drops() {
    let cfg = RedConfig::default();
    assert!(approx(cfg.count_corrected(0.1, 0), 0.1));
    assert!(approx(cfg.count_corrected(0.1, 5), 0.2));
    assert_eq!(cfg.count_corrected(0.1, 10), 1.0);
    assert_eq!(cfg.count_corrected(0.1, 50), 1.0);
    assert_eq!(cfg.count_corrected(0.0, 1_000), 0.0);

    let mut prev = 0.0;
    for count in 0..20 {
        let p = cfg.count_corrected(0.07, count);
        assert!(p >= prev && p <= 1.0);
        prev = p;
    }
}

#[test]
fn wait_count_correction_holds_off_early_drops() {
    let cfg = RedConfig {
        wait: true,
        ..RedConfig::default()
    };
    assert_eq!(cfg.count_corrected(0.1, 0), 0.0);
    assert_eq!(cfg.count_corrected(0.1, 5), 0.0);
    assert!(approx(cfg.count_corrected(0.1, 15), 0.2));
    assert_eq!(cfg.count_corrected(0.1, 25), 1.0);
}

#[test]
fn invalid_configurations_are_rejected() {
    let bad = [
        RedConfig {
            min_th: 15.0,
            max_th: 15.0,
            ..RedConfig::default()
        },
        RedConfig {
            min_th: -1.0,
            ..RedConfig::default()
        },
        RedConfig {
            weight: 0.0,
            ..RedConfig::default()
        },
        RedConfig {
            weight: 1.5,
            ..RedConfig::default()
        },
        RedConfig {
            max_p: 1.01,
            ..RedConfig::default()
        },
        RedConfig {
            queue_limit: 0,
            ..RedConfig::default()
        },
        RedConfig {
            max_th: f64::NAN,
            ..RedConfig::default()
        },
        RedConfig {
            link_bandwidth_bps: Some(0),
            ..RedConfig::default()
        },
    ];
    for cfg in bad {
        let err = RedQueue::new(cfg.clone()).expect_err("invalid config accepted");
        assert!(matches!(err, Error::InvalidConfiguration(_)), "{cfg:?}: {err}");
    }
    assert!(RedQueue::new(RedConfig::default()).is_ok());
}

#[test]
fn ewma_tracks_queue_length_on_arrivals() {
    let mut q = RedQueue::new(RedConfig {
        weight: 0.5,
        ..instant(100.0, 200.0, 0.02)
    })
    .expect("valid");
    let now = SimTime::ZERO;

    q.enqueue(pkt(1, 500), now).expect("accept");
    assert_eq!(q.avg_queue(), 0.0);
    q.enqueue(pkt(2, 500), now).expect("accept");
    assert!(approx(q.avg_queue(), 0.5));
    q.enqueue(pkt(3, 500), now).expect("accept");
    assert!(approx(q.avg_queue(), 1.25));
    assert_eq!(q.state().len_pkts, 3);
}

#[test]
fn weight_one_makes_average_equal_instantaneous_size() {
    let mut q = RedQueue::new(instant(50.0, 60.0, 0.02)).expect("valid");
    for i in 0..10 {
        q.enqueue(pkt(i, 958), SimTime::ZERO).expect("accept");
    }
    assert_eq!(q.avg_queue(), 9.0);
    assert_eq!(q.current_size(), 10);
}

#[test]
fn idle_period_decays_the_average() {
    // 8000 bit/s、平均包长 100 B：每秒 10 个典型包
    let mut q = RedQueue::new(RedConfig {
        weight: 0.5,
        mean_pkt_size: 100,
        link_bandwidth_bps: Some(8_000),
        ..instant(100.0, 200.0, 0.02)
    })
    .expect("valid");

    for i in 0..3 {
        q.enqueue(pkt(i, 100), SimTime::ZERO).expect("accept");
    }
    assert!(approx(q.avg_queue(), 1.25));
    assert!(!q.is_idle());

    let t1 = SimTime::from_secs(1);
    while q.dequeue(t1).is_some() {}
    assert!(q.is_idle());
    assert_eq!(q.state().idle_since, Some(t1));

    // 空闲 0.25 s => m = floor(2.5) = 2，衰减 (1-w)^(m+1)
    q.enqueue(pkt(9, 100), SimTime::from_millis(1250)).expect("accept");
    assert!(approx(q.avg_queue(), 1.25 * 0.125));
    assert!(!q.is_idle());
}

#[test]
fn idle_decay_without_link_bandwidth_is_a_single_step() {
    let mut q = RedQueue::new(RedConfig {
        weight: 0.5,
        link_bandwidth_bps: None,
        ..instant(100.0, 200.0, 0.02)
    })
    .expect("valid");
    for i in 0..3 {
        q.enqueue(pkt(i, 100), SimTime::ZERO).expect("accept");
    }
    while q.dequeue(SimTime::from_secs(1)).is_some() {}
    q.enqueue(pkt(9, 100), SimTime::from_secs(100)).expect("accept");
    assert!(approx(q.avg_queue(), 0.625));
}

#[test]
fn hard_limit_drops_without_touching_the_count() {
    let mut q = RedQueue::new(RedConfig {
        queue_limit: 4,
        ..instant(1.0, 100.0, 0.0)
    })
    .expect("valid");

    for i in 0..4 {
        q.enqueue(pkt(i, 958), SimTime::ZERO).expect("accept");
    }
    assert_eq!(q.state().count_since_drop, 3);

    let rejected = q.enqueue(pkt(4, 958), SimTime::ZERO).expect_err("over limit");
    assert_eq!(rejected.reason, DropReason::QueueLimit);
    assert_eq!(rejected.pkt.id, 4);
    assert_eq!(q.state().count_since_drop, 3);
    assert_eq!(q.len(), 4);
    assert_eq!(q.stats().limit_drops, 1);
    assert_eq!(q.stats().drops(), 1);
}

#[test]
fn queue_never_exceeds_limit_in_bytes_mode() {
    let mut q = RedQueue::new(RedConfig {
        mode: QueueMode::Bytes,
        queue_limit: 2_500,
        ..instant(10_000.0, 20_000.0, 0.0)
    })
    .expect("valid");

    let mut accepted = 0;
    for i in 0..10 {
        if q.enqueue(pkt(i, 1_000), SimTime::ZERO).is_ok() {
            accepted += 1;
        }
        assert!(q.current_size() <= 2_500);
    }
    assert_eq!(accepted, 2);
    assert_eq!(q.bytes(), 2_000);
    assert_eq!(q.stats().limit_drops, 8);
}

#[test]
fn average_below_min_th_accepts_and_resets_count() {
    let mut q = RedQueue::new(instant(5.0, 15.0, 1.0)).expect("valid");
    for i in 0..5 {
        q.enqueue(pkt(i, 958), SimTime::ZERO).expect("below min_th");
        assert_eq!(q.state().count_since_drop, 0);
    }
    assert_eq!(q.stats().drops(), 0);
}

#[test]
fn zero_min_th_puts_every_arrival_in_the_probabilistic_region() {
    let mut q = RedQueue::new(instant(0.0, 10.0, 0.0)).expect("valid");
    q.enqueue(pkt(1, 958), SimTime::ZERO).expect("p is zero");
    assert_eq!(q.state().count_since_drop, 1);
}

#[test]
fn gentle_ramp_uses_early_drops_and_plain_red_forces() {
    for (gentle, reason) in [(true, DropReason::Early), (false, DropReason::Forced)] {
        let mut q = RedQueue::new(RedConfig {
            gentle,
            ..instant(1.0, 2.0, 1.0)
        })
        .expect("valid");

        q.enqueue(pkt(1, 958), SimTime::ZERO).expect("avg 0");
        q.enqueue(pkt(2, 958), SimTime::ZERO).expect("avg == min_th");
        assert_eq!(q.state().count_since_drop, 1);

        for i in 3..6 {
            let rejected = q.enqueue(pkt(i, 958), SimTime::ZERO).expect_err("avg >= max_th");
            assert_eq!(rejected.reason, reason);
            assert_eq!(q.state().count_since_drop, 0);
        }
        assert_eq!(q.len(), 2);
    }
}

#[test]
fn gentle_forces_drops_at_twice_max_th() {
    let mut q = RedQueue::new(RedConfig {
        mode: QueueMode::Bytes,
        queue_limit: 100_000,
        ..instant(1_000.0, 2_000.0, 0.0)
    })
    .expect("valid");

    q.enqueue(pkt(1, 4_000), SimTime::ZERO).expect("avg 0");
    let rejected = q.enqueue(pkt(2, 4_000), SimTime::ZERO).expect_err("avg = 2*max_th");
    assert_eq!(rejected.reason, DropReason::Forced);
    assert_eq!(q.stats().forced_drops, 1);
}

/// 把队列灌到 `n` 个包（途中的随机丢包不计）
fn fill_to(q: &mut RedQueue, n: u64) {
    let mut id = 0;
    while q.current_size() < n {
        let _ = q.enqueue(pkt(id, 958), SimTime::ZERO);
        id += 1;
    }
}

/// 在固定队长 `n` 下反复到达：接受后立即出队一个，使 avg 始终等于 `n`。
/// 返回 (丢包率, 接受后 count 的增量是否总为 1, 早期丢包后 count 是否总为 0)。
fn drop_rate_at(cfg: RedConfig, n: u64, trials: u64) -> (f64, bool, bool) {
    let mut q = RedQueue::new(cfg).expect("valid");
    fill_to(&mut q, n);
    let (mut drops, mut counts_up, mut resets) = (0u64, true, true);
    for i in 0..trials {
        let before = q.state().count_since_drop;
        match q.enqueue(pkt(10_000 + i, 958), SimTime::ZERO) {
            Ok(()) => {
                counts_up &= q.state().count_since_drop == before + 1;
                q.dequeue(SimTime::ZERO).expect("non-empty");
            }
            Err(rejected) => {
                assert_eq!(rejected.reason, DropReason::Early);
                resets &= q.state().count_since_drop == 0;
                drops += 1;
            }
        }
        assert_eq!(q.current_size(), n);
    }
    (drops as f64 / trials as f64, counts_up, resets)
}

#[test]
fn linear_region_applies_count_correction() {
    // p_b = 0.01；count 修正后丢包间隔均匀分布，丢包率约 2p_b/(1+p_b)
    let cfg = instant(0.0, 10.0, 0.02);
    assert!(approx(cfg.drop_probability(5.0), 0.01));
    let (rate, counts_up, resets) = drop_rate_at(cfg, 5, 200_000);
    let expected = 2.0 * 0.01 / 1.01;
    assert!((rate - expected).abs() < 0.002, "rate {rate}, expected {expected}");
    assert!(counts_up);
    assert!(resets);
}

#[test]
fn gentle_ramp_drops_at_the_raw_probability() {
    let cfg = instant(1.0, 10.0, 0.1);
    assert!(approx(cfg.drop_probability(15.0), 0.55));
    let (rate, counts_up, resets) = drop_rate_at(cfg, 15, 100_000);
    assert!((rate - 0.55).abs() < 0.01, "rate {rate}");
    assert!(counts_up);
    assert!(resets);
}

#[test]
fn same_seed_gives_same_decisions() {
    let run = |seed: u64| {
        let mut q = RedQueue::new(RedConfig {
            seed,
            ..instant(1.0, 100.0, 0.5)
        })
        .expect("valid");
        (0..200)
            .map(|i| q.enqueue(pkt(i, 958), SimTime::ZERO).is_ok())
            .collect::<Vec<_>>()
    };
    let a = run(7);
    assert_eq!(a, run(7));
    assert!(a.iter().any(|ok| !ok));
}

#[test]
fn size_accounting_matches_queued_packets() {
    let mut q = RedQueue::new(instant(100.0, 200.0, 0.02)).expect("valid");
    let sizes = [100u32, 958, 40, 1500, 700];
    for (i, s) in sizes.iter().enumerate() {
        q.enqueue(pkt(i as u64, *s), SimTime::ZERO).expect("accept");
    }
    q.dequeue(SimTime(1)).expect("non-empty");
    q.dequeue(SimTime(2)).expect("non-empty");

    let st = q.state();
    assert_eq!(st.len_pkts, 3);
    assert_eq!(st.len_bytes, 40 + 1500 + 700);
    assert_eq!(q.len(), 3);
    assert_eq!(q.stats().enqueued, 5);
    assert_eq!(q.stats().dequeued, 2);
    assert_eq!(q.occupancy(), 3);
    assert_eq!(q.average(), Some(q.avg_queue()));
}

#[test]
fn red_config_deserializes_with_defaults() {
    let cfg: RedConfig =
        serde_json::from_str(r#"{ "min_th": 15, "max_th": 140, "queue_limit": 1000, "mode": "bytes" }"#)
            .expect("parse");
    assert_eq!(cfg.min_th, 15.0);
    assert_eq!(cfg.max_th, 140.0);
    assert_eq!(cfg.queue_limit, 1000);
    assert_eq!(cfg.mode, QueueMode::Bytes);
    assert_eq!(cfg.weight, 0.002);
    assert!(cfg.gentle);
    assert!(!cfg.wait);
}
