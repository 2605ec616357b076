use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use pcap_windows::export::write_csv;
use pcap_windows::*;

fn period(secs: f64) -> Period {
    Period::new(secs).unwrap()
}

/// Random but reproducible traffic: bursts, quiet spells and a protocol mix.
fn traffic(seed: u64, count: usize) -> Vec<FrameRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut ts = 1_650_000_000.0;
    (0..count)
        .map(|_| {
            ts += if rng.gen_bool(0.05) {
                rng.gen_range(5.0..40.0)
            } else {
                rng.gen_range(0.0..0.8)
            };
            let len = rng.gen_range(42..1514);
            let frame = FrameRecord::new(ts, len);
            match rng.gen_range(0..5) {
                0 => frame.with_arp(),
                1 => frame
                    .with_ipv4([10, 0, 0, rng.gen()], [10, 0, 1, rng.gen()], IpFlags::from_word(rng.gen()))
                    .with_tcp(rng.gen_range(1024..1040), 80, TcpFlags::from_bits(rng.gen()), len / 2),
                2 => frame
                    .with_ipv4([10, 0, 0, 1], [10, 0, 0, 53], IpFlags::default())
                    .with_udp(5353, 53, len / 3),
                3 => frame
                    .with_ipv4([192, 168, 1, 1], [192, 168, 1, rng.gen()], IpFlags::from_word(IpFlags::DF))
                    .with_icmp(rng.gen_range(0..10), 0),
                _ => frame,
            }
        })
        .collect()
}

#[test]
fn syn_ack_counts_once_per_protocol() {
    let frame = FrameRecord::new(0.0, 60)
        .with_ipv4([10, 0, 0, 1], [10, 0, 0, 2], IpFlags::from_word(IpFlags::DF))
        .with_tcp(443, 50000, TcpFlags { syn: true, ack: true, ..Default::default() }, 0);
    let snapshots = WindowCount::compute([frame], period(3.0)).unwrap();
    let s = &snapshots[0];
    assert_eq!((s.total, s.ip, s.tcp), (1, 1, 1));
    assert_eq!((s.tcp_flags.syn, s.tcp_flags.ack, s.tcp_flags.fin), (1, 1, 0));
    assert_eq!(s.ip_flags, IpCount { mf: 0, df: 1, evil: 0 });
    assert_eq!((s.addresses, s.ports), (2, 2));
}

#[test]
fn single_frame_window() {
    let snapshots = WindowCount::compute([FrameRecord::new(4.0, 98)], period(3.0)).unwrap();
    assert_eq!(snapshots.len(), 1);
    let s = &snapshots[0];
    assert_eq!(s.start, 4.0);
    assert_eq!(s.bytes, 98);
    assert_eq!(s.avg_size, 98.0);
    assert_eq!(s.avg_deltas_size, 0.0);
    assert_eq!(s.avg_time, 0.0);
    assert_eq!(s.avg_deltas_time, 0.0);
}

#[test]
fn gap_windows_follow_the_closed_one() {
    let frames = [FrameRecord::new(0.0, 10), FrameRecord::new(17.0, 20)];
    let snapshots = WindowCount::compute(frames, period(5.0)).unwrap();
    let starts = snapshots.iter().map(|s| s.start).collect::<Vec<_>>();
    assert_eq!(starts, vec![0.0, 5.0, 10.0, 17.0]);
    assert!(snapshots[1].is_empty() && snapshots[2].is_empty());
    assert_eq!(snapshots[3].bytes, 20);
}

#[test]
fn empty_windows_are_all_zero() {
    let snapshots = WindowCount::compute(traffic(7, 2000), period(3.0)).unwrap();
    let empty = snapshots.iter().filter(|s| s.is_empty()).collect::<Vec<_>>();
    assert!(!empty.is_empty());
    for s in empty {
        assert_eq!(s, &Snapshot::empty(s.start));
        assert!(s.as_row()[1..].iter().all(|&v| v == 0.0));
    }
}

#[test]
fn nothing_is_lost_or_counted_twice() {
    let frames = traffic(11, 3000);
    let snapshots = WindowCount::compute(frames.clone(), period(2.5)).unwrap();

    let total: usize = snapshots.iter().map(|s| s.total).sum();
    let bytes: usize = snapshots.iter().map(|s| s.bytes).sum();
    assert_eq!(total, frames.len());
    assert_eq!(bytes, frames.iter().map(|f| f.len).sum::<usize>());

    let tcp: usize = snapshots.iter().map(|s| s.tcp).sum();
    assert_eq!(tcp, frames.iter().filter(|f| f.tcp.is_some()).count());

    for s in &snapshots {
        assert!(s.as_row().iter().all(|v| v.is_finite()));
        assert_eq!(s.tcp_flags.ns, 0);
        assert_eq!(s.smtp, 0);
    }
}

#[test]
fn windows_are_ordered_and_gaps_step_by_period() {
    let p = 3.0;
    let snapshots = WindowCount::compute(traffic(23, 1500), period(p)).unwrap();
    for pair in snapshots.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.is_empty() {
            assert_eq!(next.start, prev.start + p);
        } else {
            assert!(next.start > prev.start);
        }
    }
}

#[test]
fn reruns_are_identical() {
    let frames = traffic(42, 1000);
    let first = WindowCount::compute(frames.clone(), period(3.0)).unwrap();
    let second = WindowCount::compute(frames, period(3.0)).unwrap();
    assert_eq!(first, second);

    let (mut a, mut b) = (Vec::new(), Vec::new());
    write_csv(&mut a, &first).unwrap();
    write_csv(&mut b, &second).unwrap();
    assert_eq!(a, b);
}

#[test]
fn invalid_frames_do_not_disturb_windows() {
    let mut frames = traffic(5, 200);
    let clean = WindowCount::compute(frames.clone(), period(3.0)).unwrap();

    frames.insert(50, FrameRecord { ts: None, ..FrameRecord::new(0.0, 1) });
    frames.insert(120, FrameRecord::new(0.0, 1));
    let mut rejected = 0;
    let mut snapshots = vec![];
    for item in windows(frames, period(3.0)) {
        match item {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(e) => {
                assert!(e.is_invalid_frame());
                rejected += 1;
            }
        }
    }
    assert_eq!(rejected, 2);
    assert_eq!(snapshots, clean);
}
