use proptest::prelude::*;

use pcap_windows::*;

fn frame() -> impl Strategy<Value=(f64, FrameRecord)> {
    (
        0.0..20.0f64,
        20usize..1600,
        prop::option::of((any::<[u8; 4]>(), any::<[u8; 4]>(), any::<u16>())),
        prop::option::of((any::<u16>(), any::<u16>(), any::<u8>())),
        prop::option::of(any::<u8>()),
        any::<bool>(),
    )
        .prop_map(|(delta, len, ip, tcp, icmp, udp)| {
            let mut frame = FrameRecord::new(0.0, len);
            if let Some((src, dst, word)) = ip {
                frame = frame.with_ipv4(src, dst, IpFlags::from_word(word));
                if let Some((sport, dport, bits)) = tcp {
                    frame = frame.with_tcp(sport, dport, TcpFlags::from_bits(bits), len / 2);
                } else if udp {
                    frame = frame.with_udp(68, 67, len / 4);
                } else if let Some(kind) = icmp {
                    frame = frame.with_icmp(kind, 0);
                }
            }
            (delta, frame)
        })
}

/// Frames with non-decreasing timestamps, built from random gaps.
fn stream() -> impl Strategy<Value=Vec<FrameRecord>> {
    prop::collection::vec(frame(), 0..200).prop_map(|frames| {
        let mut ts = 0.0;
        frames
            .into_iter()
            .map(|(delta, frame)| {
                ts += delta;
                FrameRecord { ts: Some(ts), ..frame }
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn counts_stay_within_their_parents(frames in stream(), p in 0.5..10.0f64) {
        let snapshots = WindowCount::compute(frames, Period::new(p).unwrap()).unwrap();
        for s in &snapshots {
            prop_assert!(s.addresses <= 2 * s.ip);
            prop_assert!(s.ports <= 2 * s.tcp);
            prop_assert!(s.ip_flags.mf + s.ip_flags.df + s.ip_flags.evil <= s.ip);
            for bit in [s.tcp_flags.fin, s.tcp_flags.syn, s.tcp_flags.rst, s.tcp_flags.psh,
                        s.tcp_flags.ack, s.tcp_flags.urg, s.tcp_flags.ece, s.tcp_flags.cwr] {
                prop_assert!(bit <= s.tcp);
            }
            prop_assert!(s.echo_req + s.echo_res <= s.icmp);
            prop_assert!(s.ip + s.arp <= s.total);
            prop_assert!(s.as_row().iter().all(|v| v.is_finite() && *v >= 0.0));
        }
    }

    #[test]
    fn every_frame_lands_in_exactly_one_window(frames in stream(), p in 0.5..10.0f64) {
        let snapshots = WindowCount::compute(frames.clone(), Period::new(p).unwrap()).unwrap();
        prop_assert_eq!(snapshots.iter().map(|s| s.total).sum::<usize>(), frames.len());
        prop_assert_eq!(
            snapshots.iter().map(|s| s.bytes).sum::<usize>(),
            frames.iter().map(|f| f.len).sum::<usize>()
        );
        prop_assert_eq!(snapshots.is_empty(), frames.is_empty());
        if let (Some(first), Some(last)) = (snapshots.first(), snapshots.last()) {
            prop_assert!(!first.is_empty());
            prop_assert!(!last.is_empty());
        }
    }

    #[test]
    fn windows_match_a_by_hand_split(frames in stream(), p in 0.5..10.0f64) {
        let snapshots = WindowCount::compute(frames.clone(), Period::new(p).unwrap()).unwrap();
        let busy = snapshots.iter().filter(|s| !s.is_empty()).collect::<Vec<_>>();

        // group by the same boundary-inclusive rule, ignoring gaps
        let mut groups: Vec<(f64, Vec<usize>)> = vec![];
        for f in &frames {
            let ts = f.ts.unwrap();
            match groups.last_mut() {
                Some((start, lens)) if ts - *start <= p => lens.push(f.len),
                _ => groups.push((ts, vec![f.len])),
            }
        }
        prop_assert_eq!(busy.len(), groups.len());
        for (s, (start, lens)) in busy.iter().zip(&groups) {
            prop_assert_eq!(s.start, *start);
            prop_assert_eq!(s.total, lens.len());
            prop_assert_eq!(s.bytes, lens.iter().sum::<usize>());
        }
    }

    #[test]
    fn gaps_are_empty_and_spaced_by_the_period(frames in stream(), p in 0.5..10.0f64) {
        let snapshots = WindowCount::compute(frames, Period::new(p).unwrap()).unwrap();
        for pair in snapshots.windows(2) {
            if pair[1].is_empty() {
                prop_assert_eq!(&pair[1], &Snapshot::empty(pair[0].start + p));
            }
        }
    }
}
