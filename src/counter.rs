use std::collections::HashSet;
use std::net::Ipv4Addr;

use derivative::Derivative;
use tracing::trace;

use crate::classify::{Classify, IcmpFields, IpFlag, TcpFlags};
use crate::config::Period;
use crate::error::Result;
use crate::windows::WindowsExt;

/// Per-bucket IPv4 flag tally. A packet lands in at most one bucket.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpCount {
    pub mf: usize,
    pub df: usize,
    pub evil: usize,
}

impl IpCount {
    fn tally(&mut self, flag: IpFlag) {
        match flag {
            IpFlag::MoreFragments => self.mf += 1,
            IpFlag::DontFragment => self.df += 1,
            IpFlag::Evil => self.evil += 1,
        }
    }
}

/// Per-bit TCP flag tally. Bits are independent, one segment may bump several.
///
/// `ns` is kept for the table layout; the classifier does not expose the NS bit.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpCount {
    pub ns: usize,
    pub cwr: usize,
    pub ece: usize,
    pub urg: usize,
    pub ack: usize,
    pub psh: usize,
    pub rst: usize,
    pub syn: usize,
    pub fin: usize,
}

impl TcpCount {
    fn tally(&mut self, flags: TcpFlags) {
        if flags.cwr { self.cwr += 1 }
        if flags.ece { self.ece += 1 }
        if flags.urg { self.urg += 1 }
        if flags.ack { self.ack += 1 }
        if flags.psh { self.psh += 1 }
        if flags.rst { self.rst += 1 }
        if flags.syn { self.syn += 1 }
        if flags.fin { self.fin += 1 }
    }
}

/// Finalized statistics of one window `[start, start + period)`.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub start: f64,

    pub total: usize,
    pub echo_req: usize,
    pub echo_res: usize,

    pub ip: usize,
    pub ip_flags: IpCount,
    pub icmp: usize,
    pub tcp: usize,
    pub tcp_flags: TcpCount,
    pub udp: usize,
    pub arp: usize,
    pub http: usize,
    /// No SMTP dissector exists, this stays zero.
    pub smtp: usize,
    pub dhcp: usize,

    /// Distinct IPv4 addresses, source and destination.
    pub addresses: usize,
    /// Distinct TCP ports, source and destination.
    pub ports: usize,

    pub bytes: usize,
    pub data_bytes: usize,

    pub avg_size: f64,
    pub avg_deltas_size: f64,
    pub avg_time: f64,
    pub avg_deltas_time: f64,
}

impl Snapshot {
    /// The record of a window that saw no traffic: everything zero.
    pub fn empty(start: f64) -> Self {
        Snapshot { start, ..Default::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

fn _count_fmt<T>(
    set: &HashSet<T>,
    fmt: &mut std::fmt::Formatter,
) -> std::fmt::Result
{
    write!(fmt, "{}", set.len())
}

/// Mean and mean absolute deviation, both divided by `divisor`.
fn spread<I>(samples: I, divisor: usize) -> (f64, f64)
    where I: Iterator<Item=f64> + Clone
{
    let divisor = divisor as f64;
    let mean = samples.clone().sum::<f64>() / divisor;
    let deviation = samples
        .map(|s| (mean - s).abs())
        .sum::<f64>() / divisor;
    (mean, deviation)
}

/// Running totals of the window currently being filled.
#[derive(Default, Derivative)]
#[derivative(Debug)]
pub struct WindowCount {
    start: f64,

    total: usize,
    echo_req: usize,
    echo_res: usize,

    ip: usize,
    ip_flags: IpCount,
    icmp: usize,
    tcp: usize,
    tcp_flags: TcpCount,
    udp: usize,
    arp: usize,
    http: usize,
    dhcp: usize,

    #[derivative(Debug(format_with = "_count_fmt"))]
    addresses: HashSet<Ipv4Addr>,
    #[derivative(Debug(format_with = "_count_fmt"))]
    ports: HashSet<u16>,

    data_bytes: usize,

    #[derivative(Debug = "ignore")]
    sizes: Vec<usize>,
    #[derivative(Debug = "ignore")]
    intervals: Vec<f64>,
    last: Option<f64>,
}

impl WindowCount {
    pub fn new(start: f64) -> Self {
        WindowCount { start, ..Default::default() }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    /// Number of frames applied since the window opened.
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    pub fn apply(&mut self, frame: &impl Classify) {
        self.total += 1;

        self.sizes.push(frame.length());
        if let Some(ts) = frame.timestamp() {
            if let Some(last) = self.last {
                self.intervals.push(ts - last);
            }
            self.last = Some(ts);
        }

        if let Some(ip) = frame.ipv4() {
            self.ip += 1;
            if let Some(flag) = ip.flags.class() {
                self.ip_flags.tally(flag);
            }
            self.addresses.insert(ip.src);
            self.addresses.insert(ip.dst);
        }
        if let Some(icmp) = frame.icmp() {
            self.icmp += 1;
            match icmp.kind {
                IcmpFields::ECHO_REQUEST => self.echo_req += 1,
                IcmpFields::ECHO_REPLY => self.echo_res += 1,
                _ => {}
            }
        }
        if let Some(tcp) = frame.tcp() {
            self.tcp += 1;
            self.tcp_flags.tally(tcp.flags);
            self.ports.insert(tcp.src);
            self.ports.insert(tcp.dst);
            self.data_bytes += tcp.payload_len;
        }
        if let Some(udp) = frame.udp() {
            self.udp += 1;
            self.data_bytes += udp.payload_len;
        }
        if frame.has_arp() {
            self.arp += 1;
        }
        if frame.has_http() {
            self.http += 1;
        }
        if frame.has_dhcp() {
            self.dhcp += 1;
        }
        trace!(total = self.total, len = frame.length(), "frame applied");
    }

    /// Finalizes the window and leaves `self` empty, ready for reuse.
    pub fn flush(&mut self) -> Snapshot {
        std::mem::take(self).finish()
    }

    fn finish(self) -> Snapshot {
        if self.sizes.is_empty() {
            return Snapshot::empty(self.start);
        }

        let bytes = self.sizes.iter().sum();
        let (avg_size, avg_deltas_size) = spread(
            self.sizes.iter().map(|&s| s as f64),
            self.sizes.len(),
        );
        let (avg_time, avg_deltas_time) = spread(
            self.intervals.iter().copied(),
            self.intervals.len().max(1),
        );

        Snapshot {
            start: self.start,
            total: self.total,
            echo_req: self.echo_req,
            echo_res: self.echo_res,
            ip: self.ip,
            ip_flags: self.ip_flags,
            icmp: self.icmp,
            tcp: self.tcp,
            tcp_flags: self.tcp_flags,
            udp: self.udp,
            arp: self.arp,
            http: self.http,
            smtp: 0,
            dhcp: self.dhcp,
            addresses: self.addresses.len(),
            ports: self.ports.len(),
            bytes,
            data_bytes: self.data_bytes,
            avg_size,
            avg_deltas_size,
            avg_time,
            avg_deltas_time,
        }
    }

    /// Runs `frames` through a fresh driver and collects every window.
    pub fn compute<I>(frames: I, period: Period) -> Result<Vec<Snapshot>>
        where I: IntoIterator, I::Item: Classify
    {
        frames.into_iter().traffic_windows(period).collect()
    }
}
