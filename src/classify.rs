//! The classifier capability consumed by the windowing core.
//!
//! The core never looks at how a frame is represented: it only asks for the
//! capture timestamp, the length, and whether each protocol layer is present
//! together with the handful of typed fields the counters need.

use std::net::Ipv4Addr;

/// IPv4 header flag bits.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpFlags {
    /// Reserved bit, RFC 3514 "evil".
    pub evil: bool,
    pub df: bool,
    pub mf: bool,
}

/// The single bucket an IPv4 packet is tallied under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpFlag {
    MoreFragments,
    DontFragment,
    Evil,
}

impl IpFlags {
    pub const EVIL: u16 = 0x8000;
    pub const DF: u16 = 0x4000;
    pub const MF: u16 = 0x2000;

    /// Reads the flags from the 16-bit flags/fragment-offset word.
    pub fn from_word(word: u16) -> Self {
        IpFlags {
            evil: word & Self::EVIL > 0,
            df: word & Self::DF > 0,
            mf: word & Self::MF > 0,
        }
    }

    /// Exactly one set bit names the bucket; no bits or a combination of bits
    /// names none.
    pub fn class(&self) -> Option<IpFlag> {
        match (self.mf, self.df, self.evil) {
            (true, false, false) => Some(IpFlag::MoreFragments),
            (false, true, false) => Some(IpFlag::DontFragment),
            (false, false, true) => Some(IpFlag::Evil),
            _ => None,
        }
    }
}

/// TCP control bits carried in the low byte of the flags word.
///
/// NS lives in the data-offset byte and is not exposed here.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpFlags {
    pub cwr: bool,
    pub ece: bool,
    pub urg: bool,
    pub ack: bool,
    pub psh: bool,
    pub rst: bool,
    pub syn: bool,
    pub fin: bool,
}

impl TcpFlags {
    pub fn from_bits(bits: u8) -> Self {
        TcpFlags {
            cwr: bits & 0b1000_0000 > 0,
            ece: bits & 0b0100_0000 > 0,
            urg: bits & 0b0010_0000 > 0,
            ack: bits & 0b0001_0000 > 0,
            psh: bits & 0b0000_1000 > 0,
            rst: bits & 0b0000_0100 > 0,
            syn: bits & 0b0000_0010 > 0,
            fin: bits & 0b0000_0001 > 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Fields {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub flags: IpFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpFields {
    pub kind: u8,
    pub code: u8,
}

impl IcmpFields {
    pub const ECHO_REPLY: u8 = 0;
    pub const ECHO_REQUEST: u8 = 8;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpFields {
    pub src: u16,
    pub dst: u16,
    pub flags: TcpFlags,
    pub payload_len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpFields {
    pub src: u16,
    pub dst: u16,
    pub payload_len: usize,
}

/// Per-frame protocol queries answered by a packet decoder.
///
/// A missing layer is the normal "not present" answer, never an error.
pub trait Classify {
    /// Capture time in seconds. `None` when the source did not record one.
    fn timestamp(&self) -> Option<f64>;

    /// Captured length in bytes.
    fn length(&self) -> usize;

    fn ipv4(&self) -> Option<Ipv4Fields>;
    fn icmp(&self) -> Option<IcmpFields>;
    fn tcp(&self) -> Option<TcpFields>;
    fn udp(&self) -> Option<UdpFields>;

    fn has_arp(&self) -> bool;
    fn has_http(&self) -> bool;
    fn has_dhcp(&self) -> bool;

    fn has_ip(&self) -> bool {
        self.ipv4().is_some()
    }

    fn has_icmp(&self) -> bool {
        self.icmp().is_some()
    }

    fn has_tcp(&self) -> bool {
        self.tcp().is_some()
    }

    fn has_udp(&self) -> bool {
        self.udp().is_some()
    }
}

impl<T: Classify + ?Sized> Classify for &T {
    fn timestamp(&self) -> Option<f64> {
        (**self).timestamp()
    }
    fn length(&self) -> usize {
        (**self).length()
    }
    fn ipv4(&self) -> Option<Ipv4Fields> {
        (**self).ipv4()
    }
    fn icmp(&self) -> Option<IcmpFields> {
        (**self).icmp()
    }
    fn tcp(&self) -> Option<TcpFields> {
        (**self).tcp()
    }
    fn udp(&self) -> Option<UdpFields> {
        (**self).udp()
    }
    fn has_arp(&self) -> bool {
        (**self).has_arp()
    }
    fn has_http(&self) -> bool {
        (**self).has_http()
    }
    fn has_dhcp(&self) -> bool {
        (**self).has_dhcp()
    }
}

/// An already classified frame, for callers that run their own decoder.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct FrameRecord {
    pub ts: Option<f64>,
    pub len: usize,
    pub ipv4: Option<Ipv4Fields>,
    pub icmp: Option<IcmpFields>,
    pub tcp: Option<TcpFields>,
    pub udp: Option<UdpFields>,
    pub arp: bool,
    pub http: bool,
    pub dhcp: bool,
}

impl FrameRecord {
    pub fn new(ts: f64, len: usize) -> Self {
        FrameRecord { ts: Some(ts), len, ..Default::default() }
    }

    pub fn with_ipv4(mut self, src: [u8; 4], dst: [u8; 4], flags: IpFlags) -> Self {
        self.ipv4 = Some(Ipv4Fields { src: src.into(), dst: dst.into(), flags });
        self
    }

    pub fn with_icmp(mut self, kind: u8, code: u8) -> Self {
        self.icmp = Some(IcmpFields { kind, code });
        self
    }

    pub fn with_tcp(mut self, src: u16, dst: u16, flags: TcpFlags, payload_len: usize) -> Self {
        self.tcp = Some(TcpFields { src, dst, flags, payload_len });
        self
    }

    pub fn with_udp(mut self, src: u16, dst: u16, payload_len: usize) -> Self {
        self.udp = Some(UdpFields { src, dst, payload_len });
        self
    }

    pub fn with_arp(mut self) -> Self {
        self.arp = true;
        self
    }

    pub fn with_http(mut self) -> Self {
        self.http = true;
        self
    }

    pub fn with_dhcp(mut self) -> Self {
        self.dhcp = true;
        self
    }
}

impl Classify for FrameRecord {
    fn timestamp(&self) -> Option<f64> {
        self.ts
    }
    fn length(&self) -> usize {
        self.len
    }
    fn ipv4(&self) -> Option<Ipv4Fields> {
        self.ipv4
    }
    fn icmp(&self) -> Option<IcmpFields> {
        self.icmp
    }
    fn tcp(&self) -> Option<TcpFields> {
        self.tcp
    }
    fn udp(&self) -> Option<UdpFields> {
        self.udp
    }
    fn has_arp(&self) -> bool {
        self.arp
    }
    fn has_http(&self) -> bool {
        self.http
    }
    fn has_dhcp(&self) -> bool {
        self.dhcp
    }
}
