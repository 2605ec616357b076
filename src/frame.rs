use byteorder::{ByteOrder, NetworkEndian};
use derivative::Derivative;
use pcap_parser::{EnhancedPacketBlock, LegacyPcapBlock, Linktype};
use pcap_parser::traits::PcapNGPacketBlock;

use crate::*;

pub mod arp;
pub mod dhcp;
pub mod ethernet;
pub mod http;
pub mod icmp;
pub mod ip;
pub mod tcp;
pub mod udp;

pub use arp::ARP;
pub use dhcp::DHCP;
pub use ethernet::Ethernet;
pub use http::{HTTPKind, HTTP};
pub use icmp::{Echo, EchoData, ICMP};
pub use ip::IPv4;
pub use tcp::TCP;
pub use udp::UDP;

/// Copies `N` bytes starting at `at`, `None` when the slice is too short.
pub fn array<const N: usize>(data: &[u8], at: usize) -> Option<[u8; N]> {
    data.get(at..at.checked_add(N)?)?.try_into().ok()
}

pub fn read_u16(data: &[u8], at: usize) -> Option<u16> {
    array::<2>(data, at).map(|b| NetworkEndian::read_u16(&b))
}

pub fn read_u32(data: &[u8], at: usize) -> Option<u32> {
    array::<4>(data, at).map(|b| NetworkEndian::read_u32(&b))
}

/// One captured frame and whatever could be dissected out of it.
#[derive(Layer, Derivative)]
#[derivative(Debug)]
#[layers(Ethernet, IPv4)]
pub struct Frame {
    pub ts: Option<f64>,
    pub caplen: u32,
    pub origlen: u32,
    #[derivative(Debug = "ignore")]
    pub data: Vec<u8>,

    layers: Layers,
}

impl Frame {
    pub fn new(
        data: &[u8],
        ts: Option<f64>,
        caplen: u32, origlen: u32,
        link_type: Linktype,
    ) -> Frame
    {
        let mut layers = Layers::default();
        match link_type {
            Linktype::ETHERNET => {
                if let Some(ethernet) = Ethernet::try_new(data) {
                    layers.insert(ethernet);
                }
            }
            Linktype::RAW | Linktype::IPV4 => {
                if let Some(ip) = IPv4::try_new(data) {
                    layers.insert(ip);
                }
            }
            _ => {}
        }
        Frame { ts, caplen, origlen, data: data.to_vec(), layers }
    }

    /// `ts_unit` is 1e-6 for microsecond captures, 1e-9 for nanosecond ones.
    pub fn from_legacy(block: &LegacyPcapBlock, link_type: Linktype, ts_unit: f64) -> Frame {
        let ts = block.ts_sec as f64 + block.ts_usec as f64 * ts_unit;
        Self::new(block.data, Some(ts), block.caplen, block.origlen, link_type)
    }

    /// `resolution` is in ticks per second.
    pub fn from_enhanced(
        block: &EnhancedPacketBlock,
        link_type: Linktype,
        ts_offset: u64,
        resolution: u64,
    ) -> Frame
    {
        Self::new(
            block.packet_data(),
            Some(block.decode_ts_f64(ts_offset, resolution)),
            block.caplen, block.orig_len(),
            link_type,
        )
    }
}

impl Classify for Frame {
    fn timestamp(&self) -> Option<f64> {
        self.ts
    }

    fn length(&self) -> usize {
        self.data.len()
    }

    fn ipv4(&self) -> Option<Ipv4Fields> {
        self.get_layer::<IPv4>().map(|ip| Ipv4Fields {
            src: ip.src.into(),
            dst: ip.dst.into(),
            flags: ip.flags,
        })
    }

    fn icmp(&self) -> Option<IcmpFields> {
        self.get_layer::<ICMP>().map(|icmp| IcmpFields { kind: icmp.kind, code: icmp.code })
    }

    fn tcp(&self) -> Option<TcpFields> {
        self.get_layer::<TCP>().map(|tcp| TcpFields {
            src: tcp.src,
            dst: tcp.dst,
            flags: tcp.flags,
            payload_len: tcp.data.len(),
        })
    }

    fn udp(&self) -> Option<UdpFields> {
        self.get_layer::<UDP>().map(|udp| UdpFields {
            src: udp.src,
            dst: udp.dst,
            payload_len: udp.payload.len(),
        })
    }

    fn has_arp(&self) -> bool {
        self.get_layer::<ARP>().is_some()
    }

    fn has_http(&self) -> bool {
        self.get_layer::<HTTP>().is_some()
    }

    fn has_dhcp(&self) -> bool {
        self.get_layer::<DHCP>().is_some()
    }
}
