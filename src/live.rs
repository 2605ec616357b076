//! Live interface capture, in wall-clock batches.

use std::time::Duration;

use chrono::Local;
use pcap::{Active, Capture, Device, Packet, PacketCodec, PacketIter};
use pcap_parser::Linktype;
use tracing::{debug, info};

use crate::{Error, Frame, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct PacketOwned {
    /// Capture time in seconds.
    pub ts: f64,
    pub caplen: u32,
    pub len: u32,
    pub data: Box<[u8]>,
}

/// Copies every [`pcap::Packet`] out of the capture buffer.
pub struct Codec;

impl PacketCodec for Codec {
    type Item = PacketOwned;

    fn decode(&mut self, packet: Packet) -> Self::Item {
        let hdr = packet.header;
        PacketOwned {
            ts: hdr.ts.tv_sec as f64 + hdr.ts.tv_usec as f64 * 1e-6,
            caplen: hdr.caplen,
            len: hdr.len,
            data: packet.data.into(),
        }
    }
}

impl Frame {
    pub fn from_packet(pkt: &PacketOwned, link_type: Linktype) -> Frame {
        Frame::new(&pkt.data, Some(pkt.ts), pkt.caplen, pkt.len, link_type)
    }
}

/// First device whose name or description contains `pattern`.
pub fn find_device(pattern: &str) -> Result<Device> {
    Device::list()?
        .into_iter()
        .find(|d| {
            d.name.contains(pattern)
                || d.desc.as_deref().map_or(false, |desc| desc.contains(pattern))
        })
        .ok_or_else(|| Error::Config(format!("no capture device matches `{}`", pattern)))
}

/// How long to wait when the capture buffer is momentarily empty.
const IDLE: Duration = Duration::from_millis(50);

pub struct Live {
    packets: PacketIter<Active, Codec>,
    link_type: Linktype,
}

impl Live {
    pub fn open(device: Device, filter: Option<&str>) -> Result<Self> {
        info!(device = %device.name, "opening capture");
        let mut capture: Capture<Active> = Capture::from_device(device)?
            .immediate_mode(true)
            .open()?
            .setnonblock()?;
        if let Some(program) = filter {
            capture.filter(program, true)?;
        }
        let link_type = Linktype(capture.get_datalink().0);
        Ok(Self { packets: capture.iter(Codec), link_type })
    }

    pub fn link_type(&self) -> Linktype {
        self.link_type
    }

    /// Collects whatever arrives during `length`, decoded into frames.
    pub fn batch(&mut self, length: chrono::Duration) -> Result<Vec<Frame>> {
        let start = Local::now();
        let mut frames = vec![];
        while Local::now() - start < length {
            match self.packets.next() {
                Some(Ok(pkt)) => frames.push(Frame::from_packet(&pkt, self.link_type)),
                Some(Err(pcap::Error::TimeoutExpired | pcap::Error::NoMorePackets)) | None => {
                    std::thread::sleep(IDLE);
                }
                Some(Err(e)) => return Err(e.into()),
            }
        }
        debug!(frames = frames.len(), "batch collected");
        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use crate::classify::Classify;
    use crate::iter::tests::dns_packet;

    use super::*;

    #[test]
    fn owned_packet_to_frame() {
        let data = dns_packet();
        let pkt = PacketOwned {
            ts: 12.5,
            caplen: data.len() as u32,
            len: data.len() as u32,
            data: data.clone().into(),
        };
        let frame = Frame::from_packet(&pkt, Linktype::ETHERNET);
        assert_eq!(frame.timestamp(), Some(12.5));
        assert_eq!(frame.length(), data.len());
        assert!(frame.has_udp());
    }
}
