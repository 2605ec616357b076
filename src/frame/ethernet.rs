use std::fmt::Formatter;

use tracing::trace;

use crate::*;

#[derive(Layer)]
#[layers(IPv4)]
pub struct Ethernet {
    pub dst: [u8; 6],
    pub src: [u8; 6],
    pub eth_type: u16,
    /// 802.1Q VLAN id of the innermost tag.
    pub vlan: Option<u16>,
    layers: Layers,
}

impl std::fmt::Debug for Ethernet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let src = self.src.map(|b| format!("{:02X}", b)).join(":");
        let dst = self.dst.map(|b| format!("{:02X}", b)).join(":");
        write!(f, "Ethernet(Mac({}->{}) Type({:#06x}))", src, dst, self.eth_type)
    }
}

impl Ethernet {
    const IP4: u16 = 0x0800;
    const ARP: u16 = 0x0806;
    const IEEE_802_1Q: u16 = 0x8100;
    const IEEE_802_1AD: u16 = 0x88A8;

    pub fn try_new(data: &[u8]) -> Option<Ethernet> {
        let dst = array(data, 0)?;
        let src = array(data, 6)?;
        let mut eth_type = read_u16(data, 12)?;
        let mut offset = 14;
        let mut vlan = None;
        while matches!(eth_type, Self::IEEE_802_1Q | Self::IEEE_802_1AD) {
            vlan = Some(read_u16(data, offset)? & 0x0FFF);
            eth_type = read_u16(data, offset + 2)?;
            offset += 4;
        }
        let payload = data.get(offset..)?;

        let mut layers = Layers::default();
        match eth_type {
            Self::IP4 => {
                if let Some(ip) = IPv4::try_new(payload) {
                    layers.insert(ip);
                }
            }
            Self::ARP => {
                if let Some(arp) = ARP::try_new(payload) {
                    layers.insert(arp);
                }
            }
            _ => trace!("ether type {:#06x} not dissected", eth_type),
        }
        Some(Ethernet { dst, src, eth_type, vlan, layers })
    }
}
