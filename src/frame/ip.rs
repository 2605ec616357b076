use crate::*;

#[derive(Layer, Debug)]
#[layers(TCP, UDP)]
pub struct IPv4 {
    // offset: 0
    pub ihl: u8,
    pub dscp: u8,
    pub ecn: u8,
    pub size: u16,
    // offset: 4
    pub id: u16,
    pub flags: IpFlags,
    pub fragments_offset: u16,
    // offset: 8
    pub ttl: u8,
    pub protocol: u8,
    pub checksum: u16,
    // offset: 12
    pub src: [u8; 4],
    // offset: 16
    pub dst: [u8; 4],
    // offset: 20
    pub options: Vec<u8>,
    layers: Layers,
}

impl IPv4 {
    pub const ICMP: u8 = 1;
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;

    pub fn try_new(data: &[u8]) -> Option<IPv4> {
        let first = *data.first()?;
        if first >> 4 != 4 {
            return None;
        }
        let ihl = first & 0x0F;
        let header_len = ihl as usize * 4;
        if header_len < 20 {
            return None;
        }
        let dscp = *data.get(1)?;
        let ecn = dscp & 0b000000_11;
        let dscp = dscp >> 2;
        let size = read_u16(data, 2)?;
        let id = read_u16(data, 4)?;
        let word = read_u16(data, 6)?;
        let flags = IpFlags::from_word(word);
        let fragments_offset = word & 0x1FFF;
        let ttl = *data.get(8)?;
        let protocol = *data.get(9)?;
        let checksum = read_u16(data, 10)?;
        let src = array(data, 12)?;
        let dst = array(data, 16)?;
        let options = data.get(20..header_len)?.to_vec();

        // link layer padding is not part of the datagram
        let end = (size as usize).min(data.len()).max(header_len);
        let payload = &data[header_len..end];

        let mut layers = Layers::default();
        // only the first fragment carries the transport header
        if fragments_offset == 0 {
            match protocol {
                Self::ICMP => {
                    if let Some(icmp) = ICMP::try_new(payload) {
                        layers.insert(icmp);
                    }
                }
                Self::TCP => {
                    if let Some(tcp) = TCP::try_new(payload) {
                        layers.insert(tcp);
                    }
                }
                Self::UDP => {
                    if let Some(udp) = UDP::try_new(payload) {
                        layers.insert(udp);
                    }
                }
                _ => {}
            }
        }
        Some(IPv4 {
            ihl,
            dscp,
            ecn,
            size,
            id,
            flags,
            fragments_offset,
            ttl,
            protocol,
            checksum,
            src,
            dst,
            options,
            layers,
        })
    }
}
