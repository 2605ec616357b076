use crate::*;

#[derive(Debug, Layer)]
pub struct ARP {
    pub htype: u16,
    pub ptype: u16,
    pub hlen: u8,
    pub plen: u8,
    pub oper: u16,
    pub sender_hw: Vec<u8>,
    pub sender_proto: Vec<u8>,
    pub target_hw: Vec<u8>,
    pub target_proto: Vec<u8>,
}

impl ARP {
    pub fn try_new(data: &[u8]) -> Option<ARP> {
        let htype = read_u16(data, 0)?;
        let ptype = read_u16(data, 2)?;
        let hlen = *data.get(4)?;
        let plen = *data.get(5)?;
        let oper = read_u16(data, 6)?;
        let (h, p) = (hlen as usize, plen as usize);
        let (sender_hw, data) = split(data.get(8..)?, h)?;
        let (sender_proto, data) = split(data, p)?;
        let (target_hw, data) = split(data, h)?;
        let (target_proto, _) = split(data, p)?;
        Some(ARP {
            htype,
            ptype,
            hlen,
            plen,
            oper,
            sender_hw: sender_hw.to_vec(),
            sender_proto: sender_proto.to_vec(),
            target_hw: target_hw.to_vec(),
            target_proto: target_proto.to_vec(),
        })
    }
}

fn split(data: &[u8], i: usize) -> Option<(&[u8], &[u8])> {
    (i <= data.len()).then(|| data.split_at(i))
}
