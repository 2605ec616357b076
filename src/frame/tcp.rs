use derivative::Derivative;

use crate::*;

#[derive(Derivative, Layer)]
#[derivative(Debug)]
#[layers]
pub struct TCP {
    pub src: u16,
    pub dst: u16,
    pub sn: u32,
    pub ack_sn: u32,
    pub header_len: u8,
    /// ECN nonce, outside the control-bit byte.
    pub ns: bool,
    pub flags: TcpFlags,
    pub window_size: u16,
    pub checksum: u16,
    pub urgent_point: u16,
    pub options: Vec<u8>,
    #[derivative(Debug = "ignore")]
    pub data: Vec<u8>,
    layers: Layers,
}

impl TCP {
    pub fn try_new(data: &[u8]) -> Option<TCP> {
        let src = read_u16(data, 0)?;
        let dst = read_u16(data, 2)?;
        let sn = read_u32(data, 4)?;
        let ack_sn = read_u32(data, 8)?;
        let offset = *data.get(12)?;
        let header_len = (offset & 0b11110000) >> 4;
        if header_len < 5 {
            return None;
        }
        let ns = offset & 0b0000_0001 > 0;
        let flags = TcpFlags::from_bits(*data.get(13)?);
        let window_size = read_u16(data, 14)?;
        let checksum = read_u16(data, 16)?;
        let urgent_point = read_u16(data, 18)?;
        let options = data.get(20..(header_len as usize * 4))?.to_vec();
        let data = data.get((header_len as usize * 4)..)?.to_vec();

        let mut layers = Layers::default();
        if let Some(http) = HTTP::try_make(&data) {
            layers.insert(http);
        }
        Some(TCP {
            src,
            dst,
            sn,
            ack_sn,
            header_len,
            ns,
            flags,
            window_size,
            checksum,
            urgent_point,
            options,
            data,
            layers,
        })
    }
}
