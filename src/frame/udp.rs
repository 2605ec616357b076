use derivative::Derivative;

use crate::*;

#[derive(Derivative, Layer)]
#[derivative(Debug)]
#[layers]
pub struct UDP {
    pub src: u16,
    pub dst: u16,
    pub len: u16,
    pub checksum: u16,
    #[derivative(Debug = "ignore")]
    pub payload: Vec<u8>,

    layers: Layers,
}

impl UDP {
    pub fn try_new(data: &[u8]) -> Option<UDP> {
        let src = read_u16(data, 0)?;
        let dst = read_u16(data, 2)?;
        let len = read_u16(data, 4)?;
        let checksum = read_u16(data, 6)?;
        let end = (len as usize).min(data.len()).max(8);
        let payload = data[8..end].to_vec();

        let mut layers = Layers::default();
        if let Some(dhcp) = DHCP::try_make(&payload) {
            layers.insert(dhcp);
        }
        Some(UDP { src, dst, len, checksum, payload, layers })
    }
}
