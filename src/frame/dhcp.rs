use crate::*;

/// BOOTP message carrying the DHCP magic cookie.
#[derive(Debug, Layer)]
pub struct DHCP {
    pub op: u8,
    pub htype: u8,
    pub hlen: u8,
    pub hops: u8,
    pub xid: u32,
    pub secs: u16,
    pub flags: u16,
    pub ciaddr: [u8; 4],
    pub yiaddr: [u8; 4],
    pub siaddr: [u8; 4],
    pub giaddr: [u8; 4],
    pub chaddr: [u8; 16],
    /// Option 53, DISCOVER = 1 .. INFORM = 8.
    pub message_type: Option<u8>,
    pub options: Vec<u8>,
}

impl DHCP {
    pub const MAGIC_COOKIE: [u8; 4] = [99, 130, 83, 99];
    const MESSAGE_TYPE: u8 = 53;

    pub fn try_make(data: &[u8]) -> Option<DHCP> {
        let op = *data.first()?;
        if ![0x01, 0x02].contains(&op) {
            return None;
        }
        if data.get(236..240)? != Self::MAGIC_COOKIE {
            return None;
        }
        let options = data[240..].to_vec();
        Some(DHCP {
            op,
            htype: *data.get(1)?,
            hlen: *data.get(2)?,
            hops: *data.get(3)?,
            xid: read_u32(data, 4)?,
            secs: read_u16(data, 8)?,
            flags: read_u16(data, 10)?,
            ciaddr: array(data, 12)?,
            yiaddr: array(data, 16)?,
            siaddr: array(data, 20)?,
            giaddr: array(data, 24)?,
            chaddr: array(data, 28)?,
            message_type: Self::_find_option(&options, Self::MESSAGE_TYPE)
                .and_then(|value| value.first().copied()),
            options,
        })
    }

    fn _find_option(mut options: &[u8], code: u8) -> Option<&[u8]> {
        loop {
            match *options.first()? {
                0 => options = &options[1..],
                255 => return None,
                tag => {
                    let len = *options.get(1)? as usize;
                    let value = options.get(2..2 + len)?;
                    if tag == code {
                        return Some(value);
                    }
                    options = &options[2 + len..];
                }
            }
        }
    }
}
