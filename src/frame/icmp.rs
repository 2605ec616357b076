use crate::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Echo {
    Request,
    Reply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoData {
    pub kind: Echo,
    pub id: u16,
    pub seq: u16,
    pub payload_len: usize,
}

#[derive(Debug, Layer)]
pub struct ICMP {
    pub kind: u8,
    pub code: u8,
    pub checksum: u16,
    /// Identifier and sequence of echo request / reply messages.
    pub echo: Option<EchoData>,
}

impl ICMP {
    pub fn try_new(data: &[u8]) -> Option<ICMP> {
        let kind = *data.first()?;
        let code = *data.get(1)?;
        let checksum = read_u16(data, 2)?;
        let echo = match kind {
            IcmpFields::ECHO_REQUEST => Some(Echo::Request),
            IcmpFields::ECHO_REPLY => Some(Echo::Reply),
            _ => None,
        };
        let echo = match echo {
            Some(kind) => Some(EchoData {
                kind,
                id: read_u16(data, 4)?,
                seq: read_u16(data, 6)?,
                payload_len: data.len().saturating_sub(8),
            }),
            None => None,
        };
        Some(ICMP { kind, code, checksum, echo })
    }
}
