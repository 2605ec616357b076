use crate::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HTTPKind {
    Req { method: String, uri: String },
    Res { code: u16 },
}

/// An HTTP/1.x request or status line at the start of a TCP segment.
#[derive(Debug, Layer)]
pub struct HTTP {
    pub kind: HTTPKind,
    pub version: (u8, u8),
}

impl HTTP {
    const METHODS: [&'static str; 9] = [
        "OPTIONS", "GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "TRACE", "CONNECT",
    ];

    /// `HTTP/major.minor`, a missing minor reads as 0.
    fn _get_version(s: &str) -> Option<(u8, u8)> {
        let s = s.strip_prefix("HTTP/")?;
        match s.split_once('.') {
            Some((major, minor)) => Some((major.parse().ok()?, minor.parse().ok()?)),
            None => Some((s.parse().ok()?, 0)),
        }
    }

    pub fn try_make(data: &[u8]) -> Option<HTTP> {
        let end = data.windows(2).position(|w| w == b"\r\n")?;
        let line = std::str::from_utf8(&data[..end]).ok()?;
        let mut row = line.splitn(3, ' ');
        let first = row.next()?;
        let second = row.next()?;
        let (kind, version) = if Self::METHODS.iter().any(|m| *m == first) {
            let version = Self::_get_version(row.next()?)?;
            (HTTPKind::Req { method: first.to_string(), uri: second.to_string() }, version)
        } else if first.starts_with("HTTP/") {
            let code = second.parse::<u16>().ok()?;
            (HTTPKind::Res { code }, Self::_get_version(first)?)
        } else {
            return None;
        };
        Some(HTTP { kind, version })
    }
}
