//! Frame sources over pcap and pcapng captures.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use pcap_parser::{Block, LegacyPcapReader, Linktype, PcapBlockOwned, PcapError, PcapNGReader};
use pcap_parser::traits::{PcapNGPacketBlock, PcapReaderIterator};
use tracing::{debug, trace, warn};

use crate::{Error, Frame, Result};

const BUFFER: usize = 65536;
/// Largest block the readers make room for.
const MAX_BUFFER: usize = 1 << 24;
/// Refills in a row that may come back without a complete block.
const MAX_REFILLS: usize = 16;

const PCAPNG_MAGIC: [u8; 4] = [0x0A, 0x0D, 0x0D, 0x0A];
const NANOSECOND_MAGICS: [u32; 2] = [0xA1B2_3C4D, 0x4D3C_B2A1];

fn source_error<E: std::fmt::Debug>(e: E) -> Error {
    Error::Source(format!("{:?}", e))
}

/// Buffer state of a reader waiting for the rest of a block.
struct Refill {
    capacity: usize,
    attempts: usize,
}

impl Refill {
    fn new() -> Self {
        Refill { capacity: BUFFER, attempts: 0 }
    }

    /// Pulls more input after an incomplete block. Once refilling stops
    /// helping the buffer is doubled, up to [`MAX_BUFFER`].
    fn more<P: PcapReaderIterator>(&mut self, reader: &mut P) -> Result<()> {
        if self.attempts == MAX_REFILLS {
            if self.capacity >= MAX_BUFFER {
                return Err(Error::Source(format!(
                    "incomplete block past {} bytes", self.capacity
                )));
            }
            self.capacity = (self.capacity * 2).min(MAX_BUFFER);
            if !reader.grow(self.capacity) {
                return Err(Error::Source(format!(
                    "cannot grow capture buffer to {} bytes", self.capacity
                )));
            }
            debug!(capacity = self.capacity, "capture buffer grown");
            self.attempts = 0;
        }
        self.attempts += 1;
        reader.refill().map_err(source_error)
    }
}

/// `if_tsoffset` as an unsigned offset; a negative one is dropped.
fn ts_offset<T: TryInto<u64> + Copy + std::fmt::Display>(raw: T) -> u64 {
    raw.try_into().unwrap_or_else(|_| {
        warn!(offset = %raw, "negative interface timestamp offset ignored");
        0
    })
}

/// Frames of a legacy (libpcap) capture.
pub struct Pcap<R: Read> {
    reader: LegacyPcapReader<R>,
    link_type: Linktype,
    ts_unit: f64,
    refill: Refill,
    done: bool,
}

impl<R: Read> Pcap<R> {
    pub fn new(input: R) -> Result<Self> {
        let reader = LegacyPcapReader::new(BUFFER, input).map_err(source_error)?;
        Ok(Self {
            reader,
            link_type: Linktype::NULL,
            ts_unit: 1e-6,
            refill: Refill::new(),
            done: false,
        })
    }
}

impl<R: Read> Iterator for Pcap<R> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            match self.reader.next() {
                Ok((offset, block)) => {
                    self.refill.attempts = 0;
                    let item = match block {
                        PcapBlockOwned::LegacyHeader(hdr) => {
                            debug!(link_type = hdr.network.0, snaplen = hdr.snaplen, "pcap header");
                            self.link_type = hdr.network;
                            self.ts_unit = if NANOSECOND_MAGICS.contains(&hdr.magic_number) { 1e-9 } else { 1e-6 };
                            None
                        }
                        PcapBlockOwned::Legacy(b) => {
                            Some(Frame::from_legacy(&b, self.link_type, self.ts_unit))
                        }
                        PcapBlockOwned::NG(_) => None,
                    };
                    self.reader.consume(offset);
                    if let Some(frame) = item {
                        return Some(Ok(frame));
                    }
                }
                Err(PcapError::Eof) => self.done = true,
                Err(PcapError::Incomplete) => {
                    if let Err(e) = self.refill.more(&mut self.reader) {
                        self.done = true;
                        return Some(Err(e));
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(source_error(e)));
                }
            }
        }
        None
    }
}

struct Interface {
    link_type: Linktype,
    ts_offset: u64,
    /// Ticks per second.
    resolution: u64,
}

/// Decodes the `if_tsresol` option: high bit set means a power of two.
fn ts_resolution(tsresol: u8) -> u64 {
    let exp = (tsresol & 0x7F) as u32;
    let resolution = if tsresol & 0x80 != 0 {
        2u64.checked_pow(exp)
    } else {
        10u64.checked_pow(exp)
    };
    resolution.unwrap_or(1_000_000)
}

/// Frames of a pcapng capture, over every interface of every section.
pub struct PcapNG<R: Read> {
    reader: PcapNGReader<R>,
    interfaces: Vec<Interface>,
    refill: Refill,
    done: bool,
}

impl<R: Read> PcapNG<R> {
    pub fn new(input: R) -> Result<Self> {
        let reader = PcapNGReader::new(BUFFER, input).map_err(source_error)?;
        Ok(Self {
            reader,
            interfaces: vec![],
            refill: Refill::new(),
            done: false,
        })
    }
}

impl<R: Read> Iterator for PcapNG<R> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            match self.reader.next() {
                Ok((offset, block)) => {
                    self.refill.attempts = 0;
                    let item = match block {
                        PcapBlockOwned::NG(Block::SectionHeader(ref _shb)) => {
                            // starting a new section, clear known interfaces
                            self.interfaces.clear();
                            None
                        }
                        PcapBlockOwned::NG(Block::InterfaceDescription(ref idb)) => {
                            debug!(link_type = idb.linktype.0, tsresol = idb.if_tsresol, "pcapng interface");
                            self.interfaces.push(Interface {
                                link_type: idb.linktype,
                                ts_offset: ts_offset(idb.if_tsoffset),
                                resolution: ts_resolution(idb.if_tsresol),
                            });
                            None
                        }
                        PcapBlockOwned::NG(Block::EnhancedPacket(ref epb)) => {
                            match self.interfaces.get(epb.if_id as usize) {
                                Some(iface) => Some(Ok(Frame::from_enhanced(
                                    epb,
                                    iface.link_type,
                                    iface.ts_offset,
                                    iface.resolution,
                                ))),
                                None => Some(Err(Error::Source(format!(
                                    "packet on undeclared interface {}", epb.if_id
                                )))),
                            }
                        }
                        PcapBlockOwned::NG(Block::SimplePacket(ref spb)) => {
                            // simple packets carry no timestamp
                            match self.interfaces.first() {
                                Some(iface) => Some(Ok(Frame::new(
                                    spb.packet_data(),
                                    None,
                                    spb.packet_data().len() as u32,
                                    spb.orig_len(),
                                    iface.link_type,
                                ))),
                                None => Some(Err(Error::Source(
                                    "simple packet before any interface".to_string()
                                ))),
                            }
                        }
                        PcapBlockOwned::NG(_) => {
                            // statistics (ISB), name resolution (NRB), etc.
                            trace!("pcapng block skipped");
                            None
                        }
                        PcapBlockOwned::Legacy(_)
                        | PcapBlockOwned::LegacyHeader(_) => None,
                    };
                    self.reader.consume(offset);
                    if item.is_some() {
                        return item;
                    }
                }
                Err(PcapError::Eof) => self.done = true,
                Err(PcapError::Incomplete) => {
                    if let Err(e) = self.refill.more(&mut self.reader) {
                        self.done = true;
                        return Some(Err(e));
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(source_error(e)));
                }
            }
        }
        None
    }
}

/// A capture of either format, picked by its magic number.
pub enum Source<R: Read = File> {
    Legacy(Pcap<R>),
    Next(PcapNG<R>),
}

impl<R: Read + Seek> Source<R> {
    pub fn from_reader(mut input: R) -> Result<Self> {
        let mut magic = [0u8; 4];
        input.read_exact(&mut magic)?;
        input.seek(SeekFrom::Start(0))?;
        if magic == PCAPNG_MAGIC {
            Ok(Source::Next(PcapNG::new(input)?))
        } else {
            Ok(Source::Legacy(Pcap::new(input)?))
        }
    }
}

impl<R: Read> Iterator for Source<R> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Source::Legacy(pcap) => pcap.next(),
            Source::Next(pcapng) => pcapng.next(),
        }
    }
}

/// Opens a pcap or pcapng file.
pub fn open(path: impl AsRef<Path>) -> Result<Source> {
    Source::from_reader(File::open(path)?)
}
