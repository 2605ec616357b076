//! Tabular output: one row per window, columns in a fixed order.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{Local, TimeZone};
use strum::IntoEnumIterator;
use strum_macros::{EnumIter, IntoStaticStr};

use crate::counter::Snapshot;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, IntoStaticStr)]
pub enum Column {
    #[strum(serialize = "Window start")]
    Start,
    #[strum(serialize = "Total")]
    Total,
    #[strum(serialize = "IP")]
    Ip,
    #[strum(serialize = "IP with MF")]
    IpMf,
    #[strum(serialize = "IP with DF")]
    IpDf,
    #[strum(serialize = "IP with evil")]
    IpEvil,
    #[strum(serialize = "ICMP")]
    Icmp,
    #[strum(serialize = "ICMP echo request")]
    EchoRequest,
    #[strum(serialize = "ICMP echo reply")]
    EchoReply,
    #[strum(serialize = "TCP")]
    Tcp,
    #[strum(serialize = "TCP with F")]
    TcpFin,
    #[strum(serialize = "TCP with S")]
    TcpSyn,
    #[strum(serialize = "TCP with R")]
    TcpRst,
    #[strum(serialize = "TCP with P")]
    TcpPsh,
    #[strum(serialize = "TCP with A")]
    TcpAck,
    #[strum(serialize = "TCP with U")]
    TcpUrg,
    #[strum(serialize = "TCP with E")]
    TcpEce,
    #[strum(serialize = "TCP with C")]
    TcpCwr,
    #[strum(serialize = "TCP with N")]
    TcpNs,
    #[strum(serialize = "UDP")]
    Udp,
    #[strum(serialize = "ARP")]
    Arp,
    #[strum(serialize = "HTTP")]
    Http,
    #[strum(serialize = "SMTP")]
    Smtp,
    #[strum(serialize = "DHCP")]
    Dhcp,
    #[strum(serialize = "addresses count")]
    Addresses,
    #[strum(serialize = "ports count")]
    Ports,
    #[strum(serialize = "BYTES")]
    Bytes,
    #[strum(serialize = "DATA_BYTES")]
    DataBytes,
    #[strum(serialize = "Average packet size")]
    AvgSize,
    #[strum(serialize = "Average delta packet size")]
    AvgDeltasSize,
    #[strum(serialize = "Average time interval")]
    AvgTime,
    #[strum(serialize = "Average delta time interval")]
    AvgDeltasTime,
}

impl Column {
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn headers() -> Vec<&'static str> {
        Column::iter().map(Column::name).collect()
    }
}

impl Snapshot {
    pub fn get(&self, column: Column) -> f64 {
        match column {
            Column::Start => self.start,
            Column::Total => self.total as f64,
            Column::Ip => self.ip as f64,
            Column::IpMf => self.ip_flags.mf as f64,
            Column::IpDf => self.ip_flags.df as f64,
            Column::IpEvil => self.ip_flags.evil as f64,
            Column::Icmp => self.icmp as f64,
            Column::EchoRequest => self.echo_req as f64,
            Column::EchoReply => self.echo_res as f64,
            Column::Tcp => self.tcp as f64,
            Column::TcpFin => self.tcp_flags.fin as f64,
            Column::TcpSyn => self.tcp_flags.syn as f64,
            Column::TcpRst => self.tcp_flags.rst as f64,
            Column::TcpPsh => self.tcp_flags.psh as f64,
            Column::TcpAck => self.tcp_flags.ack as f64,
            Column::TcpUrg => self.tcp_flags.urg as f64,
            Column::TcpEce => self.tcp_flags.ece as f64,
            Column::TcpCwr => self.tcp_flags.cwr as f64,
            Column::TcpNs => self.tcp_flags.ns as f64,
            Column::Udp => self.udp as f64,
            Column::Arp => self.arp as f64,
            Column::Http => self.http as f64,
            Column::Smtp => self.smtp as f64,
            Column::Dhcp => self.dhcp as f64,
            Column::Addresses => self.addresses as f64,
            Column::Ports => self.ports as f64,
            Column::Bytes => self.bytes as f64,
            Column::DataBytes => self.data_bytes as f64,
            Column::AvgSize => self.avg_size,
            Column::AvgDeltasSize => self.avg_deltas_size,
            Column::AvgTime => self.avg_time,
            Column::AvgDeltasTime => self.avg_deltas_time,
        }
    }

    /// Values in [`Column`] order.
    pub fn as_row(&self) -> Vec<f64> {
        Column::iter().map(|c| self.get(c)).collect()
    }
}

/// Streams snapshots into a CSV table, header first.
pub struct CsvExport<W: Write> {
    writer: csv::Writer<W>,
    rows: usize,
}

impl<W: Write> CsvExport<W> {
    pub fn new(writer: W) -> Result<Self> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(Column::headers())?;
        Ok(Self { writer, rows: 0 })
    }

    pub fn write(&mut self, snapshot: &Snapshot) -> Result<()> {
        let row = snapshot.as_row()
            .into_iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>();
        self.writer.write_record(row)?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Pushes buffered rows to the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        self.writer.get_ref()
    }

    /// Flushes and hands back the underlying writer.
    pub fn finish(self) -> Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error().into())
    }
}

impl CsvExport<File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(File::create(path)?)
    }
}

pub fn write_csv<'a, W, I>(writer: W, snapshots: I) -> Result<usize>
    where
        W: Write,
        I: IntoIterator<Item=&'a Snapshot>,
{
    let mut export = CsvExport::new(writer)?;
    for snapshot in snapshots {
        export.write(snapshot)?;
    }
    let rows = export.rows();
    export.finish()?;
    Ok(rows)
}

pub fn save_csv<'a, P, I>(path: P, snapshots: I) -> Result<usize>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item=&'a Snapshot>,
{
    write_csv(File::create(path)?, snapshots)
}

/// Local wall-clock rendering of a capture timestamp, for log lines.
pub fn format_timestamp(ts: f64) -> String {
    let secs = ts.floor();
    let nanos = ((ts - secs) * 1e9) as u32;
    match Local.timestamp_opt(secs as i64, nanos.min(999_999_999)).single() {
        Some(time) => time.to_rfc3339(),
        None => format!("{:.6}", ts),
    }
}
