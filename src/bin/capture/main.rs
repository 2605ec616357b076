use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use pcap_windows::export::CsvExport;
use pcap_windows::live::{find_device, Live};
use pcap_windows::*;

/// Captures from a live interface in batches and appends the windows of each batch to one CSV table.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Part of the device name or description
    device: String,

    /// Seconds per batch
    #[arg(short, long, default_value_t = 30)]
    batch: i64,

    /// Stop after this many batches, run until interrupted when unset
    #[arg(short = 'n', long)]
    batches: Option<usize>,

    /// BPF filter program, e.g. "icmp"
    #[arg(short, long)]
    filter: Option<String>,

    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Window length in seconds
    #[arg(short, long)]
    period: Option<f64>,

    #[arg(short, long, default_value = "data_set.csv")]
    output: PathBuf,
}

fn main() -> std::result::Result<(), Box<dyn ::std::error::Error>> {
    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(period) = args.period {
        config.period = period;
    }
    let period = config.period()?;

    let format = tracing_subscriber::fmt::format()
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::LocalTime::rfc_3339());
    tracing_subscriber::fmt()
        .event_format(format)
        .with_max_level(config.level()?)
        .init();

    let device = find_device(&args.device)?;
    let mut live = Live::open(device, args.filter.as_deref())?;
    let mut export = CsvExport::create(&args.output)?;
    let length = chrono::Duration::seconds(args.batch);

    let mut batch = 0;
    while args.batches.map_or(true, |n| batch < n) {
        let frames = live.batch(length)?;
        let picked = frames.len();
        // each batch gets its own driver, windows never span two batches
        for item in windows(frames, period) {
            match item {
                Ok(snapshot) => export.write(&snapshot)?,
                // only rejected frames end up here, already logged
                Err(_) => continue,
            }
        }
        // the loop may only end by interruption
        export.flush()?;
        batch += 1;
        info!(batch, picked, rows = export.rows(), "batch written");
    }
    export.finish()?;
    Ok(())
}
