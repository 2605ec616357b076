use std::path::{Path, PathBuf};

use clap::Parser;
use rayon::prelude::*;
use tracing::{error, info};

use pcap_windows::export::{format_timestamp, CsvExport};
use pcap_windows::*;

/// Cuts pcap / pcapng captures into fixed windows and writes one CSV table per capture.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Capture files, each processed on its own
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// RON settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Window length in seconds
    #[arg(short, long)]
    period: Option<f64>,

    /// Directory for the CSV tables
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Drop frames with a bad timestamp instead of failing the capture
    #[arg(long)]
    skip_invalid: bool,

    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(period) = self.period {
            config.period = period;
        }
        if let Some(dir) = &self.output {
            config.output_dir = Some(dir.clone());
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        config.skip_invalid |= self.skip_invalid;
        Ok(config)
    }
}

fn main() -> std::result::Result<(), Box<dyn ::std::error::Error>> {
    let args = Args::parse();
    let config = args.config()?;
    let period = config.period()?;

    let format = tracing_subscriber::fmt::format()
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::LocalTime::rfc_3339());
    tracing_subscriber::fmt()
        .event_format(format)
        .with_max_level(config.level()?)
        .init();

    if let Some(dir) = &config.output_dir {
        std::fs::create_dir_all(dir)?;
    }

    let failed = args.inputs
        .par_iter()
        .filter(|input| {
            let target = table_path(input, config.output_dir.as_deref());
            match process(input, &target, period, config.skip_invalid) {
                Ok(rows) => {
                    info!(input = %input.display(), output = %target.display(), rows, "done");
                    false
                }
                Err(e) => {
                    error!(input = %input.display(), "{}", e);
                    true
                }
            }
        })
        .count();

    if failed > 0 {
        return Err(format!("{} of {} captures failed", failed, args.inputs.len()).into());
    }
    Ok(())
}

fn table_path(input: &Path, dir: Option<&Path>) -> PathBuf {
    let table = input.with_extension("csv");
    match (dir, table.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => table,
    }
}

fn process(input: &Path, target: &Path, period: Period, skip_invalid: bool) -> Result<usize> {
    let mut export = CsvExport::create(target)?;
    let mut first = true;
    for item in open(input)?.try_traffic_windows(period) {
        let snapshot = match item {
            Ok(snapshot) => snapshot,
            Err(e) if skip_invalid && e.is_invalid_frame() => continue,
            Err(e) => return Err(e),
        };
        if first {
            info!(input = %input.display(), start = %format_timestamp(snapshot.start), "first window");
            first = false;
        }
        export.write(&snapshot)?;
    }
    let rows = export.rows();
    export.finish()?;
    Ok(rows)
}
