//! Инспекция файлов LCHEAPO: заголовок, границы данных, выгрузка окна
//!
//! `lcheapo-dump file.lch` печатает заголовок и границы данных;
//! с `--extract DIR` дополнительно выгружает запрошенное окно в сырые
//! big-endian i32 файлы, по одному на канал.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use byteorder::{BigEndian, WriteBytesExt};
use clap::Parser;
use lcheapo_core::LcheapoReader;
use lcheapo_types::{seconds_between, TimeSpec};
use log::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "lcheapo-dump",
    version = env!("CARGO_PKG_VERSION"),
    about = "Inspect LCHEAPO recorder files and extract raw channel windows",
    long_about = None,
)]
struct Cli {
    /// Входной файл LCHEAPO
    infile: PathBuf,
    /// Начало окна: ISO-8601 или секунды от начала файла
    #[arg(short, long, default_value = "0")]
    start: String,
    /// Конец окна: ISO-8601 или секунды от начала окна
    #[arg(short, long, default_value = "3600")]
    end: String,
    /// Выгрузить окно в каталог (по одному .i32 файлу на канал)
    #[arg(short = 'x', long, value_name = "DIR")]
    extract: Option<PathBuf>,
    /// Тихий режим (только ошибки)
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.quiet { "error" } else { "info" };

    env_logger::Builder::new()
        .filter_level(level.parse().unwrap())
        .format_target(false)
        .format_timestamp_secs()
        .init();

    let start: TimeSpec = cli
        .start
        .parse()
        .map_err(anyhow::Error::msg)
        .context("--start")?;
    let end: TimeSpec = cli
        .end
        .parse()
        .map_err(anyhow::Error::msg)
        .context("--end")?;

    let mut reader = LcheapoReader::open(&cli.infile)
        .with_context(|| format!("open {}", cli.infile.display()))?;

    let h = reader.header().clone();
    let (data_start, data_end) = reader.time_range()?;
    let span = seconds_between(data_end, data_start);

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  File          : {}", cli.infile.display());
    info!("  Channels      : {}", h.channel_count);
    info!("  Nominal rate  : {} Hz", h.nominal_sample_rate);
    info!("  Real rate     : {} Hz", h.real_sample_rate);
    info!("  Data start    : block {}", h.data_start_block);
    info!("  Description   : {}", h.description);
    info!("  First sample  : {data_start}");
    info!("  Last group    : {data_end}");
    info!("  Span          : {:.1} h", span / 3600.0);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let window = reader.read_window(start, end)?;

    for w in &window.warnings {
        warn!("{w}");
    }

    info!("Window starts {}", window.start_time);
    for (i, samples) in window.channels.iter().enumerate() {
        let (min, max) = samples
            .iter()
            .fold((i32::MAX, i32::MIN), |(lo, hi), &s| (lo.min(s), hi.max(s)));
        info!("  channel {i}: {} samples, min {min}, max {max}", samples.len());
    }

    if let Some(dir) = &cli.extract {
        std::fs::create_dir_all(dir)?;

        let stem = cli
            .infile
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "window".to_string());

        for (i, samples) in window.channels.iter().enumerate() {
            let path = dir.join(format!("{stem}.ch{i}.i32"));
            let mut out = BufWriter::new(File::create(&path)?);

            for &s in samples {
                out.write_i32::<BigEndian>(s)?;
            }
            out.flush()?;

            info!("✓ {} ({} samples)", path.display(), samples.len());
        }
    }

    Ok(())
}
