use std::path::PathBuf;
use std::sync::atomic::Ordering;

use clap::Parser;
use lcheapo_core::{DriftParameters, LeapKind, LeapSecond, DEFAULT_TIMING_TOLERANCE};
use lcheapo_sds::{InstrumentKind, SdsConfig, SdsPipeline};
use lcheapo_types::parse_datetime;
use log::{error, info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "lcheapo-sds",
    version = env!("CARGO_PKG_VERSION"),
    about = "Convert LCHEAPO recorder files to an SDS archive of daily segments",
    long_about = "Convert LCHEAPO recorder files to an SDS archive of daily segments.\n\
                  Clock drift is linear between the supplied calibration points; the\n\
                  leap-second correction is applied before the drift inversion.",
)]
struct Cli {
    /// Входные файлы LCHEAPO
    #[arg(required = true)]
    infiles: Vec<PathBuf>,
    /// Тип прибора: SPOBS1, SPOBS2, BBOBS, HYDROCT
    #[arg(short = 't', long)]
    obs_type: String,
    /// Код сети (до двух символов)
    #[arg(long, default_value = "XX")]
    network: String,
    /// Код станции FDSN (до пяти символов)
    #[arg(long, default_value = "SSSSS")]
    station: String,
    /// Начало по опорным часам и часам прибора (1-2 значения ISO-8601)
    #[arg(short = 's', long, num_args = 1..=2, value_names = ["REF_START", "INST_START"])]
    start_times: Vec<String>,
    /// Конец по опорным часам и часам прибора (2 значения ISO-8601)
    #[arg(short = 'e', long, num_args = 2, value_names = ["REF_END", "INST_END"])]
    end_times: Vec<String>,
    /// Метки високосных секунд (ISO-8601, `:60` допустим)
    #[arg(long, num_args = 1..)]
    leapsecond_times: Vec<String>,
    /// '+' — вставленная секунда, '-' — удалённая; один символ на все
    /// метки или по символу на каждую
    #[arg(long, default_value = "+")]
    leapsecond_types: String,
    /// Каталог, в котором создаётся дерево SDS/
    #[arg(short = 'o', long, default_value = ".")]
    out_dir: PathBuf,
    /// Параллельные работники (по файлу на работника)
    #[arg(long, default_value = "1")]
    workers: usize,
    /// Допуск проверки непрерывности, доля периода выборки
    #[arg(long, default_value_t = DEFAULT_TIMING_TOLERANCE)]
    timing_tolerance: f64,
    /// Подробный вывод (отладочная диагностика блоков)
    #[arg(short, long)]
    verbose: bool,
    /// Тихий режим (только ошибки)
    #[arg(short, long)]
    quiet: bool,
}

/// Собирает калибровочные точки из аргументов.
///
/// Если задано одно начальное время, оно используется и для опорных
/// часов, и для часов прибора.
fn parse_drift(
    start_times: &[String],
    end_times: &[String],
) -> Result<Option<DriftParameters>, String> {
    match (start_times.is_empty(), end_times.is_empty()) {
        (true, true) => Ok(None),
        (false, false) => {
            let reference_start = parse_datetime(&start_times[0])?;
            let instrument_start = match start_times.get(1) {
                Some(s) => parse_datetime(s)?,
                None => reference_start,
            };
            let reference_end = parse_datetime(&end_times[0])?;
            let instrument_end = parse_datetime(&end_times[1])?;

            Ok(Some(DriftParameters {
                reference_start,
                reference_end,
                instrument_start,
                instrument_end,
            }))
        }
        _ => Err("--start-times and --end-times must be supplied together".to_string()),
    }
}

/// Собирает события високосных секунд из меток и строки типов.
fn parse_leapseconds(
    times: &[String],
    types: &str,
) -> Result<Vec<LeapSecond>, String> {
    if times.is_empty() {
        return Ok(Vec::new());
    }

    let kinds: Vec<char> = if types.chars().count() == 1 {
        // один символ применяется ко всем меткам
        types.chars().cycle().take(times.len()).collect()
    } else if types.chars().count() == times.len() {
        types.chars().collect()
    } else {
        return Err(format!(
            "{} leapsecond times incompatible with {} types",
            times.len(),
            types.chars().count(),
        ));
    };

    times
        .iter()
        .zip(kinds)
        .map(|(t, c)| LeapSecond::parse(t, LeapKind::from_char(c)?))
        .collect()
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };

    env_logger::Builder::new()
        .filter_level(level.parse().unwrap())
        .format_target(false)
        .format_timestamp_secs()
        .init();

    let obs_type: InstrumentKind = match cli.obs_type.parse() {
        Ok(t) => t,
        Err(e) => {
            error!("--obs-type: {e}");
            std::process::exit(1);
        }
    };

    let drift = match parse_drift(&cli.start_times, &cli.end_times) {
        Ok(d) => d,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let leapseconds = match parse_leapseconds(&cli.leapsecond_times, &cli.leapsecond_types) {
        Ok(l) => l,
        Err(e) => {
            error!("--leapsecond-times: {e}");
            std::process::exit(1);
        }
    };

    let config = SdsConfig {
        infiles: cli.infiles,
        obs_type,
        network: cli.network,
        station: cli.station,
        drift,
        leapseconds,
        out_dir: cli.out_dir.clone(),
        workers: cli.workers,
        timing_tolerance: cli.timing_tolerance,
    };

    let pipeline = match SdsPipeline::new(config) {
        Ok(p) => p,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let stop_flag = pipeline.stop_flag();
    let stop_ctrlc = stop_flag.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        if stop_ctrlc.swap(true, Ordering::SeqCst) {
            // Второй Ctrl+C — принудительный выход
            warn!("Force exit");
            std::process::exit(130);
        }
        warn!("Ctrl+C received — finishing current day and stopping...");
    }) {
        warn!("Failed to set Ctrl+C handler: {e}");
    }

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Files         : {}", pipeline.config().infiles.len());
    info!("  OBS type      : {}", pipeline.config().obs_type);
    info!("  Network       : {}", pipeline.config().network);
    info!("  Station       : {}", pipeline.config().station);
    info!("  Calibrated    : {}", pipeline.config().drift.is_some());
    info!("  Leapseconds   : {}", pipeline.config().leapseconds.len());
    info!("  Output        : {:?}", cli.out_dir);
    info!("  Workers       : {}", pipeline.config().workers);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let outcomes = match pipeline.run() {
        Ok(o) => o,
        Err(e) => {
            error!("Batch failed: {e}");
            std::process::exit(1);
        }
    };

    let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
    let days: usize = outcomes.iter().map(|o| o.days_emitted).sum();

    info!("✓ {} file(s), {days} day segment(s), {failed} failed", outcomes.len());

    if failed > 0 {
        std::process::exit(1);
    }
}
