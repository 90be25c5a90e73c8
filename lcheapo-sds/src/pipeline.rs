//! Пакетная конвертация файлов LCHEAPO в архив SDS
//!
//! Каждый файл обрабатывается независимым работником со своим
//! дескриптором: источник только читается, так что блокировок не нужно.
//! Структурная ошибка файла снимает только его — соседи по пакету
//! продолжаются. Отмена кооперативная, с гранулярностью в день.

use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use chrono::{Datelike, Utc};
use lcheapo_core::{DailySegmenter, DriftModel, LcheapoReader};
use serde::Serialize;

use crate::config::SdsConfig;
use crate::error::{SdsError, SdsResult};
use crate::writer::{SdsTreeWriter, SegmentId, SegmentWriter};

/// Итог обработки одного входного файла.
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub file: PathBuf,
    pub days_emitted: usize,
    pub error: Option<String>,
}

/// Журнал шага обработки, остающийся рядом с архивом.
#[derive(Serialize)]
struct ProcessSteps<'a> {
    application: &'static str,
    description: &'static str,
    version: &'static str,
    command_line: String,
    start_time_utc: String,
    files: &'a [FileOutcome],
    return_code: i32,
}

/// Оркестрирует пакет конвертаций.
pub struct SdsPipeline {
    config: SdsConfig,
    stop_flag: Arc<AtomicBool>,
}

impl SdsPipeline {
    /// Создаёт конвейер, проверяя конфигурацию.
    pub fn new(config: SdsConfig) -> SdsResult<Self> {
        let config = config.normalize().map_err(SdsError::Config)?;

        Ok(Self {
            config,
            stop_flag: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Флаг остановки. Установка в `true` — graceful shutdown между
    /// днями.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    pub fn config(&self) -> &SdsConfig {
        &self.config
    }

    /// Обрабатывает все файлы пакета. Блокируется до завершения.
    pub fn run(&self) -> SdsResult<Vec<FileOutcome>> {
        let started = Utc::now();

        let (job_tx, job_rx) = crossbeam_channel::unbounded::<PathBuf>();
        let (res_tx, res_rx) = crossbeam_channel::unbounded::<FileOutcome>();

        for path in &self.config.infiles {
            // unbounded: send не блокирует
            let _ = job_tx.send(path.clone());
        }
        drop(job_tx);

        let workers = self.config.workers.min(self.config.infiles.len());

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let res_tx = res_tx.clone();

                scope.spawn(move || {
                    while let Ok(path) = job_rx.recv() {
                        if self.stop_flag.load(Ordering::Relaxed) {
                            break;
                        }

                        let outcome = match self.process_file(&path) {
                            Ok(days) => FileOutcome {
                                file: path,
                                days_emitted: days,
                                error: None,
                            },
                            Err(e) => {
                                log::error!("{}: {e}", path.display());
                                FileOutcome {
                                    file: path,
                                    days_emitted: 0,
                                    error: Some(e.to_string()),
                                }
                            }
                        };

                        let _ = res_tx.send(outcome);
                    }
                });
            }
        });
        drop(res_tx);

        let mut outcomes: Vec<FileOutcome> = res_rx.iter().collect();
        outcomes.sort_by(|a, b| a.file.cmp(&b.file));

        self.write_process_steps(&outcomes, &started.format("%Y-%m-%dT%H:%M:%S").to_string())?;

        Ok(outcomes)
    }

    /// Полный цикл одного файла: открыть, нарезать по дням, записать.
    fn process_file(
        &self,
        path: &Path,
    ) -> SdsResult<usize> {
        let cfg = &self.config;

        log::info!("Processing {}", path.display());

        let mut reader = LcheapoReader::open(path)?;
        reader.set_timing_tolerance(cfg.timing_tolerance);

        let n_chans = reader.header().channel_count;
        if n_chans != cfg.obs_type.channel_count() {
            return Err(SdsError::Config(format!(
                "{} holds {n_chans} channels, {} expects {}",
                path.display(),
                cfg.obs_type,
                cfg.obs_type.channel_count(),
            )));
        }

        let channel_ids = cfg
            .obs_type
            .channel_ids(reader.header().sample_rate())
            .map_err(SdsError::Config)?;

        let model = DriftModel::new(cfg.drift, cfg.leapseconds.clone());
        let segmenter = DailySegmenter::new(model).with_cancel_flag(self.stop_flag.clone());
        let mut writer = SdsTreeWriter::new(cfg.out_dir.clone());

        let days = segmenter.run(&mut reader, |seg| {
            for (i, samples) in seg.channels.iter().enumerate() {
                let id = SegmentId {
                    network: cfg.network.clone(),
                    station: cfg.station.clone(),
                    location: channel_ids[i].location.clone(),
                    channel: channel_ids[i].channel.clone(),
                    year: seg.day.year(),
                    day_of_year: seg.day.ordinal(),
                };

                writer
                    .write_segment(&id, seg.start_time, seg.sample_rate, samples)
                    .map_err(|e| std::io::Error::other(e.to_string()))?;
            }

            log::info!(
                "{}: emitted {} channels x {} samples",
                seg.day.format("%Y-%m-%d"),
                seg.channels.len(),
                seg.channels.first().map_or(0, Vec::len),
            );

            Ok(())
        })?;

        log::info!("{}: {days} day segment(s) emitted", path.display());

        Ok(days)
    }

    fn write_process_steps(
        &self,
        outcomes: &[FileOutcome],
        started: &str,
    ) -> SdsResult<()> {
        let return_code = i32::from(outcomes.iter().any(|o| o.error.is_some()));

        let steps = ProcessSteps {
            application: "lcheapo-sds",
            description: "Create or add to an SDS archive from LCHEAPO files",
            version: lcheapo_core::VERSION,
            command_line: std::env::args().collect::<Vec<_>>().join(" "),
            start_time_utc: started.to_string(),
            files: outcomes,
            return_code,
        };

        std::fs::create_dir_all(&self.config.out_dir)?;

        let file = std::fs::File::create(self.config.out_dir.join("process-steps.json"))?;
        serde_json::to_writer_pretty(file, &steps)
            .map_err(|e| SdsError::Io(std::io::Error::other(e)))?;

        Ok(())
    }
}
