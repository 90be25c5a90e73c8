use std::path::PathBuf;

use lcheapo_core::{DriftParameters, LeapSecond, DEFAULT_TIMING_TOLERANCE};

use crate::instrument::InstrumentKind;

/// Полная конфигурация конвертации в SDS.
#[derive(Debug, Clone)]
pub struct SdsConfig {
    /// Входные файлы LCHEAPO
    pub infiles: Vec<PathBuf>,
    /// Модель прибора: порядок каналов и их коды
    pub obs_type: InstrumentKind,
    /// Код сети (до двух символов)
    pub network: String,
    /// Код станции FDSN (до пяти символов)
    pub station: String,
    /// Калибровочные точки; None — нулевая коррекция с предупреждением
    pub drift: Option<DriftParameters>,
    /// События високосных секунд
    pub leapseconds: Vec<LeapSecond>,
    /// Каталог, в котором создаётся дерево SDS/
    pub out_dir: PathBuf,
    /// Параллельные работники (по файлу на работника)
    pub workers: usize,
    /// Допуск проверки непрерывности, доля периода выборки
    pub timing_tolerance: f64,
}

impl SdsConfig {
    /// Конфигурация для явного типа прибора; остальные поля — нейтральные
    /// значения. Типа прибора по умолчанию нет намеренно: порядок каналов
    /// обязан задать вызывающий.
    pub fn new(
        infiles: Vec<PathBuf>,
        obs_type: InstrumentKind,
    ) -> Self {
        Self {
            infiles,
            obs_type,
            network: "XX".to_string(),
            station: "SSSSS".to_string(),
            drift: None,
            leapseconds: Vec::new(),
            out_dir: PathBuf::from("."),
            workers: 1,
            timing_tolerance: DEFAULT_TIMING_TOLERANCE,
        }
    }

    /// Обрезает коды до допустимой длины и проверяет согласованность.
    pub fn normalize(mut self) -> Result<Self, String> {
        if self.infiles.is_empty() {
            return Err("no input files".to_string());
        }
        if self.workers == 0 {
            return Err("workers must be > 0".to_string());
        }

        self.network.truncate(2);
        self.station.truncate(5);

        Ok(self)
    }
}
