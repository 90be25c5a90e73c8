//! Посуточная нарезка с коррекцией часов
//!
//! Конечный автомат по календарным дням UTC: окно дня вычисляется в
//! опорном времени, переводится в показания часов прибора, читается,
//! корректируется и отдаётся наружу. День без пересечения с данными
//! пропускается без эмиссии; частично записанных дней не бывает —
//! сегмент отдаётся только после полного цикла чтения и коррекции.

use std::io::{Read, Seek};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use lcheapo_types::{floor_to_day, LcheapoError, LcheapoResult, ReadWarning, TimeSpec};

use crate::drift::DriftModel;
use crate::reader::LcheapoReader;

/// Секунд в календарном дне.
const DAY_SECONDS: f64 = 86_400.0;

/// Один скорректированный суточный сегмент.
#[derive(Debug, Clone)]
pub struct DaySegment {
    /// Полночь UTC дня сегмента (в опорном времени)
    pub day: DateTime<Utc>,
    /// Скорректированная метка первой выборки
    pub start_time: DateTime<Utc>,
    /// Частота дискретизации в Гц
    pub sample_rate: f64,
    /// Выборки по каналам
    pub channels: Vec<Vec<i32>>,
    /// Деградации этого сегмента (дрейф по блокам, нет калибровки)
    pub warnings: Vec<ReadWarning>,
}

/// Нарезчик файла на суточные сегменты.
pub struct DailySegmenter {
    model: DriftModel,
    cancel: Option<Arc<AtomicBool>>,
}

impl DailySegmenter {
    pub fn new(model: DriftModel) -> Self {
        Self {
            model,
            cancel: None,
        }
    }

    /// Флаг кооперативной отмены: проверяется между днями, начатый день
    /// дорабатывается до конца.
    pub fn with_cancel_flag(
        mut self,
        flag: Arc<AtomicBool>,
    ) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn model(&self) -> &DriftModel {
        &self.model
    }

    /// Прогоняет файл по дням, вызывая `emit` для каждого непустого дня.
    ///
    /// Возвращает количество выданных сегментов. Ошибка `emit`
    /// останавливает обработку файла; день без данных — не ошибка.
    pub fn run<R, F>(
        &self,
        reader: &mut LcheapoReader<R>,
        mut emit: F,
    ) -> LcheapoResult<usize>
    where
        R: Read + Seek,
        F: FnMut(DaySegment) -> LcheapoResult<()>,
    {
        let (file_start, file_end) = reader.time_range()?;
        let last_day = floor_to_day(file_end);

        let mut day = floor_to_day(file_start);
        let mut emitted = 0usize;

        while day <= last_day {
            if let Some(flag) = &self.cancel {
                if flag.load(Ordering::Relaxed) {
                    log::info!("cancelled before {}", day.format("%Y-%m-%d"));
                    break;
                }
            }

            match self.read_day(reader, day)? {
                Some(segment) => {
                    emit(segment)?;
                    emitted += 1;
                }
                None => {
                    log::debug!("{}: no overlapping samples, skipped", day.format("%Y-%m-%d"));
                }
            }

            day += Duration::days(1);
        }

        Ok(emitted)
    }

    /// Читает и корректирует окно одного дня.
    ///
    /// Окно `[day, day+86400)` задано в опорном времени и переводится в
    /// показания часов прибора перед поиском блоков.
    fn read_day<R: Read + Seek>(
        &self,
        reader: &mut LcheapoReader<R>,
        day: DateTime<Utc>,
    ) -> LcheapoResult<Option<DaySegment>> {
        let read_start = self.model.to_instrument(day);

        log::debug!(
            "{}, inst_offset = {:.3}s: reading from {}",
            day.format("%Y-%m-%d"),
            self.model.offset_at(day),
            read_start,
        );

        let window = match reader.read_window(
            TimeSpec::Absolute(read_start),
            TimeSpec::Offset(DAY_SECONDS),
        ) {
            Ok(w) => w,
            Err(LcheapoError::RangeNotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        let mut warnings = self.model.warnings();
        warnings.extend(window.warnings);

        Ok(Some(DaySegment {
            day,
            start_time: self.model.correct(window.start_time),
            sample_rate: window.sample_rate,
            channels: window.channels,
            warnings,
        }))
    }
}
