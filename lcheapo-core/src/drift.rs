//! Модель дрейфа часов прибора и коррекция високосных секунд
//!
//! Дрейф линеен: по двум парам «опорные часы / часы прибора» (начало и
//! конец развёртывания) вычисляются стартовое смещение и скорость
//! дрейфа. Високосные секунды заданы в терминах опорных часов, поэтому
//! коррекция применяется в фиксированном порядке: сначала високосные
//! секунды, затем обращение дрейфа.

use chrono::{DateTime, Utc};

use lcheapo_types::{add_seconds, parse_datetime, seconds_between, ReadWarning};

/// Калибровочные точки: опорные часы (обычно GPS) и часы прибора в
/// начале и в конце развёртывания.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftParameters {
    pub reference_start: DateTime<Utc>,
    pub reference_end: DateTime<Utc>,
    pub instrument_start: DateTime<Utc>,
    pub instrument_end: DateTime<Utc>,
}

impl DriftParameters {
    /// Смещение часов прибора на момент начала (секунды).
    pub fn start_offset(&self) -> f64 {
        seconds_between(self.instrument_start, self.reference_start)
    }

    /// Скорость дрейфа, безразмерная (секунда на секунду).
    pub fn drift_rate(&self) -> f64 {
        let end_offset = seconds_between(self.instrument_end, self.reference_end);

        (end_offset - self.start_offset())
            / seconds_between(self.reference_end, self.instrument_start)
    }
}

/// Вид события високосной секунды.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeapKind {
    /// Вставленная (дополнительная) секунда, `'+'`
    Insert,
    /// Удалённая секунда, `'-'`
    Remove,
}

impl LeapKind {
    pub fn from_char(c: char) -> Result<Self, String> {
        match c {
            '+' => Ok(LeapKind::Insert),
            '-' => Ok(LeapKind::Remove),
            _ => Err(format!("'{c}' is not a valid leapsecond type")),
        }
    }
}

/// Одно событие високосной секунды в опорном времени.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeapSecond {
    pub time: DateTime<Utc>,
    pub kind: LeapKind,
}

impl LeapSecond {
    /// Парсит метку события; `:60` в секундах нормализуется к `:59`
    /// той же минуты.
    pub fn parse(
        time: &str,
        kind: LeapKind,
    ) -> Result<Self, String> {
        let time = time.trim();

        // Быстрый и тупой обход проблемы second=60
        let normalized = if time.ends_with("60") && time.len() >= 3 {
            format!("{}59", &time[..time.len() - 2])
        } else {
            time.to_string()
        };

        Ok(LeapSecond {
            time: parse_datetime(&normalized)?,
            kind,
        })
    }
}

/// Модель коррекции времени прибора.
///
/// Без калибровочных точек дрейф нулевой, данные выдаются без
/// коррекции, а вызывающему один раз сообщается
/// [`ReadWarning::NoCalibration`].
#[derive(Debug, Clone)]
pub struct DriftModel {
    params: Option<DriftParameters>,
    leapseconds: Vec<LeapSecond>,
}

impl DriftModel {
    pub fn new(
        params: Option<DriftParameters>,
        leapseconds: Vec<LeapSecond>,
    ) -> Self {
        if let Some(p) = &params {
            log::info!(
                "instrument start offset = {}s, drift rate = {:.4e}",
                p.start_offset(),
                p.drift_rate(),
            );
        } else {
            log::warn!("{}", ReadWarning::NoCalibration);
        }

        Self { params, leapseconds }
    }

    /// Модель без коррекции (нулевое смещение и дрейф).
    pub fn uncalibrated() -> Self {
        Self::new(None, Vec::new())
    }

    pub fn is_calibrated(&self) -> bool {
        self.params.is_some()
    }

    /// Предупреждения о деградации, подлежащие доставке вызывающему.
    pub fn warnings(&self) -> Vec<ReadWarning> {
        if self.is_calibrated() {
            Vec::new()
        } else {
            vec![ReadWarning::NoCalibration]
        }
    }

    /// Смещение часов прибора в опорный момент `t_ref` (секунды),
    /// только дрейфовая часть.
    pub fn offset_at(&self, t_ref: DateTime<Utc>) -> f64 {
        match &self.params {
            Some(p) => {
                p.start_offset() + p.drift_rate() * seconds_between(t_ref, p.reference_start)
            }
            None => 0.0,
        }
    }

    /// Накопленная поправка високосных секунд к моменту `t` (секунды).
    ///
    /// Событие действует с `t >= время - 1 с`, чтобы не пересечься с
    /// самой вставленной секундой: всё после добавленной секунды
    /// становится на секунду раньше.
    pub fn leap_correction_at(&self, t: DateTime<Utc>) -> f64 {
        let mut correct = 0.0;

        for ls in &self.leapseconds {
            if seconds_between(t, ls.time) >= -1.0 {
                match ls.kind {
                    LeapKind::Insert => correct -= 1.0,
                    LeapKind::Remove => correct += 1.0,
                }
            }
        }

        correct
    }

    /// Переводит опорный момент в показание часов прибора.
    pub fn to_instrument(&self, t_ref: DateTime<Utc>) -> DateTime<Utc> {
        add_seconds(t_ref, self.offset_at(t_ref))
    }

    /// Корректирует показание часов прибора в опорное время.
    ///
    /// Сначала високосные секунды, затем точное обращение линейной
    /// карты дрейфа `t_inst = t_ref + offset_at(t_ref)`; на
    /// `instrument_start` сокращение точное.
    pub fn correct(&self, t_inst: DateTime<Utc>) -> DateTime<Utc> {
        let t = add_seconds(t_inst, self.leap_correction_at(t_inst));

        match &self.params {
            Some(p) => {
                let elapsed = seconds_between(t, p.reference_start) - p.start_offset();
                add_seconds(p.reference_start, elapsed / (1.0 + p.drift_rate()))
            }
            None => t,
        }
    }
}
