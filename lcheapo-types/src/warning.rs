/// Нефатальные деградации чтения и коррекции.
///
/// Предупреждения не блокируют выдачу данных: наблюдаемый дрейф часов —
/// информация о приборе, а не признак порчи файла, и данные без
/// калибровки всё равно полезнее отсутствия данных.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadWarning {
    /// Последняя группа блоков пришла раньше/позже расчётного времени
    TimingDrift {
        /// Отклонение в секундах (положительное — последний блок опоздал)
        offset_secs: f64,
        /// То же отклонение в выборках
        offset_samples: f64,
        /// То же отклонение в блоках
        offset_blocks: f64,
    },
    /// Калибровочные точки не заданы — выдача без коррекции часов
    NoCalibration,
}

impl std::fmt::Display for ReadWarning {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            ReadWarning::TimingDrift {
                offset_secs,
                offset_samples,
                offset_blocks,
            } => {
                if *offset_secs > 0.0 {
                    write!(
                        f,
                        "Last block late by {offset_secs:.6}s ({offset_samples:.3} samples, {offset_blocks:.4} blocks)"
                    )
                } else {
                    write!(
                        f,
                        "Last block early by {:.6}s ({:.3} samples, {:.4} blocks)",
                        -offset_secs, -offset_samples, -offset_blocks
                    )
                }
            }
            ReadWarning::NoCalibration => {
                write!(f, "Could not calculate clock drift, assuming zero!")
            }
        }
    }
}
