/// Заголовок одного блока данных (14 байт).
///
/// Надёжная метка времени есть только у первого блока группы; остальные
/// блоки группы покрывают то же самое окно выборок.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Миллисекунды внутри секунды
    pub milliseconds: u16,
    pub second: u8,
    pub minute: u8,
    pub hour: u8,
    pub day: u8,
    pub month: u8,
    /// Год, отсчитанный от 2000
    pub year_offset: u8,
    /// Количество выборок в блоке (обычно 166, меньше — только в
    /// последней группе файла)
    pub sample_count: u8,
}

/// Декодированный блок: заголовок + развёрнутые 24-битные выборки.
#[derive(Debug, Clone)]
pub struct DataBlock {
    pub header: BlockHeader,
    pub samples: Vec<i32>,
}
