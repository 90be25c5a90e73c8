use thiserror::Error;

/// Результат для операций LCHEAPO
pub type LcheapoResult<T> = std::result::Result<T, LcheapoError>;

/// Типы ошибок формата LCHEAPO.
#[derive(Debug, Error)]
pub enum LcheapoError {
    /// Заголовок диска короче фиксированного размера
    #[error("Truncated header: got {got} bytes, need {need}")]
    TruncatedHeader { need: usize, got: usize },

    /// Ноль каналов в заголовке диска
    #[error("Invalid channel count: {0}")]
    InvalidChannelCount(u16),

    /// Файл не содержит ни одной полной группы блоков
    #[error("Empty file: no complete block group after the disk header")]
    EmptyFile,

    /// Запрошенное окно не пересекается с данными
    #[error("Range not found: {0}")]
    RangeNotFound(String),

    /// Поля времени блока не образуют валидную календарную дату
    #[error("Malformed timestamp: {0}")]
    MalformedTimestamp(String),

    /// Блок или буфер блоков неполон
    #[error("Truncated block data: got {got} bytes, need {need}")]
    TruncatedBlock { need: usize, got: usize },

    /// Нарушение спецификации формата
    #[error("Format violation: {0}")]
    FormatViolation(String),

    /// Ошибки ввода/вывода (автоконвертируются из std::io::Error)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LcheapoError {
    /// Удобные конструкторы
    pub fn range_not_found<S: Into<String>>(s: S) -> Self {
        Self::RangeNotFound(s.into())
    }

    pub fn malformed_timestamp<S: Into<String>>(s: S) -> Self {
        Self::MalformedTimestamp(s.into())
    }

    pub fn format_violation<S: Into<String>>(s: S) -> Self {
        Self::FormatViolation(s.into())
    }
}
