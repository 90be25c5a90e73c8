//! Библиотека основного формата LCHEAPO
//!
//! Эталонная реализация чтения файлов автономных донных регистраторов
//! LCHEAPO: поиск окна по времени, демультиплексирование 24-битных
//! выборок и коррекция дрейфа часов с посуточной нарезкой.
//!
//! # Быстрый старт
//!
//! ```no_run
//! use lcheapo_core::LcheapoReader;
//! use lcheapo_types::TimeSpec;
//!
//! let mut reader = LcheapoReader::open("station.raw.lch")?;
//! let (start, end) = reader.time_range()?;
//! println!("data: {start} - {end}");
//!
//! let window = reader.read_window(TimeSpec::Offset(0.0), TimeSpec::Offset(3600.0))?;
//! for (i, samples) in window.channels.iter().enumerate() {
//!     println!("channel {i}: {} samples", samples.len());
//! }
//! # Ok::<(), lcheapo_types::LcheapoError>(())
//! ```

pub mod demux;
pub mod drift;
pub mod format;
pub mod locate;
pub mod reader;
pub mod segment;
pub mod writer;

pub use demux::*;
pub use drift::*;
pub use format::*;
pub use locate::*;
pub use reader::*;
pub use segment::*;
pub use writer::*;

/// Версия библиотеки.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
