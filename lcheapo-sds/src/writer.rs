//! Запись суточных сегментов в дерево SDS
//!
//! Раскладка каталогов SeisComp Data Structure:
//! `SDS/<год>/<сеть>/<станция>/<канал>.D/<сеть>.<станция>.<loc>.<канал>.D.<год>.<день>`.
//! Формат полезной нагрузки архива внешний по отношению к ядру; штатная
//! реализация пишет выборки как big-endian i32 — кодировщик стандартного
//! сейсмического формата подключается той же чертой.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, WriteBytesExt};
use chrono::{DateTime, Utc};

use crate::error::SdsResult;

/// Идентификатор выходного сегмента.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentId {
    pub network: String,
    pub station: String,
    pub location: String,
    pub channel: String,
    pub year: i32,
    pub day_of_year: u32,
}

impl SegmentId {
    /// Имя файла сегмента: `NET.STA.LOC.CHAN.D.YEAR.DOY`.
    pub fn file_name(&self) -> String {
        format!(
            "{}.{}.{}.{}.D.{}.{:03}",
            self.network, self.station, self.location, self.channel, self.year, self.day_of_year
        )
    }

    /// Каталог сегмента внутри корня архива.
    pub fn dir_path(&self, root: &Path) -> PathBuf {
        root.join("SDS")
            .join(self.year.to_string())
            .join(&self.network)
            .join(&self.station)
            .join(format!("{}.D", self.channel))
    }
}

/// Приёмник скорректированных суточных сегментов.
///
/// Ядро отдаёт только выборки, скорректированное начало и частоту;
/// формат на диске определяет реализация.
pub trait SegmentWriter {
    fn write_segment(
        &mut self,
        id: &SegmentId,
        start_time: DateTime<Utc>,
        sample_rate: f64,
        samples: &[i32],
    ) -> SdsResult<PathBuf>;
}

/// Писатель сырых big-endian i32 в дерево SDS.
pub struct SdsTreeWriter {
    root: PathBuf,
}

impl SdsTreeWriter {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SegmentWriter for SdsTreeWriter {
    fn write_segment(
        &mut self,
        id: &SegmentId,
        start_time: DateTime<Utc>,
        sample_rate: f64,
        samples: &[i32],
    ) -> SdsResult<PathBuf> {
        let dir = id.dir_path(&self.root);
        fs::create_dir_all(&dir)?;

        let path = dir.join(id.file_name());
        let mut out = BufWriter::new(fs::File::create(&path)?);

        for &s in samples {
            out.write_i32::<BigEndian>(s)?;
        }
        out.flush()?;

        log::debug!(
            "{}: {} samples @ {sample_rate} Hz from {start_time}",
            path.display(),
            samples.len(),
        );

        Ok(path)
    }
}
