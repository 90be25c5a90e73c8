//! Потоковый писатель файлов LCHEAPO
//!
//! Нужен тестовым стендам, примерам и генерации синтетических файлов:
//! штатный выход конвейера — внешний архивный формат, а не повторная
//! запись сырого формата.

use std::io::{BufWriter, Seek, Write};

use chrono::{DateTime, Utc};

use lcheapo_types::{BlockHeader, DiskHeader, LcheapoError, LcheapoResult};

use crate::format::{
    encode_block, BlockHeaderExt, DiskHeaderExt, BLOCK_SIZE, DISK_HEADER_SIZE,
    SAMPLES_PER_BLOCK,
};

/// Писатель мультиплексированных групп блоков.
pub struct LcheapoWriter<W: Write + Seek> {
    writer: BufWriter<W>,
    header: DiskHeader,
    groups_written: u64,
}

impl<W: Write + Seek> LcheapoWriter<W> {
    /// Создаёт писатель, немедленно записывая заголовок диска и
    /// заполняя нулями место до первого блока данных.
    pub fn new(
        inner: W,
        header: DiskHeader,
    ) -> LcheapoResult<Self> {
        if header.channel_count == 0 {
            return Err(LcheapoError::InvalidChannelCount(0));
        }
        if header.data_start_block == 0 {
            return Err(LcheapoError::format_violation(
                "data_start_block 0 overlaps the disk header",
            ));
        }

        let mut writer = BufWriter::new(inner);

        writer.write_all(&header.encode())?;

        let pad = header.data_start_block as usize * BLOCK_SIZE - DISK_HEADER_SIZE;
        if pad > 0 {
            writer.write_all(&vec![0u8; pad])?;
        }

        Ok(Self {
            writer,
            header,
            groups_written: 0,
        })
    }

    /// Записывает одну группу: по блоку на канал с общей меткой времени.
    ///
    /// Все каналы должны содержать одинаковое число выборок (не более
    /// 166); меньше 166 допустимо только в последней группе файла.
    pub fn write_group(
        &mut self,
        time: DateTime<Utc>,
        channels: &[Vec<i32>],
    ) -> LcheapoResult<()> {
        if channels.len() != usize::from(self.header.channel_count) {
            return Err(LcheapoError::format_violation(format!(
                "{} channels supplied, header declares {}",
                channels.len(),
                self.header.channel_count
            )));
        }

        let count = channels[0].len();

        if count == 0 || count > SAMPLES_PER_BLOCK {
            return Err(LcheapoError::format_violation(format!(
                "group sample count {count} is outside 1..={SAMPLES_PER_BLOCK}"
            )));
        }
        if channels.iter().any(|c| c.len() != count) {
            return Err(LcheapoError::format_violation(
                "channels of one group must hold the same sample count",
            ));
        }

        let block_header = BlockHeader::from_timestamp(time, count as u8)?;

        for samples in channels {
            self.writer.write_all(&encode_block(&block_header, samples)?)?;
        }

        self.groups_written += 1;

        Ok(())
    }

    /// Количество записанных групп блоков.
    pub fn groups_written(&self) -> u64 {
        self.groups_written
    }

    /// Ссылка на заголовок диска.
    pub fn header(&self) -> &DiskHeader {
        &self.header
    }

    /// Завершает запись: сбрасывает буфер и возвращает источник.
    pub fn finish(self) -> LcheapoResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| LcheapoError::Io(e.into_error()))
    }
}
