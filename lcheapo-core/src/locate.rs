//! Поиск блока по времени и границ данных файла
//!
//! Группы блоков идут непрерывно и равномерно по номинальному шагу,
//! поэтому номер блока вычисляется арифметикой за O(1), без
//! сканирования. Накопленный за файл дрейф часов считается не больше
//! одного блока; фактическую непрерывность перепроверяет
//! демультиплексор.

use std::io::{Read, Seek, SeekFrom};

use chrono::{DateTime, Utc};

use lcheapo_types::{
    seconds_between, BlockHeader, DiskHeader, LcheapoError, LcheapoResult,
};

use crate::format::{BlockHeaderExt, BLOCK_HEADER_SIZE, BLOCK_SIZE};

/// Компенсация микросекундного квантования меток времени при делении
/// на длину блока: момент ровно на границе выбирает свой блок.
const BLOCK_BOUNDARY_EPS: f64 = 1e-4;

/// Кэшируемая раскладка данных файла.
#[derive(Debug, Clone, Copy)]
pub struct FileLayout {
    /// Метка времени первой группы блоков
    pub start: DateTime<Utc>,
    /// Метка времени последней полной группы блоков
    pub end: DateTime<Utc>,
    /// Выборок в блоке (из первого заголовка)
    pub samples_per_block: u8,
    /// Количество полных групп; неполный хвост файла не считается
    pub group_count: u64,
}

impl FileLayout {
    /// Длительность одного блока в секундах.
    pub fn seconds_per_block(&self, sample_rate: f64) -> f64 {
        f64::from(self.samples_per_block) / sample_rate
    }

    /// Абсолютный номер первого блока последней полной группы.
    pub fn last_group_block(&self, header: &DiskHeader) -> u64 {
        header.data_start_block + (self.group_count - 1) * u64::from(header.channel_count)
    }
}

/// Позиционирует источник на начало блока `block`.
pub fn seek_block<S: Seek>(
    src: &mut S,
    block: u64,
) -> std::io::Result<u64> {
    src.seek(SeekFrom::Start(block * BLOCK_SIZE as u64))
}

/// Читает заголовок блока `block`.
pub fn read_block_header<R: Read + Seek>(
    src: &mut R,
    block: u64,
) -> LcheapoResult<BlockHeader> {
    let mut buf = [0u8; BLOCK_HEADER_SIZE];

    seek_block(src, block)?;
    src.read_exact(&mut buf)?;

    BlockHeader::decode(&buf)
}

/// Определяет границы данных файла чтением первой и последней групп.
///
/// Количество групп берётся из длины файла; усечённая последняя группа
/// (обрыв записи) исключается. [`LcheapoError::EmptyFile`], если после
/// заголовка диска нет ни одной полной группы.
pub fn scan_layout<R: Read + Seek>(
    src: &mut R,
    header: &DiskHeader,
) -> LcheapoResult<FileLayout> {
    let n_chans = u64::from(header.channel_count);
    let file_len = src.seek(SeekFrom::End(0))?;

    let data_bytes = file_len.saturating_sub(header.data_start_block * BLOCK_SIZE as u64);
    let group_count = data_bytes / (BLOCK_SIZE as u64 * n_chans);

    if group_count == 0 {
        return Err(LcheapoError::EmptyFile);
    }

    let first = read_block_header(src, header.data_start_block)?;

    if first.sample_count == 0 {
        return Err(LcheapoError::format_violation(
            "first data block declares zero samples",
        ));
    }

    let last_block = header.data_start_block + (group_count - 1) * n_chans;
    let last = read_block_header(src, last_block)?;

    Ok(FileLayout {
        start: first.timestamp()?,
        end: last.timestamp()?,
        samples_per_block: first.sample_count,
        group_count,
    })
}

/// Номер первого блока группы, содержащей момент `t`.
///
/// Чистая арифметика: `data_start + floor(dt / block_len) * channel_count`.
/// Момент до начала данных прижимается к первой группе, после конца —
/// к последней.
pub fn block_for_time(
    header: &DiskHeader,
    layout: &FileLayout,
    t: DateTime<Utc>,
) -> u64 {
    let block_len_s = layout.seconds_per_block(header.sample_rate());
    let dt = seconds_between(t, layout.start);

    let record_offset = if dt <= 0.0 {
        0
    } else {
        ((dt / block_len_s + BLOCK_BOUNDARY_EPS).floor() as u64).min(layout.group_count - 1)
    };

    header.data_start_block + record_offset * u64::from(header.channel_count)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use chrono::TimeZone;

    use super::*;
    use crate::format::{DiskHeaderExt, SAMPLES_PER_BLOCK};
    use crate::writer::LcheapoWriter;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2010, 6, 20, 0, 0, 0).unwrap()
            + chrono::Duration::milliseconds(280)
    }

    fn make_header() -> DiskHeader {
        DiskHeader {
            channel_count: 4,
            nominal_sample_rate: 200,
            real_sample_rate: 200.0,
            data_start_block: 1,
            description: String::new(),
        }
    }

    /// Файл из `groups` полных групп по 4 канала, 200 Гц.
    fn make_file(groups: u64) -> Vec<u8> {
        let header = make_header();
        let cursor = Cursor::new(Vec::new());
        let mut writer = LcheapoWriter::new(cursor, header).unwrap();
        let block_len_s = SAMPLES_PER_BLOCK as f64 / 200.0;

        for g in 0..groups {
            let time = lcheapo_types::add_seconds(t0(), g as f64 * block_len_s);
            let channels: Vec<Vec<i32>> =
                (0..4).map(|c| vec![c as i32; SAMPLES_PER_BLOCK]).collect();
            writer.write_group(time, &channels).unwrap();
        }

        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_scan_layout_two_groups() {
        let raw = make_file(2);
        let header = make_header();
        let mut src = Cursor::new(raw);

        let layout = scan_layout(&mut src, &header).unwrap();

        assert_eq!(layout.group_count, 2);
        assert_eq!(layout.samples_per_block, SAMPLES_PER_BLOCK as u8);
        assert_eq!(layout.start, t0());
        assert_eq!(layout.end, lcheapo_types::add_seconds(t0(), 0.83));
        assert_eq!(layout.last_group_block(&header), 5);
    }

    #[test]
    fn test_scan_layout_excludes_truncated_group() {
        let mut raw = make_file(3);
        // Обрываем последнюю группу посередине
        raw.truncate(raw.len() - 2 * BLOCK_SIZE);

        let header = make_header();
        let layout = scan_layout(&mut Cursor::new(raw), &header).unwrap();

        assert_eq!(layout.group_count, 2);
        assert_eq!(layout.end, lcheapo_types::add_seconds(t0(), 0.83));
    }

    #[test]
    fn test_scan_layout_empty_file() {
        let header = make_header();
        let raw = header.encode().to_vec();

        assert!(matches!(
            scan_layout(&mut Cursor::new(raw), &header),
            Err(LcheapoError::EmptyFile)
        ));
    }

    #[test]
    fn test_block_for_time_boundaries() {
        let raw = make_file(3);
        let header = make_header();
        let layout = scan_layout(&mut Cursor::new(raw), &header).unwrap();

        // Начало файла -> первый блок данных
        assert_eq!(block_for_time(&header, &layout, layout.start), 1);

        // Конец файла -> первый блок последней группы
        assert_eq!(
            block_for_time(&header, &layout, layout.end),
            layout.last_group_block(&header)
        );

        // Ровно на границе второй группы -> вторая группа (включительно)
        let boundary = lcheapo_types::add_seconds(layout.start, 0.83);
        assert_eq!(block_for_time(&header, &layout, boundary), 5);

        // Внутри второй группы
        let inside = lcheapo_types::add_seconds(layout.start, 1.0);
        assert_eq!(block_for_time(&header, &layout, inside), 5);
    }

    #[test]
    fn test_block_for_time_clamps() {
        let raw = make_file(2);
        let header = make_header();
        let layout = scan_layout(&mut Cursor::new(raw), &header).unwrap();

        let before = lcheapo_types::add_seconds(layout.start, -100.0);
        let after = lcheapo_types::add_seconds(layout.end, 100.0);

        assert_eq!(block_for_time(&header, &layout, before), 1);
        assert_eq!(
            block_for_time(&header, &layout, after),
            layout.last_group_block(&header)
        );
    }
}
