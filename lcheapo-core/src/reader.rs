//! Сессия чтения одного файла LCHEAPO
//!
//! Владеет источником и декодированным заголовком диска; границы данных
//! вычисляются один раз и кэшируются. Источник только читается, поэтому
//! независимые файлы (и независимые дни одного файла) можно обрабатывать
//! параллельными работниками — каждому свой экземпляр.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use chrono::{DateTime, Utc};

use lcheapo_types::{
    add_seconds, seconds_between, DiskHeader, LcheapoError, LcheapoResult, TimeSpec,
};

use crate::demux::{demux_window, DemuxedWindow};
use crate::format::{DiskHeaderExt, BLOCK_SIZE, DEFAULT_TIMING_TOLERANCE, DISK_HEADER_SIZE};
use crate::locate::{block_for_time, scan_layout, seek_block, FileLayout};

/// Сглаживание границ при пересчёте времени в номер выборки (секунды).
const TRIM_EPS: f64 = 1e-6;

/// Статистика, накопленная [`LcheapoReader`] за время жизни.
#[derive(Debug, Default, Clone)]
pub struct ReadStats {
    /// Прочитанных окон
    pub windows_read: u64,
    /// Прочитанных групп блоков
    pub groups_read: u64,
    /// Декодированных выборок (по всем каналам)
    pub samples_decoded: u64,
    /// Выданных предупреждений
    pub warnings_emitted: u64,
}

/// Читатель файлов LCHEAPO с произвольным доступом.
pub struct LcheapoReader<R: Read + Seek> {
    src: R,
    header: DiskHeader,
    layout: Option<FileLayout>,
    timing_tolerance: f64,
    stats: ReadStats,
}

impl LcheapoReader<File> {
    /// Открывает файл по пути.
    pub fn open<P: AsRef<Path>>(path: P) -> LcheapoResult<Self> {
        Self::new(File::open(path)?)
    }
}

impl<R: Read + Seek> LcheapoReader<R> {
    /// Создаёт читатель, декодируя и валидируя заголовок диска.
    pub fn new(mut src: R) -> LcheapoResult<Self> {
        let mut buf = [0u8; DISK_HEADER_SIZE];
        let mut got = 0usize;

        src.seek(SeekFrom::Start(0))?;
        while got < buf.len() {
            match src.read(&mut buf[got..])? {
                0 => break,
                n => got += n,
            }
        }

        if got < DISK_HEADER_SIZE {
            return Err(LcheapoError::TruncatedHeader {
                need: DISK_HEADER_SIZE,
                got,
            });
        }

        let header = DiskHeader::decode(&buf)?;

        Ok(Self {
            src,
            header,
            layout: None,
            timing_tolerance: DEFAULT_TIMING_TOLERANCE,
            stats: ReadStats::default(),
        })
    }

    /// Прочитанный и проверенный заголовок диска.
    pub fn header(&self) -> &DiskHeader {
        &self.header
    }

    /// Накопленная статистика чтения.
    pub fn stats(&self) -> &ReadStats {
        &self.stats
    }

    /// Допуск проверки непрерывности, в долях периода выборки.
    pub fn set_timing_tolerance(
        &mut self,
        fraction: f64,
    ) {
        self.timing_tolerance = fraction;
    }

    /// Границы данных файла: метки первой и последней полных групп.
    pub fn time_range(&mut self) -> LcheapoResult<(DateTime<Utc>, DateTime<Utc>)> {
        let layout = self.layout()?;

        Ok((layout.start, layout.end))
    }

    fn layout(&mut self) -> LcheapoResult<FileLayout> {
        if let Some(layout) = self.layout {
            return Ok(layout);
        }

        let layout = scan_layout(&mut self.src, &self.header)?;

        log::debug!(
            "file layout: start={}, end={}, {} groups x {} samples",
            layout.start,
            layout.end,
            layout.group_count,
            layout.samples_per_block,
        );

        self.layout = Some(layout);

        Ok(layout)
    }

    /// Читает окно `[start, end)` и возвращает поканальные выборки.
    ///
    /// Старт включительно, конец исключительно. `TimeSpec::Offset` для
    /// начала — секунды от начала файла, для конца — секунды от начала
    /// окна. Границы за пределами данных прижимаются; запрошенный конец
    /// на границе данных или дальше означает «до конца записи». Окно,
    /// не пересекающееся с данными, — [`LcheapoError::RangeNotFound`].
    pub fn read_window(
        &mut self,
        start: TimeSpec,
        end: TimeSpec,
    ) -> LcheapoResult<DemuxedWindow> {
        let layout = self.layout()?;
        let rate = self.header.sample_rate();

        let start = start.resolve(layout.start);
        let end = end.resolve(start);

        if end <= start {
            return Err(LcheapoError::range_not_found(format!(
                "window end {end} is not after start {start}"
            )));
        }
        if start > layout.end {
            return Err(LcheapoError::range_not_found(format!(
                "window starts at {start}, after the data end {}",
                layout.end
            )));
        }
        if end <= layout.start {
            return Err(LcheapoError::range_not_found(format!(
                "window ends at {end}, before the data start {}",
                layout.start
            )));
        }

        let requested_end = end;
        let start = start.max(layout.start);
        let end = end.min(layout.end);

        let n_chans = u64::from(self.header.channel_count);
        let n_start = block_for_time(&self.header, &layout, start);
        let n_end = block_for_time(&self.header, &layout, end) + n_chans - 1;

        let chan_blocks = (n_end - n_start + 1) / n_chans;
        let read_blocks = chan_blocks * n_chans;

        log::debug!(
            "read_window: first block {n_start} ({start}), last block {n_end}, {chan_blocks} groups"
        );

        seek_block(&mut self.src, n_start)?;

        let mut buf = vec![0u8; read_blocks as usize * BLOCK_SIZE];
        self.src.read_exact(&mut buf)?;

        let mut win = demux_window(
            &buf,
            self.header.channel_count,
            rate,
            self.timing_tolerance,
        )?;

        self.trim(&mut win, start, requested_end, layout.end)?;

        self.stats.windows_read += 1;
        self.stats.groups_read += chan_blocks;
        self.stats.warnings_emitted += win.warnings.len() as u64;
        self.stats.samples_decoded += win
            .channels
            .iter()
            .map(|c| c.len() as u64)
            .sum::<u64>();

        Ok(win)
    }

    /// Обрезает декодированные блоки до точности выборки.
    ///
    /// Блоки читаются целиком, затем отбрасываются выборки строго вне
    /// запрошенного окна. Конец, прижатый к границе данных, хвост не
    /// режет: прижатие означает «до конца записи».
    fn trim(
        &self,
        win: &mut DemuxedWindow,
        start: DateTime<Utc>,
        requested_end: DateTime<Utc>,
        file_end: DateTime<Utc>,
    ) -> LcheapoResult<()> {
        let rate = win.sample_rate;
        let total = win.channels.first().map_or(0, Vec::len);
        let first_time = win.start_time;

        let drop_front = {
            let ds = seconds_between(start, first_time);
            if ds <= 0.0 {
                0
            } else {
                ((ds * rate - TRIM_EPS).ceil() as usize).min(total)
            }
        };

        let keep_to = if requested_end >= file_end {
            total
        } else {
            let de = seconds_between(requested_end, first_time);
            (((de * rate - TRIM_EPS).ceil()).max(0.0) as usize).min(total)
        };

        if keep_to <= drop_front {
            return Err(LcheapoError::range_not_found(format!(
                "no samples in the requested window starting {start}"
            )));
        }

        for samples in &mut win.channels {
            samples.truncate(keep_to);
            samples.drain(..drop_front.min(samples.len()));
        }

        win.start_time = add_seconds(first_time, drop_front as f64 / rate);

        Ok(())
    }
}
