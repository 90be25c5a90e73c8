//! Демультиплексирование групп блоков в поканальные последовательности
//!
//! Вход — буфер из целого числа групп; блоки `[g, g+1, …]` группы
//! соответствуют каналам `[0..channel_count)` одного окна времени.
//! Надёжная метка времени есть только у первого блока группы.

use chrono::{DateTime, Utc};

use lcheapo_types::{seconds_between, BlockHeader, LcheapoError, LcheapoResult, ReadWarning};

use crate::format::{
    decode_payload, BlockHeaderExt, BLOCK_HEADER_SIZE, BLOCK_SIZE, SAMPLES_PER_BLOCK,
};

/// Результат демультиплексирования: общий штамп времени и частоты плюс
/// упорядоченные выборки каждого канала.
#[derive(Debug, Clone)]
pub struct DemuxedWindow {
    /// Метка времени первой выборки (из заголовка первого блока)
    pub start_time: DateTime<Utc>,
    /// Частота дискретизации в Гц
    pub sample_rate: f64,
    /// Выборки по каналам, индекс — номер канала в группе
    pub channels: Vec<Vec<i32>>,
    /// Нефатальные замечания (непрерывность по времени)
    pub warnings: Vec<ReadWarning>,
}

/// Собирает каналы из буфера, покрывающего целое число групп блоков.
///
/// После сборки сверяет ожидаемое время `(groups - 1) * блок/частота` с
/// фактическим (метка последней группы минус метка первой): отклонение
/// сверх `timing_tolerance` долей периода выборки — предупреждение
/// [`ReadWarning::TimingDrift`], данные при этом возвращаются.
pub fn demux_window(
    buf: &[u8],
    channel_count: u16,
    sample_rate: f64,
    timing_tolerance: f64,
) -> LcheapoResult<DemuxedWindow> {
    let n = usize::from(channel_count);

    if n == 0 {
        return Err(LcheapoError::InvalidChannelCount(0));
    }

    let group_bytes = BLOCK_SIZE * n;

    if buf.is_empty() || buf.len() % group_bytes != 0 {
        return Err(LcheapoError::TruncatedBlock {
            need: buf.len().div_ceil(group_bytes).max(1) * group_bytes,
            got: buf.len(),
        });
    }

    let groups = buf.len() / group_bytes;
    let first = BlockHeader::decode(&buf[..BLOCK_HEADER_SIZE])?;
    let start_time = first.timestamp()?;

    let mut warnings = Vec::new();

    if groups > 1 {
        let last_off = (groups - 1) * group_bytes;
        let last = BlockHeader::decode(&buf[last_off..last_off + BLOCK_HEADER_SIZE])?;
        let s_per_block = f64::from(first.sample_count) / sample_rate;

        let expected = (groups - 1) as f64 * s_per_block;
        let actual = seconds_between(last.timestamp()?, start_time);
        let offset = actual - expected;

        if offset.abs() > timing_tolerance / sample_rate {
            let warning = ReadWarning::TimingDrift {
                offset_secs: offset,
                offset_samples: offset * sample_rate,
                offset_blocks: offset / s_per_block,
            };
            log::warn!("{warning}");
            warnings.push(warning);
        }
    }

    let mut channels = Vec::with_capacity(n);

    for c in 0..n {
        let mut samples = Vec::with_capacity(groups * SAMPLES_PER_BLOCK);

        for g in 0..groups {
            let off = (g * n + c) * BLOCK_SIZE;
            let header = BlockHeader::decode(&buf[off..off + BLOCK_HEADER_SIZE])?;
            let payload = decode_payload(&buf[off + BLOCK_HEADER_SIZE..off + BLOCK_SIZE])?;
            let count = usize::from(header.sample_count).min(SAMPLES_PER_BLOCK);

            samples.extend_from_slice(&payload[..count]);
        }

        channels.push(samples);
    }

    Ok(DemuxedWindow {
        start_time,
        sample_rate,
        channels,
        warnings,
    })
}
