//! Спецификация бинарного формата файлов LCHEAPO
//!
//! Файл: заголовок диска (один 512-байтовый блок), затем непрерывные
//! 512-байтовые блоки данных, сгруппированные по `channel_count` штук.
//! Блок = 14-байтовый заголовок времени + 498 байт упакованных 24-битных
//! выборок. Все многобайтовые числа хранятся в порядке big-endian.

use byteorder::{BigEndian, ByteOrder};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike, Utc};

use lcheapo_types::{BlockHeader, DataBlock, DiskHeader, LcheapoError, LcheapoResult};

/// Размер блока данных (байт)
pub const BLOCK_SIZE: usize = 512;

/// Размер заголовка блока (байт)
pub const BLOCK_HEADER_SIZE: usize = 14;

/// Размер полезной нагрузки блока (байт)
pub const BLOCK_PAYLOAD_SIZE: usize = BLOCK_SIZE - BLOCK_HEADER_SIZE;

/// Выборок в полном блоке: 498 / 3 байта на выборку
pub const SAMPLES_PER_BLOCK: usize = BLOCK_PAYLOAD_SIZE / 3;

/// Размер заголовка диска (один блок)
pub const DISK_HEADER_SIZE: usize = 512;

/// Допуск проверки непрерывности — доля одного периода выборки
pub const DEFAULT_TIMING_TOLERANCE: f64 = 0.1;

/// Диапазон 24-битной выборки (two's complement)
pub const SAMPLE_MIN: i32 = -(1 << 23);
pub const SAMPLE_MAX: i32 = (1 << 23) - 1;

/// Кодек заголовка диска поверх [`DiskHeader`].
///
/// Раскладка (big-endian): `[0..2)` channel_count, `[2..6)` номинальная
/// частота, `[6..14)` реальная частота (IEEE 754), `[14..22)` номер
/// первого блока данных, `[22..86)` описание (NUL-паддинг), остальное
/// зарезервировано.
pub trait DiskHeaderExt: Sized {
    fn decode(buf: &[u8]) -> LcheapoResult<Self>;
    fn encode(&self) -> [u8; DISK_HEADER_SIZE];
}

impl DiskHeaderExt for DiskHeader {
    fn decode(buf: &[u8]) -> LcheapoResult<Self> {
        if buf.len() < DISK_HEADER_SIZE {
            return Err(LcheapoError::TruncatedHeader {
                need: DISK_HEADER_SIZE,
                got: buf.len(),
            });
        }

        let channel_count = BigEndian::read_u16(&buf[0..2]);

        if channel_count == 0 {
            return Err(LcheapoError::InvalidChannelCount(0));
        }

        let nominal_sample_rate = BigEndian::read_u32(&buf[2..6]);
        let real_sample_rate = BigEndian::read_f64(&buf[6..14]);
        let data_start_block = BigEndian::read_u64(&buf[14..22]);

        let desc_raw = &buf[22..86];
        let desc_end = desc_raw.iter().position(|&b| b == 0).unwrap_or(desc_raw.len());
        let description = String::from_utf8_lossy(&desc_raw[..desc_end]).to_string();

        Ok(DiskHeader {
            channel_count,
            nominal_sample_rate,
            real_sample_rate,
            data_start_block,
            description,
        })
    }

    fn encode(&self) -> [u8; DISK_HEADER_SIZE] {
        let mut buf = [0u8; DISK_HEADER_SIZE];

        BigEndian::write_u16(&mut buf[0..2], self.channel_count);
        BigEndian::write_u32(&mut buf[2..6], self.nominal_sample_rate);
        BigEndian::write_f64(&mut buf[6..14], self.real_sample_rate);
        BigEndian::write_u64(&mut buf[14..22], self.data_start_block);

        let desc = self.description.as_bytes();
        let n = desc.len().min(64);
        buf[22..22 + n].copy_from_slice(&desc[..n]);

        buf
    }
}

/// Кодек заголовка блока поверх [`BlockHeader`].
///
/// Раскладка (14 байт): `[0..2)` миллисекунды u16, `[2]` секунда,
/// `[3]` минута, `[4]` час, `[5]` день, `[6]` месяц, `[7]` год-2000,
/// `[8..13)` зарезервировано, `[13]` количество выборок.
pub trait BlockHeaderExt: Sized {
    fn decode(buf: &[u8]) -> LcheapoResult<Self>;
    fn encode(&self) -> [u8; BLOCK_HEADER_SIZE];
    fn timestamp(&self) -> LcheapoResult<DateTime<Utc>>;
    fn from_timestamp(time: DateTime<Utc>, sample_count: u8) -> LcheapoResult<Self>;
}

impl BlockHeaderExt for BlockHeader {
    fn decode(buf: &[u8]) -> LcheapoResult<Self> {
        if buf.len() < BLOCK_HEADER_SIZE {
            return Err(LcheapoError::TruncatedBlock {
                need: BLOCK_HEADER_SIZE,
                got: buf.len(),
            });
        }

        Ok(BlockHeader {
            milliseconds: BigEndian::read_u16(&buf[0..2]),
            second: buf[2],
            minute: buf[3],
            hour: buf[4],
            day: buf[5],
            month: buf[6],
            year_offset: buf[7],
            sample_count: buf[13],
        })
    }

    fn encode(&self) -> [u8; BLOCK_HEADER_SIZE] {
        let mut buf = [0u8; BLOCK_HEADER_SIZE];

        BigEndian::write_u16(&mut buf[0..2], self.milliseconds);
        buf[2] = self.second;
        buf[3] = self.minute;
        buf[4] = self.hour;
        buf[5] = self.day;
        buf[6] = self.month;
        buf[7] = self.year_offset;
        buf[13] = self.sample_count;

        buf
    }

    /// Собирает метку времени из календарных полей заголовка.
    fn timestamp(&self) -> LcheapoResult<DateTime<Utc>> {
        let date = NaiveDate::from_ymd_opt(
            2000 + i32::from(self.year_offset),
            u32::from(self.month),
            u32::from(self.day),
        );
        let time = NaiveTime::from_hms_milli_opt(
            u32::from(self.hour),
            u32::from(self.minute),
            u32::from(self.second),
            u32::from(self.milliseconds),
        );

        match (date, time) {
            (Some(d), Some(t)) => Ok(d.and_time(t).and_utc()),
            _ => Err(LcheapoError::malformed_timestamp(format!(
                "header fields= {}, {}, {}, {}, {}, {}, {}",
                2000 + i32::from(self.year_offset),
                self.month,
                self.day,
                self.hour,
                self.minute,
                self.second,
                self.milliseconds,
            ))),
        }
    }

    fn from_timestamp(
        time: DateTime<Utc>,
        sample_count: u8,
    ) -> LcheapoResult<Self> {
        let year = time.year();

        if !(2000..=2255).contains(&year) {
            return Err(LcheapoError::malformed_timestamp(format!(
                "year {year} is outside the 2000..=2255 range of the format"
            )));
        }

        Ok(BlockHeader {
            milliseconds: time.timestamp_subsec_millis() as u16,
            second: time.second() as u8,
            minute: time.minute() as u8,
            hour: time.hour() as u8,
            day: time.day() as u8,
            month: time.month() as u8,
            year_offset: (year - 2000) as u8,
            sample_count,
        })
    }
}

/// Разворачивает 498-байтовую полезную нагрузку в 166 выборок i32.
pub fn decode_payload(buf: &[u8]) -> LcheapoResult<Vec<i32>> {
    if buf.len() < BLOCK_PAYLOAD_SIZE {
        return Err(LcheapoError::TruncatedBlock {
            need: BLOCK_PAYLOAD_SIZE,
            got: buf.len(),
        });
    }

    let mut samples = Vec::with_capacity(SAMPLES_PER_BLOCK);

    for chunk in buf[..BLOCK_PAYLOAD_SIZE].chunks_exact(3) {
        samples.push(BigEndian::read_i24(chunk));
    }

    Ok(samples)
}

/// Упаковывает до 166 выборок в 498-байтовую полезную нагрузку.
///
/// Недостающий хвост заполняется нулями.
pub fn encode_payload(samples: &[i32]) -> LcheapoResult<[u8; BLOCK_PAYLOAD_SIZE]> {
    if samples.len() > SAMPLES_PER_BLOCK {
        return Err(LcheapoError::format_violation(format!(
            "{} samples do not fit a {SAMPLES_PER_BLOCK}-sample block",
            samples.len()
        )));
    }

    let mut buf = [0u8; BLOCK_PAYLOAD_SIZE];

    for (i, &s) in samples.iter().enumerate() {
        if !(SAMPLE_MIN..=SAMPLE_MAX).contains(&s) {
            return Err(LcheapoError::format_violation(format!(
                "sample {s} exceeds the 24-bit range"
            )));
        }
        BigEndian::write_i24(&mut buf[i * 3..i * 3 + 3], s);
    }

    Ok(buf)
}

/// Декодирует один 512-байтовый блок целиком.
///
/// Выборок возвращается ровно `sample_count` из заголовка.
pub fn decode_block(buf: &[u8]) -> LcheapoResult<DataBlock> {
    if buf.len() < BLOCK_SIZE {
        return Err(LcheapoError::TruncatedBlock {
            need: BLOCK_SIZE,
            got: buf.len(),
        });
    }

    let header = BlockHeader::decode(&buf[..BLOCK_HEADER_SIZE])?;
    let mut samples = decode_payload(&buf[BLOCK_HEADER_SIZE..BLOCK_SIZE])?;

    samples.truncate(usize::from(header.sample_count).min(SAMPLES_PER_BLOCK));

    Ok(DataBlock { header, samples })
}

/// Кодирует заголовок и выборки в один 512-байтовый блок.
pub fn encode_block(
    header: &BlockHeader,
    samples: &[i32],
) -> LcheapoResult<[u8; BLOCK_SIZE]> {
    let mut buf = [0u8; BLOCK_SIZE];

    buf[..BLOCK_HEADER_SIZE].copy_from_slice(&header.encode());
    buf[BLOCK_HEADER_SIZE..].copy_from_slice(&encode_payload(samples)?);

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn make_disk_header() -> DiskHeader {
        DiskHeader {
            channel_count: 4,
            nominal_sample_rate: 200,
            real_sample_rate: 200.0,
            data_start_block: 1,
            description: "SPOBS2 test deployment".to_string(),
        }
    }

    #[test]
    fn test_disk_header_round_trip() {
        let header = make_disk_header();
        let bytes = header.encode();
        let decoded = DiskHeader::decode(&bytes).unwrap();

        assert_eq!(decoded.channel_count, 4);
        assert_eq!(decoded.nominal_sample_rate, 200);
        assert_eq!(decoded.real_sample_rate, 200.0);
        assert_eq!(decoded.data_start_block, 1);
        assert_eq!(decoded.description, "SPOBS2 test deployment");
    }

    #[test]
    fn test_disk_header_byte_layout() {
        let mut header = make_disk_header();
        header.channel_count = 0x0102;
        header.nominal_sample_rate = 0x0A0B0C0D;

        let bytes = header.encode();

        assert_eq!(&bytes[0..2], &[0x01, 0x02], "channel_count BE");
        assert_eq!(&bytes[2..6], &[0x0A, 0x0B, 0x0C, 0x0D], "nominal rate BE");
    }

    #[test]
    fn test_disk_header_truncated() {
        let result = DiskHeader::decode(&[0u8; 100]);

        assert!(matches!(
            result,
            Err(LcheapoError::TruncatedHeader { need: 512, got: 100 })
        ));
    }

    #[test]
    fn test_disk_header_zero_channels() {
        let bytes = [0u8; DISK_HEADER_SIZE];

        assert!(matches!(
            DiskHeader::decode(&bytes),
            Err(LcheapoError::InvalidChannelCount(0))
        ));
    }

    #[test]
    fn test_disk_header_real_rate_fallback() {
        let mut header = make_disk_header();
        header.real_sample_rate = 0.0;

        let decoded = DiskHeader::decode(&header.encode()).unwrap();

        assert_eq!(decoded.sample_rate(), 200.0);
    }

    #[test]
    fn test_block_header_round_trip() {
        let t = Utc.with_ymd_and_hms(2010, 6, 20, 0, 0, 0).unwrap()
            + chrono::Duration::milliseconds(280);
        let header = BlockHeader::from_timestamp(t, 166).unwrap();
        let decoded = BlockHeader::decode(&header.encode()).unwrap();

        assert_eq!(decoded, header);
        assert_eq!(decoded.timestamp().unwrap(), t);
        assert_eq!(decoded.sample_count, 166);
    }

    #[test]
    fn test_block_header_byte_layout() {
        let t = Utc.with_ymd_and_hms(2010, 6, 20, 1, 2, 3).unwrap()
            + chrono::Duration::milliseconds(280);
        let bytes = BlockHeader::from_timestamp(t, 166).unwrap().encode();

        // 280 мс = 0x0118
        assert_eq!(&bytes[0..2], &[0x01, 0x18], "milliseconds BE");
        assert_eq!(bytes[2], 3, "second");
        assert_eq!(bytes[3], 2, "minute");
        assert_eq!(bytes[4], 1, "hour");
        assert_eq!(bytes[5], 20, "day");
        assert_eq!(bytes[6], 6, "month");
        assert_eq!(bytes[7], 10, "year-2000");
        assert_eq!(bytes[13], 166, "sample_count");
    }

    #[test]
    fn test_block_header_malformed_timestamp() {
        let header = BlockHeader {
            milliseconds: 0,
            second: 0,
            minute: 0,
            hour: 0,
            day: 31,
            month: 13, // нет такого месяца
            year_offset: 10,
            sample_count: 166,
        };

        assert!(matches!(
            header.timestamp(),
            Err(LcheapoError::MalformedTimestamp(_))
        ));
    }

    #[test]
    fn test_payload_round_trip_24bit_fidelity() {
        let mut samples: Vec<i32> = (0..SAMPLES_PER_BLOCK as i32).map(|i| i * 7 - 500).collect();
        samples[0] = SAMPLE_MIN;
        samples[1] = SAMPLE_MAX;
        samples[2] = -1;
        samples[3] = 0;

        let encoded = encode_payload(&samples).unwrap();
        let decoded = decode_payload(&encoded).unwrap();

        assert_eq!(decoded, samples);
    }

    #[test]
    fn test_payload_sign_extension() {
        // 0xFFFFFF = -1, 0x800000 = -2^23, 0x7FFFFF = 2^23-1
        let mut buf = [0u8; BLOCK_PAYLOAD_SIZE];
        buf[0..3].copy_from_slice(&[0xFF, 0xFF, 0xFF]);
        buf[3..6].copy_from_slice(&[0x80, 0x00, 0x00]);
        buf[6..9].copy_from_slice(&[0x7F, 0xFF, 0xFF]);

        let decoded = decode_payload(&buf).unwrap();

        assert_eq!(decoded[0], -1);
        assert_eq!(decoded[1], SAMPLE_MIN);
        assert_eq!(decoded[2], SAMPLE_MAX);
        assert_eq!(decoded.len(), SAMPLES_PER_BLOCK);
    }

    #[test]
    fn test_payload_range_check() {
        assert!(encode_payload(&[SAMPLE_MAX + 1]).is_err());
        assert!(encode_payload(&[SAMPLE_MIN - 1]).is_err());
    }

    #[test]
    fn test_block_round_trip_partial_count() {
        let t = Utc.with_ymd_and_hms(2012, 1, 1, 0, 0, 0).unwrap();
        let header = BlockHeader::from_timestamp(t, 100).unwrap();
        let samples: Vec<i32> = (0..100).collect();

        let bytes = encode_block(&header, &samples).unwrap();
        let block = decode_block(&bytes).unwrap();

        assert_eq!(block.header.sample_count, 100);
        assert_eq!(block.samples, samples);
    }
}
