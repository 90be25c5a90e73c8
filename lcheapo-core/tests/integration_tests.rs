use std::io::Cursor;

use chrono::{DateTime, TimeZone, Utc};

use lcheapo_core::{
    block_for_time, scan_layout, BlockHeaderExt, DailySegmenter, DiskHeaderExt, DriftModel,
    DriftParameters, LcheapoReader, LcheapoWriter, BLOCK_SIZE, SAMPLES_PER_BLOCK,
};
use lcheapo_types::{
    add_seconds, seconds_between, BlockHeader, DiskHeader, LcheapoError, TimeSpec,
};
use tempfile::NamedTempFile;

// ===========================================================================
// Helpers — детерминированные тест-данные
// ===========================================================================

/// Начало эталонного файла: 2010-06-20T00:00:00.280Z.
fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2010, 6, 20, 0, 0, 0).unwrap() + chrono::Duration::milliseconds(280)
}

fn spobs2_header() -> DiskHeader {
    DiskHeader {
        channel_count: 4,
        nominal_sample_rate: 200,
        real_sample_rate: 200.0,
        data_start_block: 1,
        description: "SPOBS2 bench deployment".to_string(),
    }
}

/// Строит эталонный 4-канальный файл 200 Гц (Test Vector #1).
///
/// `groups` групп по 166 выборок; выборка `i` канала `c` группы `g`
/// равна `c*100_000 + g*166 + i` — порядок проверяется побайтово.
fn build_test_vector(groups: u64) -> Vec<u8> {
    let mut writer = LcheapoWriter::new(Cursor::new(Vec::new()), spobs2_header()).unwrap();
    let block_len_s = SAMPLES_PER_BLOCK as f64 / 200.0;

    for g in 0..groups {
        let time = add_seconds(t0(), g as f64 * block_len_s);
        let channels: Vec<Vec<i32>> = (0..4)
            .map(|c| {
                (0..SAMPLES_PER_BLOCK)
                    .map(|i| (c * 100_000 + g as usize * SAMPLES_PER_BLOCK + i) as i32)
                    .collect()
            })
            .collect();
        writer.write_group(time, &channels).unwrap();
    }

    writer.finish().unwrap().into_inner()
}

// ===========================================================================
// Test Vector #1 — двухгрупповой эталонный файл
// ===========================================================================

#[test]
fn test_vector_byte_layout() {
    let raw = build_test_vector(2);

    // Заголовок диска
    assert_eq!(&raw[0..2], &[0x00, 0x04], "channel_count BE");
    assert_eq!(&raw[2..6], &[0x00, 0x00, 0x00, 0xC8], "nominal rate 200 BE");

    // Первый блок данных — блок 1
    let b0 = &raw[BLOCK_SIZE..2 * BLOCK_SIZE];
    assert_eq!(&b0[0..2], &[0x01, 0x18], "280 ms BE");
    assert_eq!(b0[5], 20, "day");
    assert_eq!(b0[6], 6, "month");
    assert_eq!(b0[7], 10, "year-2000");
    assert_eq!(b0[13], 166, "sample_count");

    let header = BlockHeader::decode(&b0[..14]).unwrap();
    assert_eq!(header.timestamp().unwrap(), t0());
}

#[test]
fn test_vector_full_read() {
    // Сценарий из спецификации: 4 канала, 200 Гц, 2 группы — полное окно
    // возвращает 4 канала по 332 выборки с начала файла
    let mut reader = LcheapoReader::new(Cursor::new(build_test_vector(2))).unwrap();
    let (start, end) = reader.time_range().unwrap();

    assert_eq!(start, t0());
    assert_eq!(end, add_seconds(t0(), 0.83));

    let win = reader
        .read_window(TimeSpec::Absolute(start), TimeSpec::Absolute(end))
        .unwrap();

    assert_eq!(win.channels.len(), 4);
    assert_eq!(win.start_time, t0());
    assert!((win.sample_rate - 200.0).abs() < 1e-12);

    for (c, samples) in win.channels.iter().enumerate() {
        assert_eq!(samples.len(), 2 * SAMPLES_PER_BLOCK, "332 samples per channel");
        assert_eq!(samples[0], (c * 100_000) as i32);
        assert_eq!(samples[331], (c * 100_000 + 331) as i32);
    }
}

#[test]
fn test_block_for_time_matches_file_bounds() {
    let raw = build_test_vector(5);
    let header = spobs2_header();
    let mut src = Cursor::new(raw);
    let layout = scan_layout(&mut src, &header).unwrap();

    assert_eq!(
        block_for_time(&header, &layout, layout.start),
        header.data_start_block
    );
    assert_eq!(
        block_for_time(&header, &layout, layout.end),
        layout.last_group_block(&header)
    );
}

#[test]
fn test_read_from_named_file() {
    // Тот же вектор через файловую систему
    let tmp = NamedTempFile::new().unwrap();
    std::fs::write(tmp.path(), build_test_vector(3)).unwrap();

    let mut reader = LcheapoReader::open(tmp.path()).unwrap();

    assert_eq!(reader.header().channel_count, 4);
    assert_eq!(reader.header().description, "SPOBS2 bench deployment");

    let win = reader
        .read_window(TimeSpec::Offset(0.0), TimeSpec::Offset(2.49))
        .unwrap();

    assert_eq!(win.channels[0].len(), 3 * SAMPLES_PER_BLOCK);
}

#[test]
fn test_read_window_idempotent() {
    let mut reader = LcheapoReader::new(Cursor::new(build_test_vector(4))).unwrap();

    let a = reader
        .read_window(TimeSpec::Offset(0.4), TimeSpec::Offset(1.1))
        .unwrap();
    let b = reader
        .read_window(TimeSpec::Offset(0.4), TimeSpec::Offset(1.1))
        .unwrap();

    assert_eq!(a.start_time, b.start_time);
    assert_eq!(a.channels, b.channels);
}

#[test]
fn test_window_before_and_after_data() {
    let mut reader = LcheapoReader::new(Cursor::new(build_test_vector(2))).unwrap();
    let (start, end) = reader.time_range().unwrap();

    let before = reader.read_window(
        TimeSpec::Absolute(add_seconds(start, -3600.0)),
        TimeSpec::Offset(60.0),
    );
    let after = reader.read_window(
        TimeSpec::Absolute(add_seconds(end, 3600.0)),
        TimeSpec::Offset(60.0),
    );

    assert!(matches!(before, Err(LcheapoError::RangeNotFound(_))));
    assert!(matches!(after, Err(LcheapoError::RangeNotFound(_))));

    // Частичное перекрытие хвоста — прижимается и возвращает остаток
    let tail = reader
        .read_window(TimeSpec::Offset(0.5), TimeSpec::Offset(3600.0))
        .unwrap();

    assert_eq!(tail.start_time, add_seconds(start, 0.5));
    assert_eq!(tail.channels[0].len(), 2 * SAMPLES_PER_BLOCK - 100);
}

#[test]
fn test_malformed_block_timestamp_is_structural() {
    let mut raw = build_test_vector(2);

    // Портим месяц в заголовке первого блока данных
    raw[BLOCK_SIZE + 6] = 13;

    let mut reader = LcheapoReader::new(Cursor::new(raw)).unwrap();

    assert!(matches!(
        reader.time_range(),
        Err(LcheapoError::MalformedTimestamp(_))
    ));
}

// ===========================================================================
// Дрейф + посуточная нарезка поверх эталонных файлов
// ===========================================================================

#[test]
fn test_daily_segmentation_with_drift() {
    // Сутки данных: группа в минуту при 166/60 Гц
    let day0 = Utc.with_ymd_and_hms(2019, 7, 1, 0, 0, 0).unwrap();
    let rate = SAMPLES_PER_BLOCK as f64 / 60.0;

    let header = DiskHeader {
        channel_count: 2,
        nominal_sample_rate: 3,
        real_sample_rate: rate,
        data_start_block: 1,
        description: String::new(),
    };

    // Прибор стартует на 2 с позже опорных часов и набегает +1 с за сутки
    let params = DriftParameters {
        reference_start: day0,
        reference_end: add_seconds(day0, 86_400.0),
        instrument_start: add_seconds(day0, 2.0),
        instrument_end: add_seconds(day0, 86_403.0),
    };

    let mut writer = LcheapoWriter::new(Cursor::new(Vec::new()), header).unwrap();
    for m in 0..1_440u64 {
        let time = add_seconds(day0, 2.0 + m as f64 * 60.0);
        writer
            .write_group(time, &vec![vec![m as i32; SAMPLES_PER_BLOCK]; 2])
            .unwrap();
    }

    let mut reader = LcheapoReader::new(writer.finish().unwrap()).unwrap();
    let segmenter = DailySegmenter::new(DriftModel::new(Some(params), Vec::new()));

    let mut segments = Vec::new();
    let emitted = segmenter
        .run(&mut reader, |seg| {
            segments.push(seg);
            Ok(())
        })
        .unwrap();

    assert_eq!(emitted, 1);

    let seg = &segments[0];
    assert_eq!(seg.day, day0);
    // Скорректированное начало — ровно опорная полночь
    assert!(seconds_between(seg.start_time, day0).abs() < 1e-5);
    assert_eq!(seg.channels.len(), 2);
    assert!(seg.warnings.is_empty());
}

#[test]
fn test_truncated_tail_group_ignored_end_to_end() {
    let mut raw = build_test_vector(3);
    raw.truncate(raw.len() - 3 * BLOCK_SIZE); // рвём последнюю группу

    let mut reader = LcheapoReader::new(Cursor::new(raw)).unwrap();
    let (_, end) = reader.time_range().unwrap();

    assert_eq!(end, add_seconds(t0(), 0.83), "partial tail group excluded");

    let win = reader
        .read_window(TimeSpec::Offset(0.0), TimeSpec::Offset(3600.0))
        .unwrap();

    assert_eq!(win.channels[0].len(), 2 * SAMPLES_PER_BLOCK);
}

#[test]
fn test_disk_header_encode_decode_via_reader() {
    let header = spobs2_header();
    let mut raw = header.encode().to_vec();

    // Файл без единой полной группы
    raw.extend_from_slice(&[0u8; BLOCK_SIZE * 3]);

    let header2 = DiskHeader::decode(&raw).unwrap();
    assert_eq!(header2.channel_count, header.channel_count);

    let mut reader = LcheapoReader::new(Cursor::new(raw)).unwrap();
    assert!(matches!(reader.time_range(), Err(LcheapoError::EmptyFile)));
}
