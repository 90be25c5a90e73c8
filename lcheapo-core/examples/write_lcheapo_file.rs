//! Пример: генерация синтетического LCHEAPO-файла
//!
//! Пишет 4-канальный файл 200 Гц с минутой пилообразного сигнала —
//! удобно для проверки lcheapo-dump и lcheapo-sds без настоящего
//! регистратора.

use std::fs::File;

use chrono::{TimeZone, Utc};
use lcheapo_core::{LcheapoWriter, SAMPLES_PER_BLOCK};
use lcheapo_types::{add_seconds, DiskHeader};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "lcheapo-core/test_output.lch".to_string());

    let header = DiskHeader {
        channel_count: 4,
        nominal_sample_rate: 200,
        real_sample_rate: 200.0,
        data_start_block: 1,
        description: "synthetic sawtooth".to_string(),
    };

    let file = File::create(&output_path)?;
    let mut writer = LcheapoWriter::new(file, header)?;

    let start = Utc.with_ymd_and_hms(2010, 6, 20, 0, 0, 0).unwrap();
    let block_len_s = SAMPLES_PER_BLOCK as f64 / 200.0;

    // Минута данных: ~72 группы по 166 выборок
    let groups = (60.0 / block_len_s) as u64;

    for g in 0..groups {
        let time = add_seconds(start, g as f64 * block_len_s);
        let channels: Vec<Vec<i32>> = (0..4)
            .map(|c| {
                (0..SAMPLES_PER_BLOCK)
                    .map(|i| (((g as usize * SAMPLES_PER_BLOCK + i) % 1000) as i32 - 500) * (c as i32 + 1))
                    .collect()
            })
            .collect();
        writer.write_group(time, &channels)?;
    }

    println!("✓ Wrote {} groups to {output_path}", writer.groups_written());

    writer.finish()?;

    Ok(())
}
