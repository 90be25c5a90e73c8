//! Пример: чтение LCHEAPO-файла через LcheapoReader
//!
//! Демонстрирует:
//! - открытие файла и валидацию заголовка диска
//! - определение границ данных без полного сканирования
//! - чтение часового окна с точностью до выборки

use lcheapo_core::LcheapoReader;
use lcheapo_types::TimeSpec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let input_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "lcheapo-core/test_output.lch".to_string());

    // --- LcheapoReader валидирует заголовок при открытии ---
    let mut reader = match LcheapoReader::open(&input_path) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("✗ Header validation failed: {e}");
            return Err(Box::new(e));
        }
    };

    let h = reader.header().clone();
    println!("✓ Header validated");
    println!("  Channels      : {}", h.channel_count);
    println!("  Nominal rate  : {} Hz", h.nominal_sample_rate);
    println!("  Real rate     : {} Hz", h.real_sample_rate);
    println!("  Data start    : block {}", h.data_start_block);
    println!("  Description   : {}", h.description);

    // --- Границы данных: первая и последняя полные группы ---
    let (start, end) = reader.time_range()?;
    println!("\n✓ Data bounds");
    println!("  Start : {start}");
    println!("  End   : {end}");

    // --- Первый час данных ---
    let window = reader.read_window(TimeSpec::Offset(0.0), TimeSpec::Offset(3600.0))?;

    println!("\n✓ Read complete, window starts {}", window.start_time);
    for (i, samples) in window.channels.iter().enumerate() {
        println!("  channel {i}: {} samples", samples.len());
    }
    for w in &window.warnings {
        println!("  warning: {w}");
    }

    println!("\n  Windows read    : {}", reader.stats().windows_read);
    println!("  Groups read     : {}", reader.stats().groups_read);
    println!("  Samples decoded : {}", reader.stats().samples_decoded);

    Ok(())
}
