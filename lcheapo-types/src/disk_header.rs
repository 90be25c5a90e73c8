/// Заголовок диска LCHEAPO (первый 512-байтовый блок файла).
#[derive(Debug, Clone)]
pub struct DiskHeader {
    /// Количество мультиплексированных каналов
    pub channel_count: u16,
    /// Номинальная частота дискретизации в Гц
    pub nominal_sample_rate: u32,
    /// Реальная частота дискретизации в Гц (уточнённая по часам прибора)
    pub real_sample_rate: f64,
    /// Абсолютный номер первого блока данных
    pub data_start_block: u64,
    /// Текстовое описание развёртывания (до 64 байт)
    pub description: String,
}

impl DiskHeader {
    /// Рабочая частота дискретизации: реальная, если записана,
    /// иначе номинальная.
    pub fn sample_rate(&self) -> f64 {
        if self.real_sample_rate.is_finite() && self.real_sample_rate > 0.0 {
            self.real_sample_rate
        } else {
            f64::from(self.nominal_sample_rate)
        }
    }
}
