//! Модели приборов OBS и карты каналов
//!
//! Тип прибора определяет порядок каналов в группе блоков и их коды
//! SEED. Тип задаётся вызывающим явно — никакого «предполагаем SPOBS2
//! по умолчанию» внутри ядра нет.

/// Известные модели регистраторов LCHEAPO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentKind {
    /// Короткопериодный OBS, 2 канала
    Spobs1,
    /// Короткопериодный OBS, 4 канала
    Spobs2,
    /// Широкополосный OBS, 4 канала
    Bbobs,
    /// Гидрофонная связка, 4 канала
    Hydroct,
}

/// Идентификатор канала в выходном архиве.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelId {
    /// Код канала SEED с полосой, подправленной под частоту
    pub channel: String,
    /// Код положения (location), может быть пустым
    pub location: String,
}

impl InstrumentKind {
    pub const ALL: [InstrumentKind; 4] = [
        InstrumentKind::Spobs1,
        InstrumentKind::Spobs2,
        InstrumentKind::Bbobs,
        InstrumentKind::Hydroct,
    ];

    /// Сырые имена каналов в порядке следования блоков группы
    /// (`КОД` или `КОД:LOC`).
    fn raw_map(&self) -> &'static [&'static str] {
        match self {
            InstrumentKind::Spobs1 => &["SH3", "BDH"],
            InstrumentKind::Spobs2 => &["BDH", "SH2", "SH1", "SH3"],
            InstrumentKind::Bbobs => &["SH2", "SH1", "SHZ", "BDH"],
            InstrumentKind::Hydroct => &["BDH:00", "BDH:01", "BDH:02", "BDH:03"],
        }
    }

    /// Количество каналов модели.
    pub fn channel_count(&self) -> u16 {
        self.raw_map().len() as u16
    }

    /// Коды каналов для данной частоты дискретизации.
    pub fn channel_ids(
        &self,
        sample_rate: f64,
    ) -> Result<Vec<ChannelId>, String> {
        self.raw_map()
            .iter()
            .map(|entry| {
                let (chan, loc) = match entry.split_once(':') {
                    Some((c, l)) => (c, l),
                    None => (*entry, ""),
                };

                let mut chars = chan.chars();
                let band = chars
                    .next()
                    .ok_or_else(|| format!("empty channel code in {entry}"))?;

                Ok(ChannelId {
                    channel: format!("{}{}", band_code(band, sample_rate)?, chars.as_str()),
                    location: loc.to_string(),
                })
            })
            .collect()
    }
}

impl std::fmt::Display for InstrumentKind {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            InstrumentKind::Spobs1 => write!(f, "SPOBS1"),
            InstrumentKind::Spobs2 => write!(f, "SPOBS2"),
            InstrumentKind::Bbobs => write!(f, "BBOBS"),
            InstrumentKind::Hydroct => write!(f, "HYDROCT"),
        }
    }
}

impl std::str::FromStr for InstrumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SPOBS1" => Ok(InstrumentKind::Spobs1),
            "SPOBS2" => Ok(InstrumentKind::Spobs2),
            "BBOBS" => Ok(InstrumentKind::Bbobs),
            "HYDROCT" => Ok(InstrumentKind::Hydroct),
            _ => Err(format!(
                "Unknown LCHEAPO instrument: '{s}'. Use: SPOBS1, SPOBS2, BBOBS, HYDROCT"
            )),
        }
    }
}

/// Полосовой код SEED для данной частоты дискретизации.
///
/// Таблица кодов:
/// <http://docs.fdsn.org/projects/source-identifiers/en/v1.0/channel-codes.html>
pub fn band_code(
    band: char,
    sps: f64,
) -> Result<char, String> {
    const BAND_CODES_SP: &str = "GDES";
    const BAND_CODES_LP: &str = "FCHBMLVUWRPTQ";

    if sps > 5000.0 {
        return Ok('J');
    }

    if BAND_CODES_SP.contains(band) {
        return if sps >= 1000.0 {
            Ok('G')
        } else if sps >= 250.0 {
            Ok('D')
        } else if sps >= 80.0 {
            Ok('E')
        } else if sps >= 10.0 {
            Ok('S')
        } else {
            Err(format!(
                "short-period channel '{band}' makes no sense at {sps} sps"
            ))
        };
    }

    if BAND_CODES_LP.contains(band) {
        return Ok(if sps >= 1000.0 {
            'F'
        } else if sps >= 250.0 {
            'C'
        } else if sps >= 80.0 {
            'H'
        } else if sps >= 10.0 {
            'B'
        } else if sps > 1.0 {
            'M'
        } else if sps == 1.0 {
            'L'
        } else if sps >= 0.1 {
            'V'
        } else if sps >= 0.01 {
            'U'
        } else if sps >= 0.001 {
            'W'
        } else if sps >= 0.0001 {
            'R'
        } else if sps >= 0.00001 {
            'P'
        } else if sps >= 0.000001 {
            'T'
        } else {
            'Q'
        });
    }

    Err(format!("Unknown band code '{band}'"))
}
