use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Момент времени, заданный пользователем.
///
/// Единый sum-тип для API границы: либо абсолютная метка UTC, либо
/// смещение в секундах относительно опорного момента (начала файла для
/// start, начала окна для end). Разрешается в `DateTime<Utc>` один раз,
/// дальше внутри используется только абсолютное время.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeSpec {
    /// Абсолютная метка времени (ISO-8601, UTC)
    Absolute(DateTime<Utc>),
    /// Смещение в секундах от опорного момента
    Offset(f64),
}

impl TimeSpec {
    /// Разрешает спецификацию относительно `reference`.
    pub fn resolve(&self, reference: DateTime<Utc>) -> DateTime<Utc> {
        match *self {
            TimeSpec::Absolute(t) => t,
            TimeSpec::Offset(secs) => add_seconds(reference, secs),
        }
    }
}

impl FromStr for TimeSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Ok(secs) = s.parse::<f64>() {
            return Ok(TimeSpec::Offset(secs));
        }

        parse_datetime(s).map(TimeSpec::Absolute)
    }
}

impl std::fmt::Display for TimeSpec {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            TimeSpec::Absolute(t) => write!(f, "{}", t.format("%Y-%m-%dT%H:%M:%S%.3fZ")),
            TimeSpec::Offset(secs) => write!(f, "{secs}s"),
        }
    }
}

/// Парсит абсолютную метку времени из строки.
///
/// Принимает RFC 3339 (`2010-06-20T00:00:00Z`), наивную дату-время
/// (`2010-06-20T00:00:00.28`, интерпретируется как UTC) и голую дату
/// (`2010-06-20`, полночь UTC).
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }

    Err(format!(
        "Invalid time '{s}': expected ISO-8601 datetime or seconds offset"
    ))
}

/// Разница `later - earlier` в секундах (дробных).
pub fn seconds_between(
    later: DateTime<Utc>,
    earlier: DateTime<Utc>,
) -> f64 {
    let d = later.signed_duration_since(earlier);

    match d.num_microseconds() {
        Some(us) => us as f64 / 1e6,
        // Переполнение микросекунд возможно только на диапазонах в
        // сотни тысяч лет — отдаём миллисекундную точность
        None => d.num_milliseconds() as f64 / 1e3,
    }
}

/// `t + secs` с округлением до микросекунды.
pub fn add_seconds(
    t: DateTime<Utc>,
    secs: f64,
) -> DateTime<Utc> {
    t + Duration::microseconds((secs * 1e6).round() as i64)
}

/// Полночь UTC того же календарного дня.
pub fn floor_to_day(t: DateTime<Utc>) -> DateTime<Utc> {
    t.date_naive().and_time(NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_parse_offset() {
        assert_eq!("3600".parse::<TimeSpec>().unwrap(), TimeSpec::Offset(3600.0));
        assert_eq!("-12.5".parse::<TimeSpec>().unwrap(), TimeSpec::Offset(-12.5));
    }

    #[test]
    fn test_parse_absolute_rfc3339() {
        let t = "2010-06-20T00:00:00.28Z".parse::<TimeSpec>().unwrap();
        let expected = Utc.with_ymd_and_hms(2010, 6, 20, 0, 0, 0).unwrap()
            + Duration::milliseconds(280);

        assert_eq!(t, TimeSpec::Absolute(expected));
    }

    #[test]
    fn test_parse_naive_and_date() {
        let t1 = "2010-06-20T12:30:00".parse::<TimeSpec>().unwrap();
        let t2 = "2010-06-20".parse::<TimeSpec>().unwrap();

        assert_eq!(
            t1,
            TimeSpec::Absolute(Utc.with_ymd_and_hms(2010, 6, 20, 12, 30, 0).unwrap())
        );
        assert_eq!(
            t2,
            TimeSpec::Absolute(Utc.with_ymd_and_hms(2010, 6, 20, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_garbage() {
        assert!("not_a_time".parse::<TimeSpec>().is_err());
    }

    #[test]
    fn test_resolve() {
        let reference = Utc.with_ymd_and_hms(2010, 6, 20, 0, 0, 0).unwrap();

        assert_eq!(
            TimeSpec::Offset(86400.0).resolve(reference),
            Utc.with_ymd_and_hms(2010, 6, 21, 0, 0, 0).unwrap()
        );
        assert_eq!(TimeSpec::Absolute(reference).resolve(reference), reference);
    }

    #[test]
    fn test_seconds_between_roundtrip() {
        let t0 = Utc.with_ymd_and_hms(2010, 6, 20, 0, 0, 0).unwrap();
        let t1 = add_seconds(t0, 0.83);

        assert!((seconds_between(t1, t0) - 0.83).abs() < 1e-9);
        assert!((seconds_between(t0, t1) + 0.83).abs() < 1e-9);
    }

    #[test]
    fn test_floor_to_day() {
        let t = Utc.with_ymd_and_hms(2010, 6, 20, 15, 45, 12).unwrap();

        assert_eq!(
            floor_to_day(t),
            Utc.with_ymd_and_hms(2010, 6, 20, 0, 0, 0).unwrap()
        );
    }
}
