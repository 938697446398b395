//! Шестидесятеричное представление координат.
//!
//! SIGPROC хранит координаты как одно десятичное число вида `±DDMMSS.ssss`
//! (для RA `HHMMSS.ssss`): старшие разряды целой части означают часы/градусы,
//! затем две цифры минут и секунды с четырьмя знаками после запятой.

use crate::{FilError, FilResult};

/// Количество знаков после запятой у секунд в упакованном значении.
pub const SECONDS_DECIMALS: i32 = 4;

/// Разложение угла на старшую единицу (часы или градусы), минуты и секунды.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sexagesimal {
    /// Знак (имеет смысл только для склонения)
    pub negative: bool,
    /// Часы или градусы
    pub major: u32,
    /// Минуты, 0..60
    pub minutes: u32,
    /// Секунды, 0..60, округлены до 4 знаков
    pub seconds: f64,
}

impl Sexagesimal {
    /// RA в градусах → часы/минуты/секунды. Значение нормализуется в
    /// `[0°, 360°)`.
    pub fn ra_from_degrees(ra_deg: f64) -> FilResult<Self> {
        if !ra_deg.is_finite() {
            return Err(FilError::header(format!("RA is not finite: {ra_deg}")));
        }

        let hours = ra_deg.rem_euclid(360.0) / 15.0;
        let mut hms = Self::decompose(hours);

        if hms.major >= 24 {
            hms.major -= 24;
        }

        Ok(hms)
    }

    /// Dec в градусах → ±градусы/минуты/секунды.
    pub fn dec_from_degrees(dec_deg: f64) -> FilResult<Self> {
        if !dec_deg.is_finite() {
            return Err(FilError::header(format!("Dec is not finite: {dec_deg}")));
        }

        if dec_deg.abs() > 90.0 {
            return Err(FilError::header(format!(
                "Dec out of range [-90, 90]: {dec_deg}"
            )));
        }

        Ok(Self::decompose(dec_deg))
    }

    // Знак снимается до разложения: минуты и секунды всегда по модулю.
    fn decompose(value: f64) -> Self {
        let negative = value < 0.0;
        let abs = value.abs();

        let mut major = abs.trunc() as u32;
        let minutes_f = (abs - major as f64) * 60.0;
        let mut minutes = minutes_f.trunc() as u32;
        let scale = 10f64.powi(SECONDS_DECIMALS);
        let mut seconds = ((minutes_f - minutes as f64) * 60.0 * scale).round() / scale;

        if seconds >= 60.0 {
            seconds -= 60.0;
            minutes += 1;
        }

        if minutes >= 60 {
            minutes -= 60;
            major += 1;
        }

        Self {
            negative,
            major,
            minutes,
            seconds,
        }
    }

    /// Упаковывает в `±MMmmss.ssss`.
    ///
    /// Значение получается разбором десятичной строки, поэтому f64 будет
    /// ближайшим числом к записанным цифрам.
    pub fn pack(&self) -> FilResult<f64> {
        let sign = if self.negative { "-" } else { "" };
        let text = format!(
            "{sign}{:02}{:02}{:07.4}",
            self.major, self.minutes, self.seconds
        );

        text.parse::<f64>()
            .map_err(|e| FilError::header(format!("cannot pack '{text}': {e}")))
    }

    /// Обратное к [`Sexagesimal::pack`].
    pub fn unpack(packed: f64) -> FilResult<Self> {
        if !packed.is_finite() {
            return Err(FilError::corrupted(format!(
                "packed coordinate is not finite: {packed}"
            )));
        }

        let negative = packed.is_sign_negative() && packed != 0.0;
        let abs = packed.abs();
        let major = (abs / 10_000.0).trunc();
        let rest = abs - major * 10_000.0;
        let minutes = (rest / 100.0).trunc();
        let scale = 10f64.powi(SECONDS_DECIMALS);
        let seconds = ((rest - minutes * 100.0) * scale).round() / scale;

        if minutes >= 60.0 || seconds >= 60.0 {
            return Err(FilError::corrupted(format!(
                "packed coordinate has invalid minutes/seconds: {packed}"
            )));
        }

        Ok(Self {
            negative,
            major: major as u32,
            minutes: minutes as u32,
            seconds,
        })
    }

    /// Значение в старших единицах (часы или градусы) со знаком.
    pub fn value(&self) -> f64 {
        let v = self.major as f64 + self.minutes as f64 / 60.0 + self.seconds / 3600.0;

        if self.negative {
            -v
        } else {
            v
        }
    }

    /// Интерпретация как RA: часы → градусы.
    pub fn ra_degrees(&self) -> f64 {
        self.value() * 15.0
    }

    /// Интерпретация как Dec.
    pub fn dec_degrees(&self) -> f64 {
        self.value()
    }
}

/// Упакованное RA для заголовка.
pub fn pack_ra(ra_deg: f64) -> FilResult<f64> {
    Sexagesimal::ra_from_degrees(ra_deg)?.pack()
}

/// Упакованное Dec для заголовка.
pub fn pack_dec(dec_deg: f64) -> FilResult<f64> {
    Sexagesimal::dec_from_degrees(dec_deg)?.pack()
}

/// Разбирает строку вида `hh:mm:ss.s` / `-dd:mm:ss` (допускается пробел как
/// разделитель) и возвращает значение в старших единицах со знаком.
pub fn parse_sexagesimal(s: &str) -> FilResult<f64> {
    let trimmed = s.trim();
    let negative = trimmed.starts_with('-');
    let body = trimmed.trim_start_matches(['+', '-']);

    let parts: Vec<&str> = body
        .split(|c: char| c == ':' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();

    if parts.is_empty() || parts.len() > 3 {
        return Err(FilError::header(format!("Invalid sexagesimal value '{s}'")));
    }

    let mut value = 0.0;
    let mut scale = 1.0;

    for part in parts {
        let v: f64 = part
            .parse()
            .map_err(|e| FilError::header(format!("Invalid sexagesimal value '{s}': {e}")))?;

        if v < 0.0 {
            return Err(FilError::header(format!(
                "Invalid sexagesimal value '{s}': negative component"
            )));
        }

        value += v / scale;
        scale *= 60.0;
    }

    Ok(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ra_packing() {
        // 10.5° = 0.7h = 00h42m00s
        let hms = Sexagesimal::ra_from_degrees(10.5).unwrap();
        assert_eq!((hms.major, hms.minutes), (0, 42));
        assert!(hms.seconds.abs() < 1e-9);
        assert_eq!(hms.pack().unwrap(), 4200.0);
    }

    #[test]
    fn test_dec_packing_negative() {
        // -45.25° = -45°15'00"
        let dms = Sexagesimal::dec_from_degrees(-45.25).unwrap();
        assert!(dms.negative);
        assert_eq!((dms.major, dms.minutes), (45, 15));
        assert_eq!(dms.pack().unwrap(), -451500.0);
    }

    #[test]
    fn test_dec_sign_kept_below_one_degree() {
        // -0.5° = -00°30'00": знак не должен потеряться из-за нулевых градусов
        let packed = pack_dec(-0.5).unwrap();
        assert_eq!(packed, -3000.0);

        let back = Sexagesimal::unpack(packed).unwrap();
        assert!(back.negative);
        assert!((back.dec_degrees() + 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_seconds_carry() {
        // 59.99999" округляется до 60.0000" и переносится в минуты
        let dms = Sexagesimal::dec_from_degrees(12.0 + 59.0 / 60.0 + 59.99999 / 3600.0).unwrap();
        assert_eq!((dms.major, dms.minutes), (13, 0));
        assert_eq!(dms.seconds, 0.0);
    }

    #[test]
    fn test_ra_wraps_at_24h() {
        let hms = Sexagesimal::ra_from_degrees(359.999_999_99).unwrap();
        assert_eq!(hms.major, 0);

        let hms = Sexagesimal::ra_from_degrees(-15.0).unwrap();
        assert_eq!(hms.major, 23);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(pack_ra(f64::NAN).is_err());
        assert!(pack_dec(f64::INFINITY).is_err());
        assert!(pack_dec(91.0).is_err());
    }

    #[test]
    fn test_unpack_round_trip_precision() {
        let ra = 83.633_083;
        let packed = pack_ra(ra).unwrap();
        let back = Sexagesimal::unpack(packed).unwrap().ra_degrees();
        // 0.0001 s времени = 1.5e-3 угловой секунды
        assert!((back - ra).abs() < 1e-6, "{back} vs {ra}");
    }

    #[test]
    fn test_parse_sexagesimal() {
        assert!((parse_sexagesimal("05:34:31.94").unwrap() - (5.0 + 34.0 / 60.0 + 31.94 / 3600.0)).abs() < 1e-12);
        assert!((parse_sexagesimal("-00:30:00").unwrap() + 0.5).abs() < 1e-12);
        assert!((parse_sexagesimal("+22 00 52.1").unwrap() - (22.0 + 52.1 / 3600.0)).abs() < 1e-12);
        assert!(parse_sexagesimal("").is_err());
        assert!(parse_sexagesimal("ab:cd").is_err());
    }
}
