//! WMO weather interpretation codes, as reported by Open-Meteo.
//!
//! See <https://open-meteo.com/en/docs#weathervariables>. Icons follow the
//! familiar two-digit `NNd` / `NNn` day/night naming.

/// Human-readable rendering of a weather code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Condition {
    pub description: &'static str,
    pub icon: &'static str,
}

pub const UNKNOWN_DESCRIPTION: &str = "unknown conditions";
pub const UNKNOWN_ICON: &str = "50d";

const UNKNOWN: Condition = Condition::new(UNKNOWN_DESCRIPTION, UNKNOWN_ICON);

impl Condition {
    const fn new(description: &'static str, icon: &'static str) -> Self {
        Self { description, icon }
    }
}

/// Every code the table knows about, in ascending order.
pub const KNOWN_CODES: &[i32] = &[
    0, 1, 2, 3, 45, 48, 51, 53, 55, 56, 57, 61, 63, 65, 66, 67, 71, 73, 75, 77, 80, 81, 82, 85,
    86, 95, 96, 99,
];

/// Describe a weather code using the daytime icon.
///
/// Total over `i32`: codes outside the table map to
/// [`UNKNOWN_DESCRIPTION`] / [`UNKNOWN_ICON`].
pub fn describe(code: i32) -> Condition {
    match code {
        0 => Condition::new("clear sky", "01d"),
        1 => Condition::new("mainly clear", "02d"),
        2 => Condition::new("partly cloudy", "03d"),
        3 => Condition::new("overcast", "04d"),
        45 => Condition::new("fog", "50d"),
        48 => Condition::new("depositing rime fog", "50d"),
        51 => Condition::new("light drizzle", "09d"),
        53 => Condition::new("moderate drizzle", "09d"),
        55 => Condition::new("dense drizzle", "09d"),
        56 => Condition::new("light freezing drizzle", "09d"),
        57 => Condition::new("dense freezing drizzle", "09d"),
        61 => Condition::new("light rain", "10d"),
        63 => Condition::new("moderate rain", "10d"),
        65 => Condition::new("heavy rain", "10d"),
        66 => Condition::new("light freezing rain", "13d"),
        67 => Condition::new("heavy freezing rain", "13d"),
        71 => Condition::new("light snowfall", "13d"),
        73 => Condition::new("moderate snowfall", "13d"),
        75 => Condition::new("heavy snowfall", "13d"),
        77 => Condition::new("snow grains", "13d"),
        80 => Condition::new("light rain showers", "09d"),
        81 => Condition::new("moderate rain showers", "09d"),
        82 => Condition::new("violent rain showers", "09d"),
        85 => Condition::new("light snow showers", "13d"),
        86 => Condition::new("heavy snow showers", "13d"),
        95 => Condition::new("thunderstorm", "11d"),
        96 => Condition::new("thunderstorm with light hail", "11d"),
        99 => Condition::new("thunderstorm with heavy hail", "11d"),
        _ => UNKNOWN,
    }
}

/// Like [`describe`], but picks the night icon variant when `is_day` is false.
pub fn describe_at(code: i32, is_day: bool) -> Condition {
    let condition = describe(code);
    if is_day {
        return condition;
    }

    Condition {
        icon: night_icon(condition.icon),
        ..condition
    }
}

fn night_icon(day_icon: &'static str) -> &'static str {
    match day_icon {
        "01d" => "01n",
        "02d" => "02n",
        "03d" => "03n",
        "04d" => "04n",
        "09d" => "09n",
        "10d" => "10n",
        "11d" => "11n",
        "13d" => "13n",
        "50d" => "50n",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_sky_is_code_zero() {
        assert_eq!(describe(0), Condition::new("clear sky", "01d"));
    }

    #[test]
    fn light_rain_is_code_sixty_one() {
        let condition = describe(61);
        assert_eq!(condition.description, "light rain");
        assert_eq!(condition.icon, "10d");
    }

    #[test]
    fn thunderstorm_codes() {
        assert_eq!(describe(95).description, "thunderstorm");
        assert_eq!(describe(99).icon, "11d");
    }

    #[test]
    fn every_known_code_has_text_and_icon() {
        for &code in KNOWN_CODES {
            let condition = describe(code);
            assert!(!condition.description.is_empty(), "code {code}");
            assert!(!condition.icon.is_empty(), "code {code}");
            assert_ne!(condition.description, UNKNOWN_DESCRIPTION, "code {code}");
        }
    }

    #[test]
    fn unknown_codes_fall_back() {
        for code in [999, -1, 4, 50, 100, i32::MIN, i32::MAX] {
            assert_eq!(describe(code), UNKNOWN, "code {code}");
        }
        assert_eq!(describe(999).description, "unknown conditions");
    }

    #[test]
    fn describe_is_deterministic() {
        for code in -5..=105 {
            assert_eq!(describe(code), describe(code));
        }
    }

    #[test]
    fn night_swaps_icon_suffix_only() {
        let night = describe_at(0, false);
        assert_eq!(night.description, "clear sky");
        assert_eq!(night.icon, "01n");

        assert_eq!(describe_at(61, true), describe(61));
        assert_eq!(describe_at(999, false).icon, "50n");
    }
}
