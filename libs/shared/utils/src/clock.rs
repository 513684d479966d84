use std::sync::OnceLock;

use regex::Regex;

/// Minutes in a schedulable day; clock times are offsets in [0, 1439].
pub const MINUTES_PER_DAY: i32 = 1440;

fn clock_time_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)$").unwrap())
}

/// Parse a strict `HH:MM` clock string into minutes since midnight.
///
/// Rejects anything that is not two zero-padded fields with hour in [0,23]
/// and minute in [0,59]. Scheduling callers validate times here before any
/// overlap check runs.
pub fn parse_clock_time(value: &str) -> Result<i32, String> {
    let captures = clock_time_pattern()
        .captures(value)
        .ok_or_else(|| format!("Invalid clock time '{}', expected HH:MM", value))?;

    // The pattern guarantees both fields are in range
    let hours: i32 = captures[1].parse().unwrap();
    let minutes: i32 = captures[2].parse().unwrap();

    Ok(hours * 60 + minutes)
}

/// Render minutes since midnight back into `HH:MM`.
pub fn format_clock_time(minutes: i32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_times() {
        assert_eq!(parse_clock_time("00:00"), Ok(0));
        assert_eq!(parse_clock_time("09:30"), Ok(570));
        assert_eq!(parse_clock_time("13:05"), Ok(785));
        assert_eq!(parse_clock_time("23:59"), Ok(1439));
    }

    #[test]
    fn rejects_out_of_range_fields() {
        assert!(parse_clock_time("24:00").is_err());
        assert!(parse_clock_time("12:60").is_err());
        assert!(parse_clock_time("99:99").is_err());
    }

    #[test]
    fn rejects_malformed_strings() {
        assert!(parse_clock_time("").is_err());
        assert!(parse_clock_time("9:30").is_err());
        assert!(parse_clock_time("09:3").is_err());
        assert!(parse_clock_time("0930").is_err());
        assert!(parse_clock_time("09:30:00").is_err());
        assert!(parse_clock_time("morning").is_err());
        assert!(parse_clock_time(" 09:30").is_err());
    }

    #[test]
    fn formats_round_trip() {
        assert_eq!(format_clock_time(0), "00:00");
        assert_eq!(format_clock_time(570), "09:30");
        assert_eq!(format_clock_time(1439), "23:59");
    }
}
