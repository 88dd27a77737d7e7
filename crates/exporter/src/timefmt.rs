// Time formatting and parsing for ffmpeg time arguments

/// Format seconds as `HH:MM:SS.mmm` (or `MM:SS.mmm` without hours).
///
/// Every field is truncated, not rounded. Negative and non-finite inputs
/// format as zero.
pub fn format_ffmpeg_time(seconds: f64, show_hours: bool) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };

    // Absorb float representation error before truncating to whole milliseconds
    let total_ms = (seconds * 1000.0 + 1e-6).floor() as u64;

    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;

    if show_hours {
        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
    } else {
        format!("{:02}:{:02}.{:03}", minutes, secs, millis)
    }
}

pub fn approximately_equal(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

/// Parse an ffmpeg `out_time` value like `00:01:02.500000` into seconds
pub fn parse_out_time(val: &str) -> Option<f64> {
    let parts: Vec<&str> = val.trim().split(':').collect();
    if parts.len() != 3 {
        return None;
    }
    let h = parts.first()?.parse::<f64>().ok()?;
    let m = parts.get(1)?.parse::<f64>().ok()?;
    let s = parts.get(2)?.parse::<f64>().ok()?;
    Some(h * 3600.0 + m * 60.0 + s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_zero() {
        assert_eq!(format_ffmpeg_time(0.0, true), "00:00:00.000");
        assert_eq!(format_ffmpeg_time(0.0, false), "00:00.000");
    }

    #[test]
    fn test_format_components() {
        assert_eq!(format_ffmpeg_time(3723.456, true), "01:02:03.456");
        assert_eq!(format_ffmpeg_time(59.999, true), "00:00:59.999");
        assert_eq!(format_ffmpeg_time(33.3, true), "00:00:33.300");
        assert_eq!(format_ffmpeg_time(11.0, true), "00:00:11.000");
    }

    #[test]
    fn test_format_without_hours() {
        assert_eq!(format_ffmpeg_time(3723.456, false), "02:03.456");
        assert_eq!(format_ffmpeg_time(75.5, false), "01:15.500");
    }

    #[test]
    fn test_format_truncates() {
        assert_eq!(format_ffmpeg_time(1.9999, true), "00:00:01.999");
    }

    #[test]
    fn test_format_float_noise() {
        // 12.3 - 11.0 and 45.6 - 12.3 both carry representation error
        assert_eq!(format_ffmpeg_time(12.3 - 11.0, true), "00:00:01.300");
        assert_eq!(format_ffmpeg_time(45.6 - 12.3, true), "00:00:33.300");
    }

    #[test]
    fn test_format_negative_and_nan() {
        assert_eq!(format_ffmpeg_time(-5.0, true), "00:00:00.000");
        assert_eq!(format_ffmpeg_time(f64::NAN, true), "00:00:00.000");
    }

    #[test]
    fn test_format_long_durations() {
        assert_eq!(format_ffmpeg_time(360_000.0, true), "100:00:00.000");
    }

    #[test]
    fn test_approximately_equal() {
        assert!(approximately_equal(0.1 + 0.2, 0.3, 0.0001));
        assert!(!approximately_equal(1.0, 1.1, 0.0001));
    }

    #[test]
    fn test_parse_out_time() {
        assert_eq!(parse_out_time("00:01:02.500000"), Some(62.5));
        assert_eq!(parse_out_time("01:00:00.000000"), Some(3600.0));
        assert_eq!(parse_out_time("N/A"), None);
        assert_eq!(parse_out_time("1:2"), None);
    }
}
