//! Time and progress formatting

/// Display format for a time value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeFormat {
    /// `M:SS`
    Short,
    /// `MM:SS`, or `H:MM:SS` from one hour on
    #[default]
    Standard,
    /// `H:MM:SS`
    Long,
    /// `1h 23m 45s`
    Verbose,
}

impl TimeFormat {
    /// Shown for NaN or infinite input
    pub fn placeholder(&self) -> &'static str {
        match self {
            TimeFormat::Short => "-:--",
            TimeFormat::Standard => "--:--",
            TimeFormat::Long => "-:--:--",
            TimeFormat::Verbose => "--",
        }
    }
}

/// Playback progress in `[0, 1]`; 0 when the duration is not positive
pub fn progress(current_time: f64, duration: f64) -> f64 {
    if !(duration.is_finite() && duration > 0.0) || current_time.is_nan() {
        return 0.0;
    }
    (current_time / duration).clamp(0.0, 1.0)
}

fn split(seconds: f64) -> (i64, i64, i64) {
    let total = seconds.trunc() as i64;
    (total / 3600, (total % 3600) / 60, total % 60)
}

/// Format seconds as `MM:SS` or `H:MM:SS`
pub fn format_time(seconds: f64) -> String {
    format_time_as(seconds, TimeFormat::Standard)
}

pub fn format_time_as(seconds: f64, format: TimeFormat) -> String {
    if !seconds.is_finite() {
        return format.placeholder().to_string();
    }

    let (hours, minutes, secs) = split(seconds);
    match format {
        TimeFormat::Short => format!("{}:{:02}", minutes, secs),
        TimeFormat::Standard if hours > 0 => format!("{}:{:02}:{:02}", hours, minutes, secs),
        TimeFormat::Standard => format!("{:02}:{:02}", minutes, secs),
        TimeFormat::Long => format!("{}:{:02}:{:02}", hours, minutes, secs),
        TimeFormat::Verbose => {
            let mut parts = Vec::new();
            if hours > 0 {
                parts.push(format!("{}h", hours));
            }
            if minutes > 0 {
                parts.push(format!("{}m", minutes));
            }
            if secs > 0 || parts.is_empty() {
                parts.push(format!("{}s", secs));
            }
            parts.join(" ")
        }
    }
}

/// Remaining time with a leading minus, e.g. `-03:20`
pub fn format_remaining_time(current_time: f64, duration: f64) -> String {
    format!("-{}", format_time(duration - current_time))
}

/// `MM:SS.mmm` or `H:MM:SS.mmm`
pub fn format_time_with_millis(seconds: f64) -> String {
    if !seconds.is_finite() {
        return "--:--.---".to_string();
    }

    let (hours, minutes, secs) = split(seconds);
    let millis = (seconds.fract() * 1000.0) as i64;
    if hours > 0 {
        format!("{}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
    } else {
        format!("{:02}:{:02}.{:03}", minutes, secs, millis)
    }
}

/// Whole percent, truncated
pub fn format_progress(ratio: f64) -> String {
    format!("{}%", (ratio * 100.0) as i64)
}

/// `current / total`, e.g. `01:23 / 04:56`
pub fn format_progress_with_time(current_time: f64, duration: f64) -> String {
    format!("{} / {}", format_time(current_time), format_time(duration))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_formula() {
        assert_eq!(progress(30.0, 120.0), 0.25);
        assert_eq!(progress(-5.0, 120.0), 0.0);
        assert_eq!(progress(500.0, 120.0), 1.0);
    }

    #[test]
    fn test_progress_without_duration() {
        for t in [0.0, 30.0, -1.0, 1e9] {
            assert_eq!(progress(t, 0.0), 0.0);
            assert_eq!(progress(t, -10.0), 0.0);
            assert_eq!(progress(t, f64::NAN), 0.0);
            assert_eq!(progress(t, f64::INFINITY), 0.0);
        }
        assert_eq!(progress(f64::NAN, 10.0), 0.0);
    }

    #[test]
    fn test_format_standard() {
        assert_eq!(format_time(0.0), "00:00");
        assert_eq!(format_time(83.9), "01:23");
        assert_eq!(format_time(3600.0), "1:00:00");
        assert_eq!(format_time(5025.0), "1:23:45");
        assert_eq!(format_time(f64::NAN), "--:--");
    }

    #[test]
    fn test_format_variants() {
        assert_eq!(format_time_as(65.0, TimeFormat::Short), "1:05");
        assert_eq!(format_time_as(65.0, TimeFormat::Long), "0:01:05");
        assert_eq!(format_time_as(5025.0, TimeFormat::Verbose), "1h 23m 45s");
        assert_eq!(format_time_as(3600.0, TimeFormat::Verbose), "1h");
        assert_eq!(format_time_as(0.0, TimeFormat::Verbose), "0s");
        assert_eq!(format_time_as(f64::INFINITY, TimeFormat::Long), "-:--:--");
    }

    #[test]
    fn test_format_remaining_and_millis() {
        assert_eq!(format_remaining_time(30.0, 230.0), "-03:20");
        assert_eq!(format_time_with_millis(61.25), "01:01.250");
        assert_eq!(format_time_with_millis(3661.5), "1:01:01.500");
    }

    #[test]
    fn test_format_progress() {
        assert_eq!(format_progress(0.256), "25%");
        assert_eq!(format_progress(1.0), "100%");
        assert_eq!(format_progress_with_time(83.0, 296.0), "01:23 / 04:56");
    }
}
