//! Small display helpers shared by the engine's front-ends.

/// Format a Unix timestamp as a human-readable string
pub fn format_timestamp(timestamp: u64) -> String {
    use chrono::DateTime;
    let dt = DateTime::from_timestamp(timestamp as i64, 0).unwrap_or_default();
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Format a basis-point rate as a percentage
pub fn format_bps(bps: u16) -> String {
    format!("{:.2}%", f64::from(bps) / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(1_735_689_600), "2025-01-01 00:00:00 UTC");
    }

    #[test]
    fn test_format_bps() {
        assert_eq!(format_bps(500), "5.00%");
        assert_eq!(format_bps(25), "0.25%");
        assert_eq!(format_bps(10_000), "100.00%");
    }
}
