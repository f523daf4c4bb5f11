use chrono::{DateTime, TimeZone};

use super::ExportFormat;

const PREFIX: &str = "mandelzoom";

/// Timestamped file name for an exported frame
pub fn frame_filename<Tz: TimeZone>(at: &DateTime<Tz>, format: ExportFormat) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{PREFIX}-{}.{}",
        at.format("%Y%m%d-%H%M%S-%3f"),
        format.extension()
    )
}

/// Timestamped file name for a parameter dump
pub fn params_filename<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{PREFIX}-params-{}.json", at.format("%Y%m%d-%H%M%S-%3f"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn filename_carries_timestamp_and_extension() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(
            frame_filename(&at, ExportFormat::Png),
            "mandelzoom-20240309-070501-000.png"
        );
        assert_eq!(
            frame_filename(&at, ExportFormat::Ppm),
            "mandelzoom-20240309-070501-000.ppm"
        );
    }

    #[test]
    fn params_filename_is_json() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(
            params_filename(&at),
            "mandelzoom-params-20240309-070501-000.json"
        );
    }
}
