//! CP56Time2a timestamps for clock synchronization.

use chrono::{DateTime, Datelike, TimeZone, Timelike};

/// CP56Time2a timestamp (7 bytes on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cp56Time2a {
    /// Milliseconds (0-59999)
    pub milliseconds: u16,
    /// Minutes (0-59)
    pub minutes: u8,
    /// Hours (0-23)
    pub hours: u8,
    /// Day of month (1-31)
    pub day: u8,
    /// Day of week (1-7, 1=Monday)
    pub day_of_week: u8,
    /// Month (1-12)
    pub month: u8,
    /// Year (0-99, years since 2000)
    pub year: u8,
    /// Invalid flag
    pub invalid: bool,
    /// Summer time flag
    pub summer_time: bool,
}

impl Cp56Time2a {
    /// Capture a wall-clock instant.
    ///
    /// Leap seconds are folded into the last millisecond of the minute.
    pub fn from_datetime<Tz: TimeZone>(time: &DateTime<Tz>) -> Self {
        let millis = (time.second() * 1000 + time.nanosecond() / 1_000_000).min(59_999);
        Self {
            milliseconds: millis as u16,
            minutes: time.minute() as u8,
            hours: time.hour() as u8,
            day: time.day() as u8,
            day_of_week: time.weekday().number_from_monday() as u8,
            month: time.month() as u8,
            year: time.year().rem_euclid(100) as u8,
            invalid: false,
            summer_time: false,
        }
    }
}

impl std::fmt::Display for Cp56Time2a {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "20{:02}-{:02}-{:02} {:02}:{:02}:{:02}.{:03}",
            self.year,
            self.month,
            self.day,
            self.hours,
            self.minutes,
            self.milliseconds / 1000,
            self.milliseconds % 1000
        )?;
        if self.invalid {
            f.write_str(" IV")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    #[test]
    fn test_cp56time2a_from_datetime() {
        let dt = NaiveDate::from_ymd_opt(2024, 6, 12)
            .unwrap()
            .and_hms_milli_opt(12, 30, 30, 250)
            .unwrap()
            .and_utc();

        let time = Cp56Time2a::from_datetime(&dt);
        assert_eq!(time.milliseconds, 30_250);
        assert_eq!(time.minutes, 30);
        assert_eq!(time.hours, 12);
        assert_eq!(time.day, 12);
        assert_eq!(time.day_of_week, 3);
        assert_eq!(time.month, 6);
        assert_eq!(time.year, 24);
        assert!(!time.invalid);
    }

    #[test]
    fn test_cp56time2a_display() {
        let dt = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let time = Cp56Time2a::from_datetime(&dt);
        assert_eq!(time.to_string(), "2025-01-02 03:04:05.000");
    }
}
