use chrono::{Datelike, NaiveDate};

/// Parse a calendar date stored as `YYYY-MM-DD`. A trailing time part
/// (`2024-02-15T00:00:00Z`, `2024-02-15 08:30`) is ignored.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let t = raw.trim();
    if t.is_empty() {
        return None;
    }
    let date_part = t.split(['T', ' ']).next().unwrap_or(t);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Age in completed years on `on`. `None` when either date is missing or the
/// reference date precedes the birth date.
pub fn age_on(dob: Option<NaiveDate>, on: Option<NaiveDate>) -> Option<i32> {
    let (dob, on) = (dob?, on?);
    if on < dob {
        return None;
    }
    let mut age = on.year() - dob.year();
    if (on.month(), on.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    Some(age)
}

pub fn age_from_strs(dob: Option<&str>, on: Option<&str>) -> Option<i32> {
    age_on(dob.and_then(parse_date), on.and_then(parse_date))
}

/// Imperial BMI: `weight_lb / height_in^2 * 703`. Unrounded.
pub fn bmi(height_in: Option<f64>, weight_lb: Option<f64>) -> Option<f64> {
    let (h, w) = (height_in?, weight_lb?);
    if !(h > 0.0) || !w.is_finite() {
        return None;
    }
    Some(w / (h * h) * 703.0)
}

/// 1-decimal display rounding: `Int(10*x + 0.5) / 10`.
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

/// Percent change from `from` to `to`, relative to `|from|`. Zero when `from`
/// is zero.
pub fn percent_change(from: f64, to: f64) -> f64 {
    if from == 0.0 {
        return 0.0;
    }
    (to - from) / from.abs() * 100.0
}

/// Mile run entry: whole minutes plus seconds (clamped to 0..=59) as decimal
/// minutes. `None` when both parts are blank.
pub fn mile_time_from_parts(minutes: Option<i64>, seconds: Option<i64>) -> Option<f64> {
    if minutes.is_none() && seconds.is_none() {
        return None;
    }
    let m = minutes.unwrap_or(0).max(0);
    let s = seconds.unwrap_or(0).clamp(0, 59);
    Some(m as f64 + s as f64 / 60.0)
}

/// Split decimal minutes back into (minutes, seconds) for display.
pub fn mile_time_parts(decimal_minutes: f64) -> (i64, i64) {
    let m = decimal_minutes.floor();
    let s = ((decimal_minutes - m) * 60.0).round().clamp(0.0, 59.0);
    (m as i64, s as i64)
}

/// Start year of the school year containing `date`. Dates before
/// `start_month` belong to the year that began the previous calendar year.
pub fn school_year_start(date: NaiveDate, start_month: u32) -> i32 {
    if date.month() >= start_month {
        date.year()
    } else {
        date.year() - 1
    }
}

pub fn school_year_label(start_year: i32) -> String {
    format!("{}-{}", start_year, start_year + 1)
}

/// Accepts `2024-2025` or a bare start year `2024`.
pub fn parse_school_year(raw: &str) -> Option<i32> {
    let t = raw.trim();
    match t.split_once('-') {
        Some((a, b)) => {
            let start: i32 = a.trim().parse().ok()?;
            let end: i32 = b.trim().parse().ok()?;
            (end == start + 1).then_some(start)
        }
        None => t.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_decrements_before_birthday() {
        assert_eq!(age_from_strs(Some("2015-03-10"), Some("2024-02-15")), Some(8));
        assert_eq!(age_from_strs(Some("2015-03-10"), Some("2024-03-10")), Some(9));
        assert_eq!(age_from_strs(Some("2015-03-10"), Some("2024-03-09")), Some(8));
        assert_eq!(age_from_strs(Some("2015-03-10"), Some("2024-11-01")), Some(9));
    }

    #[test]
    fn age_undefined_for_missing_dates() {
        assert_eq!(age_from_strs(None, Some("2024-02-15")), None);
        assert_eq!(age_from_strs(Some("2015-03-10"), None), None);
        assert_eq!(age_from_strs(Some("not a date"), Some("2024-02-15")), None);
        assert_eq!(age_from_strs(Some("2024-02-15"), Some("2015-03-10")), None);
    }

    #[test]
    fn age_accepts_timestamps() {
        assert_eq!(
            age_from_strs(Some("2012-06-30T00:00:00.000Z"), Some("2024-09-15")),
            Some(12)
        );
    }

    #[test]
    fn bmi_matches_imperial_formula() {
        let v = bmi(Some(64.0), Some(120.0)).expect("bmi");
        assert!((v - 120.0 / (64.0 * 64.0) * 703.0).abs() < 1e-12);
        assert_eq!(round_off_1_decimal(v), 20.6);
        assert_eq!(bmi(None, Some(120.0)), None);
        assert_eq!(bmi(Some(64.0), None), None);
        assert_eq!(bmi(Some(0.0), Some(120.0)), None);
    }

    #[test]
    fn round_off_half_up() {
        assert_eq!(round_off_1_decimal(0.0), 0.0);
        assert_eq!(round_off_1_decimal(3.54), 3.5);
        assert_eq!(round_off_1_decimal(3.55), 3.6);
    }

    #[test]
    fn percent_change_uses_magnitude_of_base() {
        assert_eq!(percent_change(20.0, 25.0), 25.0);
        assert_eq!(percent_change(-10.0, -5.0), 50.0);
        assert_eq!(percent_change(0.0, 5.0), 0.0);
    }

    #[test]
    fn mile_time_parts_round_trip_display() {
        let v = mile_time_from_parts(Some(9), Some(30)).expect("time");
        assert!((v - 9.5).abs() < 1e-12);
        assert_eq!(mile_time_parts(v), (9, 30));
        assert_eq!(mile_time_from_parts(Some(8), Some(75)), Some(8.0 + 59.0 / 60.0));
        assert_eq!(mile_time_from_parts(None, None), None);
    }

    #[test]
    fn school_year_boundaries() {
        let d = |s: &str| parse_date(s).expect("date");
        assert_eq!(school_year_start(d("2024-08-01"), 8), 2024);
        assert_eq!(school_year_start(d("2024-07-31"), 8), 2023);
        assert_eq!(school_year_start(d("2025-03-01"), 8), 2024);
        assert_eq!(school_year_label(2024), "2024-2025");
        assert_eq!(parse_school_year("2024-2025"), Some(2024));
        assert_eq!(parse_school_year(" 2024 "), Some(2024));
        assert_eq!(parse_school_year("2024-2026"), None);
        assert_eq!(parse_school_year("fall"), None);
    }
}
