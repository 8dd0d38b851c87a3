//! `eta` / `expires` の時刻表現
//!
//! 正規形式は `YYYY-MM-DDTHH:MM:SS.ffffff`（26 文字、マイクロ秒 6 桁、UTC、オフセットなし）。
//! これ以外の形（`Z` 付き、`+00:00` 付き、小数部の桁数違い）は受け付けない。
//! 年は 4 桁に収まる 0..=9999 のみ。範囲外は整形の時点で `TimeFormat` にする。

use chrono::{DateTime, Datelike, NaiveDateTime, TimeZone, Utc};

use crate::domain::errors::TaskError;

const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// `d` は数字、それ以外はそのままの文字
const WIRE_SHAPE: &[u8; 26] = b"dddd-dd-ddTdd:dd:dd.dddddd";

/// UTC に揃えてマイクロ秒精度で整形する（ナノ秒以下は切り捨て）
pub fn format_wire_time(field: &'static str, at: &DateTime<Utc>) -> Result<String, TaskError> {
    if !(0..=9999).contains(&at.year()) {
        return Err(TaskError::TimeFormat {
            field,
            value: at.to_rfc3339(),
        });
    }
    Ok(at.format(WIRE_FORMAT).to_string())
}

pub fn parse_wire_time(field: &'static str, value: &str) -> Result<DateTime<Utc>, TaskError> {
    let invalid = || TaskError::TimeFormat {
        field,
        value: value.to_string(),
    };

    if !has_wire_shape(value) {
        return Err(invalid());
    }

    let naive = NaiveDateTime::parse_from_str(value, WIRE_FORMAT).map_err(|_| invalid())?;
    Ok(Utc.from_utc_datetime(&naive))
}

fn has_wire_shape(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == WIRE_SHAPE.len()
        && bytes.iter().zip(WIRE_SHAPE).all(|(&b, &shape)| match shape {
            b'd' => b.is_ascii_digit(),
            literal => b == literal,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};
    use rstest::rstest;

    fn at(micros: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2023, 5, 1)
            .unwrap()
            .and_hms_micro_opt(12, 0, 0, micros)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn formats_six_fractional_digits() {
        assert_eq!(
            format_wire_time("eta", &at(123_456)).unwrap(),
            "2023-05-01T12:00:00.123456"
        );
        assert_eq!(
            format_wire_time("eta", &at(0)).unwrap(),
            "2023-05-01T12:00:00.000000"
        );
    }

    #[test]
    fn truncates_below_microseconds() {
        let precise = at(0).with_nanosecond(123_456_789).unwrap();
        assert_eq!(
            format_wire_time("eta", &precise).unwrap(),
            "2023-05-01T12:00:00.123456"
        );
    }

    #[rstest]
    #[case::five_digit_year(10000)]
    #[case::negative_year(-1)]
    fn years_outside_four_digits_are_not_formatted(#[case] year: i32) {
        let when = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap();
        let err = format_wire_time("expires", &when).unwrap_err();
        assert!(
            matches!(err, TaskError::TimeFormat { field: "expires", .. }),
            "got {err:?}"
        );
    }

    #[test]
    fn boundary_years_are_formatted() {
        let first = Utc.with_ymd_and_hms(0, 1, 1, 0, 0, 0).unwrap();
        let last = Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(
            format_wire_time("eta", &first).unwrap(),
            "0000-01-01T00:00:00.000000"
        );
        assert_eq!(
            format_wire_time("eta", &last).unwrap(),
            "9999-12-31T23:59:59.000000"
        );
    }

    #[test]
    fn parses_canonical_form_as_utc() {
        let parsed = parse_wire_time("eta", "2023-05-01T12:00:00.123456").unwrap();
        assert_eq!(parsed, at(123_456));
    }

    #[rstest]
    #[case::zulu_suffix("2023-05-01T12:00:00.123456Z")]
    #[case::offset_suffix("2023-05-01T12:00:00.123456+00:00")]
    #[case::no_fraction("2023-05-01T12:00:00")]
    #[case::millis_only("2023-05-01T12:00:00.123")]
    #[case::space_separator("2023-05-01 12:00:00.123456")]
    #[case::date_only("2023-05-01")]
    #[case::month_out_of_range("2023-13-01T12:00:00.123456")]
    #[case::empty("")]
    fn rejects_non_canonical_forms(#[case] value: &str) {
        let err = parse_wire_time("expires", value).unwrap_err();
        match err {
            TaskError::TimeFormat { field, value: got } => {
                assert_eq!(field, "expires");
                assert_eq!(got, value);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
