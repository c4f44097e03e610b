//! Time parsing and window computation tests.

use cliptrim::{
    EndFrame, FrameWindow, TimeSpec, TrimError, looks_like_time_spec, parse_mmss, to_seconds,
};

#[test]
fn valid_times_convert_to_seconds() {
    for minutes in 0..60u64 {
        for seconds in [0u64, 1, 30, 59] {
            let text = format!("{minutes:02}:{seconds:02}");
            assert_eq!(to_seconds(&text).unwrap(), minutes * 60 + seconds, "{text}");
            assert_eq!(parse_mmss(Some(text.as_str())), TimeSpec::Seconds(minutes * 60 + seconds));
        }
    }
}

#[test]
fn documented_examples() {
    assert_eq!(parse_mmss(Some("01:30")), TimeSpec::Seconds(90));
    assert_eq!(parse_mmss(Some("00:00")), TimeSpec::Seconds(0));
    assert_eq!(parse_mmss(Some("12:05")), TimeSpec::Seconds(725));
    assert_eq!(parse_mmss(Some("1:30:00")), TimeSpec::Absent);
    assert_eq!(
        parse_mmss(Some("02:75")),
        TimeSpec::Malformed("02:75".to_string())
    );
    assert_eq!(TimeSpec::Seconds(90).seconds(), Some(90));
    assert_eq!(TimeSpec::Absent.seconds(), None);
}

#[test]
fn single_digit_fields_are_accepted() {
    assert_eq!(to_seconds("1:5").unwrap(), 65);
    assert_eq!(parse_mmss(Some("0:0")), TimeSpec::Seconds(0));
}

#[test]
fn non_matching_values_are_absent() {
    for value in ["", "abc", "1:2:3", "01-30", "01:", ":30", " 01:30", "01:30 ", "-1:30"] {
        assert!(!looks_like_time_spec(value), "{value:?} should not look like mm:ss");
        assert_eq!(parse_mmss(Some(value)), TimeSpec::Absent, "{value:?}");
    }
    assert_eq!(parse_mmss(None), TimeSpec::Absent);
}

#[test]
fn out_of_range_values_are_malformed() {
    for value in ["02:75", "60:00", "00:60", "123:00", "00:007"] {
        assert!(looks_like_time_spec(value), "{value:?} has the mm:ss shape");
        assert_eq!(
            parse_mmss(Some(value)),
            TimeSpec::Malformed(value.to_string()),
            "{value:?}"
        );

        let error = to_seconds(value).unwrap_err();
        assert!(
            matches!(error, TrimError::TimeConversion { .. }),
            "unexpected error for {value:?}: {error}"
        );
    }
}

#[test]
fn conversion_error_names_the_value() {
    let message = to_seconds("02:75").unwrap_err().to_string();
    assert!(message.contains("02:75"), "{message}");
    assert!(message.contains("mm:ss"), "{message}");
}

#[test]
fn malformed_and_absent_share_the_fallback() {
    let malformed = FrameWindow::compute(
        &parse_mmss(Some("02:75")),
        &parse_mmss(Some("99:99")),
        30.0,
        Some(300),
    );
    let absent = FrameWindow::compute(&TimeSpec::Absent, &TimeSpec::Absent, 30.0, Some(300));

    assert_eq!(malformed, absent);
    assert_eq!(absent.start_frame, 0);
    assert_eq!(absent.end_frame, EndFrame::SourceLength(300));
}

#[test]
fn window_uses_fixed_rate() {
    let window = FrameWindow::compute(
        &parse_mmss(Some("00:01")),
        &parse_mmss(Some("00:05")),
        30.0,
        Some(300),
    );
    assert_eq!(window.start_frame, 30);
    assert_eq!(window.end_frame, EndFrame::At(150));
    assert_eq!(window.total_frames(), Some(120));
    assert_eq!(window.to_string(), "[30, 150)");
}

#[test]
fn missing_end_without_frame_count_is_unbounded() {
    let window = FrameWindow::compute(&parse_mmss(Some("00:02")), &TimeSpec::Absent, 30.0, None);
    assert_eq!(window.end_frame, EndFrame::Unbounded);
    assert_eq!(window.total_frames(), None);
    assert!(window.validate().is_ok());
}

#[test]
fn inverted_and_empty_windows_are_rejected() {
    let inverted = FrameWindow::compute(
        &parse_mmss(Some("00:05")),
        &parse_mmss(Some("00:01")),
        30.0,
        Some(300),
    );
    assert!(matches!(
        inverted.validate(),
        Err(TrimError::InvalidRange {
            start_frame: 150,
            end_frame: 30
        })
    ));
    assert_eq!(inverted.total_frames(), Some(0));

    let empty = FrameWindow::compute(
        &parse_mmss(Some("00:03")),
        &parse_mmss(Some("00:03")),
        30.0,
        Some(300),
    );
    assert!(empty.validate().is_err());
}
