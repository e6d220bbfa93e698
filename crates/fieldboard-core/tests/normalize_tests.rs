use fieldboard_core::models::{RawValue, Sample, SampleSeries};
use fieldboard_core::normalize::{normalize, numeric_value, LabelFormat, INVALID_LABEL};
use fieldboard_core::timeutils::ClockStyle;
use time::macros::offset;

fn utc() -> LabelFormat {
    LabelFormat::utc(ClockStyle::TwelveHour)
}

#[test]
fn labels_and_gaps_follow_samples() {
    let series: SampleSeries = vec![
        Sample::number("2024-01-01T00:00:00Z", 41.2),
        Sample::missing("2024-01-01T00:01:00Z"),
    ]
    .into_iter()
    .collect();

    let display = normalize(&series, &utc());
    let labels: Vec<&str> = display.labels().collect();
    let values: Vec<Option<f64>> = display.values().collect();
    assert_eq!(labels, vec!["12:00:00 AM", "12:01:00 AM"]);
    assert_eq!(values, vec![Some(41.2), None]);
}

#[test]
fn keeps_length_order_and_absence_positions() {
    let series: SampleSeries = (0..10)
        .map(|i| {
            let ts = format!("2024-03-05T13:{i:02}:30Z");
            if i % 3 == 0 {
                Sample::missing(ts)
            } else {
                Sample::number(ts, i as f64)
            }
        })
        .collect();

    let display = normalize(&series, &utc());
    assert_eq!(display.len(), series.len());
    for (i, point) in display.points.iter().enumerate() {
        if i % 3 == 0 {
            assert_eq!(point.value, None, "position {i} should stay absent");
        } else {
            assert_eq!(point.value, Some(i as f64));
        }
    }
    assert_eq!(display.points[1].label, "1:01:30 PM");
}

#[test]
fn normalizing_twice_gives_the_same_series() {
    let series: SampleSeries = vec![
        Sample::number("2024-01-01T08:00:00Z", 1.5),
        Sample::new("2024-01-01T08:00:15Z", Some(RawValue::Text("2.25".into()))),
        Sample::missing("not a timestamp"),
    ]
    .into_iter()
    .collect();

    let format = utc();
    assert_eq!(normalize(&series, &format), normalize(&series, &format));
}

#[test]
fn absent_is_never_zero() {
    assert_eq!(numeric_value(None), None);
    assert_eq!(numeric_value(Some(&RawValue::Text("".into()))), None);
    assert_eq!(numeric_value(Some(&RawValue::Text("n/a".into()))), None);
    assert_eq!(numeric_value(Some(&RawValue::Text(" 7 ".into()))), Some(7.0));
    assert_eq!(numeric_value(Some(&RawValue::Number(0.0))), Some(0.0));
    assert_eq!(numeric_value(Some(&RawValue::Text("inf".into()))), None);
}

#[test]
fn unparseable_timestamp_keeps_its_slot() {
    let series: SampleSeries = vec![
        Sample::number("yesterday", 3.0),
        Sample::number("2024-01-01T00:00:00Z", 4.0),
    ]
    .into_iter()
    .collect();
    let display = normalize(&series, &utc());
    assert_eq!(display.points[0].label, INVALID_LABEL);
    assert_eq!(display.points[0].value, Some(3.0));
    assert_eq!(display.points[1].label, "12:00:00 AM");
}

#[test]
fn labels_respect_offset_and_clock() {
    let series: SampleSeries = vec![Sample::number("2024-06-01T22:15:09Z", 1.0)]
        .into_iter()
        .collect();

    let berlin = LabelFormat {
        offset: offset!(+2),
        clock: ClockStyle::TwentyFourHour,
    };
    assert_eq!(normalize(&series, &berlin).points[0].label, "00:15:09");

    let twelve = LabelFormat {
        offset: offset!(+2),
        clock: ClockStyle::TwelveHour,
    };
    assert_eq!(normalize(&series, &twelve).points[0].label, "12:15:09 AM");
}
