use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

use historical_backfill::windowing::{BatchStep, Interval};

/// Dates between 1995 and roughly 2035, including month ends
pub fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (0i64..14_600).prop_map(|offset| {
        NaiveDate::from_ymd_opt(1995, 1, 1).unwrap() + Duration::days(offset)
    })
}

/// Ranges up to about six years long, sometimes empty
pub fn interval_strategy() -> impl Strategy<Value = Interval> {
    (date_strategy(), 0i64..2_200)
        .prop_map(|(start, len)| Interval::new(start, start + Duration::days(len)).unwrap())
}

pub fn step_strategy() -> impl Strategy<Value = BatchStep> {
    prop_oneof![
        (1u32..=90).prop_map(BatchStep::days),
        (1u32..=24).prop_map(BatchStep::months),
    ]
}
