#![allow(dead_code)]

pub use cloudy_test_utils::builders;
pub use cloudy_test_utils::fakes;
pub use cloudy_test_utils::{init_tracing, reference_time, with_timeout};

use chrono::{DateTime, TimeDelta, Utc};

/// `reference_time() + minutes`.
pub fn at(minutes: i64) -> DateTime<Utc> {
    reference_time() + TimeDelta::minutes(minutes)
}

pub fn minutes(n: i64) -> TimeDelta {
    TimeDelta::minutes(n)
}
