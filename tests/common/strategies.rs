use proptest::prelude::*;

/// Timestamps that stay inside the range chrono can represent after an offset
pub fn timestamp_strategy() -> impl Strategy<Value = i64> {
    prop_oneof![1i64..=4_102_444_800, -2_208_988_800i64..0]
}

/// Offsets in seconds, including none
pub fn offset_strategy() -> impl Strategy<Value = i64> {
    prop_oneof![Just(0i64), Just(43_200i64), -86_400i64..=86_400]
}

/// Identifiers accepted as DEVICEID
pub fn device_id_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_-]{1,64}"
}

/// Numeric strings that are not exactly "0"
pub fn non_zero_numeric_strategy() -> impl Strategy<Value = String> {
    "[0-9]{1,9}[a-z]?".prop_filter("not the zero sentinel", |s| s != "0")
}
