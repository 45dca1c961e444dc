//! Stop conditions for a polling wait
//!
//! Any `Fn(&T) -> bool` works as a predicate. The functions here cover the
//! common cases and can be passed directly, e.g. `predicate::is_true`.

/// Accepts a present `Option`
pub fn is_some<T>(value: &Option<T>) -> bool {
    value.is_some()
}

/// Accepts `true`
pub fn is_true(value: &bool) -> bool {
    *value
}

/// Inverts another predicate
pub fn not<T, F>(predicate: F) -> impl Fn(&T) -> bool
where
    F: Fn(&T) -> bool,
{
    move |value| !predicate(value)
}

/// Accepts values equal to `expected`
pub fn equals<T>(expected: T) -> impl Fn(&T) -> bool
where
    T: PartialEq,
{
    move |value| *value == expected
}
