use crate::errors::ConfigError;
use std::str::FromStr;

/// Finds the index range of elements in a sorted slice whose keys fall within `[low, high]`.
///
/// The slice must be sorted ascending by `key_fn`. Two binary searches are
/// performed, so the cost is O(log n). An inverted range (`low > high`)
/// yields an empty range instead of panicking.
///
/// # Examples
///
/// ```
/// use mzrecal::utils::sorted_range_by_key;
///
/// let rts = [1.0, 2.0, 2.5, 4.0, 8.0];
/// let range = sorted_range_by_key(&rts, 2.0, 4.0, |x| *x);
/// assert_eq!(&rts[range], &[2.0, 2.5, 4.0]);
///
/// let empty = sorted_range_by_key(&rts, 5.0, 3.0, |x| *x);
/// assert!(empty.is_empty());
/// ```
pub fn sorted_range_by_key<T, F>(slice: &[T], low: f64, high: f64, key_fn: F) -> std::ops::Range<usize>
where
    F: Fn(&T) -> f64,
{
    let start_idx = slice.partition_point(|x| key_fn(x) < low);
    let end_idx = start_idx + slice[start_idx..].partition_point(|x| key_fn(x) <= high);

    start_idx..end_idx
}

/// TupleRange represents a closed-closed range [a, b].
///
/// The first element is always less than or equal to the second.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TupleRange<T: Copy + PartialOrd>(T, T);

impl<T: Copy + PartialOrd + std::fmt::Debug> TupleRange<T> {
    pub fn try_new(left: T, right: T) -> Option<Self> {
        if left > right {
            None
        } else {
            Some(Self(left, right))
        }
    }

    pub fn as_tuple(&self) -> (T, T) {
        (self.0, self.1)
    }

    pub fn contains(&self, x: T) -> bool {
        self.0 <= x && x <= self.1
    }

    pub fn start(&self) -> T {
        self.0
    }

    pub fn end(&self) -> T {
        self.1
    }
}

/// Splits `"<min>:<max>"` and parses each side, substituting the defaults for
/// empty sides and clamping to them.
fn parse_range<T>(input: &str, default_min: T, default_max: T) -> Result<TupleRange<T>, ConfigError>
where
    T: Copy + PartialOrd + FromStr + std::fmt::Debug,
{
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(TupleRange(default_min, default_max));
    }
    let (left, right) = trimmed.split_once(':').ok_or(ConfigError::MalformedRange {
        input: input.to_string(),
        reason: "expected '<min>:<max>'",
    })?;

    let parse_side = |side: &str, default: T| -> Result<T, ConfigError> {
        let side = side.trim();
        if side.is_empty() {
            return Ok(default);
        }
        side.parse::<T>().map_err(|_| ConfigError::MalformedRange {
            input: input.to_string(),
            reason: "not a number",
        })
    };

    let mut min = parse_side(left, default_min)?;
    let mut max = parse_side(right, default_max)?;
    if min < default_min {
        min = default_min;
    }
    if max > default_max {
        max = default_max;
    }

    TupleRange::try_new(min, max).ok_or(ConfigError::MalformedRange {
        input: input.to_string(),
        reason: "min > max",
    })
}

/// Parses strings like `"-12.01e1:+6"` into `(-120.1, 6.0)`.
///
/// Missing sides take the default bound, values beyond the defaults are clamped.
pub fn parse_float_range(
    input: &str,
    default_min: f64,
    default_max: f64,
) -> Result<TupleRange<f64>, ConfigError> {
    parse_range(input, default_min, default_max)
}

/// Integer counterpart of [`parse_float_range`].
pub fn parse_int_range(
    input: &str,
    default_min: i64,
    default_max: i64,
) -> Result<TupleRange<i64>, ConfigError> {
    parse_range(input, default_min, default_max)
}
