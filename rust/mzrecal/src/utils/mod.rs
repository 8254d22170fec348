pub mod ranges;

pub use ranges::{
    TupleRange,
    parse_float_range,
    parse_int_range,
    sorted_range_by_key,
};

/// Relative error `(target - observed) / target`, the unit used for
/// every acceptance decision.
#[inline]
pub fn relative_error(target: f64, observed: f64) -> f64 {
    (target - observed) / target
}

pub const PPM: f64 = 1e-6;
