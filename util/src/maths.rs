//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Apply polynomial coefficients to a value.
///
/// Coefficients are ordered highest power first, i.e. if there are 3
/// coefficients it's a 2nd order polynomial `c[0]*x^2 + c[1]*x + c[2]`. The
/// polynomial is evaluated with Horner's method. An empty coefficient slice
/// evaluates to zero.
pub fn poly_val<T>(value: T, coeffs: &[T]) -> T
where
    T: Float
{
    coeffs
        .iter()
        .fold(T::zero(), |acc, &c| acc * value + c)
}

/// Limit `value` to the inclusive range `[min, max]`.
///
/// `min` must not be greater than `max`.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: PartialOrd
{
    if value > max {
        max
    }
    else if value < min {
        min
    }
    else {
        value
    }
}

/// Check that a sequence of values never decreases.
///
/// Used to check that calibration curves sampled over their domain are
/// monotonic.
pub fn is_non_decreasing<T>(values: &[T]) -> bool
where
    T: PartialOrd
{
    values.windows(2).all(|w| w[0] <= w[1])
}
