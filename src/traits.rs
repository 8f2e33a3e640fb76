//! Scalar trait for matrix and vector elements.

use num_traits::Num;
use std::fmt::Debug;
use std::ops::AddAssign;

/// Trait for scalar types that can be stored in a CISR matrix.
///
/// Covers the float and integer primitives. `PartialOrd` is required by the
/// default presence predicate (`value > 0`); complex scalars are therefore
/// not supported as element types.
pub trait Scalar:
    Num + Copy + PartialOrd + AddAssign + Send + Sync + Debug + 'static
{
}

impl<T> Scalar for T where
    T: Num + Copy + PartialOrd + AddAssign + Send + Sync + Debug + 'static
{
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_scalar<T: Scalar>() {}

    #[test]
    fn test_primitive_scalars() {
        assert_scalar::<f32>();
        assert_scalar::<f64>();
        assert_scalar::<i32>();
        assert_scalar::<i64>();
        assert_scalar::<u64>();
    }
}
