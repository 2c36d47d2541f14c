/// Asserts two floats agree within an absolute tolerance.
#[macro_export]
macro_rules! assert_close {
    ($left:expr, $right:expr, $tol:expr) => {
        let (l, r): (f64, f64) = ($left, $right);
        assert!(
            (l - r).abs() <= $tol,
            "{} = {} differs from {} = {} by more than {}",
            stringify!($left),
            l,
            stringify!($right),
            r,
            $tol
        );
    };
}

/// Asserts the total mass of a field.
#[macro_export]
macro_rules! assert_mass {
    ($field:expr, $expected:expr) => {
        $crate::assert_close!($field.total(), $expected, 1e-9);
    };
    ($field:expr, $expected:expr, $tol:expr) => {
        $crate::assert_close!($field.total(), $expected, $tol);
    };
}
