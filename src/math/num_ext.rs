//! Extensions to numeric types. Used instead of the unstable `int_roundings` std
//! feature.

pub(crate) trait NumExt {
    /// Division with rounding towards negative infinity.
    fn div_floor(self, other: Self) -> Self;

    /// Division with rounding towards positive infinity.
    fn div_ceil(self, other: Self) -> Self;
}

impl NumExt for i32 {
    fn div_floor(self, other: Self) -> Self {
        let d = self / other;
        let r = self % other;
        if (r > 0 && other < 0) || (r < 0 && other > 0) {
            d - 1
        } else {
            d
        }
    }

    fn div_ceil(self, other: Self) -> Self {
        let d = self / other;
        let r = self % other;
        if (r > 0 && other > 0) || (r < 0 && other < 0) {
            d + 1
        } else {
            d
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn div_floor_rounds_towards_negative_infinity() {
        assert_eq!(NumExt::div_floor(7, 2), 3);
        assert_eq!(NumExt::div_floor(-7, 2), -4);
        assert_eq!(NumExt::div_floor(7, -2), -4);
        assert_eq!(NumExt::div_floor(-7, -2), 3);
    }

    #[test]
    fn div_ceil_rounds_towards_positive_infinity() {
        assert_eq!(NumExt::div_ceil(7, 2), 4);
        assert_eq!(NumExt::div_ceil(-7, 2), -3);
        assert_eq!(NumExt::div_ceil(7, -2), -3);
        assert_eq!(NumExt::div_ceil(-7, -2), 4);
    }
}
