pub mod energy;
pub mod power;

use std::ops::Div;

#[derive(
    Clone,
    Copy,
    PartialEq,
    PartialOrd,
    derive_more::Add,
    derive_more::AddAssign,
    derive_more::From,
    derive_more::Neg,
    derive_more::Sub,
)]
pub struct Quantity<T, const POWER: isize, const TIME: isize>(pub T);

impl<T, const POWER: isize, const TIME: isize> Quantity<T, POWER, TIME>
where
    Self: PartialOrd,
{
    pub fn max(mut self, rhs: Self) -> Self {
        if rhs > self {
            self = rhs;
        }
        self
    }
}

impl<const POWER: isize, const TIME: isize> Quantity<f64, POWER, TIME> {
    pub const ZERO: Self = Self(0.0);

    pub fn is_positive(self) -> bool {
        self.0 > 0.0
    }
}

/// Ratio of two same-dimension quantities.
impl<const POWER: isize, const TIME: isize> Div for Quantity<f64, POWER, TIME> {
    type Output = f64;

    fn div(self, rhs: Self) -> Self::Output {
        self.0 / rhs.0
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::{Debug, Formatter};

    use super::*;

    pub type Bare<T> = Quantity<T, 0, 0>;

    impl<T: Debug> Debug for Bare<T> {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self.0)
        }
    }

    #[test]
    fn test_max() {
        assert_eq!(Bare::from(1).max(Bare::from(2)), Bare::from(2));
        assert_eq!(Bare::from(2).max(Bare::from(1)), Bare::from(2));
    }

    #[test]
    fn test_neg_max() {
        assert_eq!((-Bare::from(-1.5)).max(Bare::ZERO), Bare::from(1.5));
        assert_eq!((-Bare::from(1.5)).max(Bare::ZERO), Bare::ZERO);
    }

    #[test]
    fn test_is_positive() {
        assert!(Bare::from(0.1).is_positive());
        assert!(!Bare::from(-1.5).is_positive());
        assert!(!Bare::<f64>::ZERO.is_positive());
    }

    #[test]
    fn test_ratio() {
        assert_eq!(Bare::from(3.0) / Bare::from(4.0), 0.75);
    }
}
