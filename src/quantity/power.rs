use std::{
    fmt::{Debug, Formatter},
    ops::Mul,
};

use chrono::TimeDelta;

use crate::quantity::{Quantity, energy::KilowattHours};

pub type Kilowatts = Quantity<f64, 1, 0>;

impl Kilowatts {
    /// The vendor reports instantaneous power in watts.
    pub fn from_watts(watts: f64) -> Self {
        Self(watts / 1000.0)
    }
}

impl Debug for Kilowatts {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.0}W", self.0 * 1000.0)
    }
}

impl Mul<TimeDelta> for Kilowatts {
    type Output = KilowattHours;

    fn mul(self, rhs: TimeDelta) -> Self::Output {
        let hours = rhs.as_seconds_f64() / 3600.0;
        Quantity(self.0 * hours)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_one_minute_of_600_watts() {
        let energy = Kilowatts::from_watts(600.0) * TimeDelta::seconds(60);
        assert_abs_diff_eq!(energy.0, 0.01);
    }
}
