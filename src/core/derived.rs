use std::fmt::{Display, Formatter};

use serde_json::Value;

use crate::{
    core::{path::extract_f64, sensor::Unit},
    quantity::energy::KilowattHours,
};

/// Readings calculated from several payload leaves.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Derived {
    /// Positive when charging, negative when discharging.
    BatteryChargePower,

    /// Energy currently stored in the battery.
    BatteryEnergyStored,

    /// Share of the production that goes into the grid.
    GridExportRate,
}

impl Display for Derived {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BatteryChargePower => write!(f, "Battery charge power"),
            Self::BatteryEnergyStored => write!(f, "Battery energy stored"),
            Self::GridExportRate => write!(f, "Grid export rate"),
        }
    }
}

impl Derived {
    pub const ALL: [Self; 3] =
        [Self::BatteryChargePower, Self::BatteryEnergyStored, Self::GridExportRate];

    #[must_use]
    pub const fn unit(self) -> Unit {
        match self {
            Self::BatteryChargePower => Unit::Watts,
            Self::BatteryEnergyStored => Unit::WattHours,
            Self::GridExportRate => Unit::Percent,
        }
    }

    #[must_use]
    pub fn value(self, payload: &Value) -> Option<f64> {
        match self {
            Self::BatteryChargePower => extract_f64(payload, "battery.power"),
            Self::BatteryEnergyStored => battery_energy_stored(payload),
            Self::GridExportRate => grid_export_rate(payload),
        }
    }
}

fn battery_energy_stored(payload: &Value) -> Option<f64> {
    extract_f64(payload, "battery.remainingCharge").or_else(|| {
        let capacity = extract_f64(payload, "battery.capacity")?;
        let state_of_charge = extract_f64(payload, "battery.stateOfCharge")?;
        Some(capacity * state_of_charge / 100.0)
    })
}

fn grid_export_rate(payload: &Value) -> Option<f64> {
    let production = extract_f64(payload, "production")?;
    let self_consumption = extract_f64(payload, "selfConsumption")?;
    if production == 0.0 {
        Some(0.0)
    } else {
        Some((production - self_consumption) / production * 100.0)
    }
}

/// Discharged energy as a percentage of the charged energy over the same period.
#[must_use]
pub fn battery_efficiency(charged: KilowattHours, discharged: KilowattHours) -> f64 {
    if charged.is_positive() { discharged / charged * 100.0 } else { 0.0 }
}
