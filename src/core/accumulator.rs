use std::fmt::{Display, Formatter};

use chrono::{DateTime, Local, TimeDelta};
use enumset::EnumSet;
use serde_json::Value;

use crate::{
    core::{derived::battery_efficiency, path::extract_f64, period::Period},
    prelude::*,
    quantity::{energy::KilowattHours, power::Kilowatts},
};

/// Energy flow that an accumulator integrates.
#[derive(Debug, Hash, clap::ValueEnum, enumset::EnumSetType)]
pub enum Flow {
    /// Battery is charging.
    BatteryCharge,

    /// Battery is discharging.
    BatteryDischarge,

    /// Energy is drawn from the grid.
    GridImport,

    /// Surplus production goes into the grid.
    GridExport,
}

impl Display for Flow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BatteryCharge => write!(f, "battery_charge"),
            Self::BatteryDischarge => write!(f, "battery_discharge"),
            Self::GridImport => write!(f, "grid_import"),
            Self::GridExport => write!(f, "grid_export"),
        }
    }
}

impl Flow {
    pub const fn source(self) -> Source {
        match self {
            Self::BatteryCharge | Self::BatteryDischarge => Source::Path("battery.power"),
            Self::GridImport => Source::Path("grid"),
            Self::GridExport => {
                Source::Difference { minuend: "production", subtrahend: "selfConsumption" }
            }
        }
    }

    pub const fn direction(self) -> Direction {
        match self {
            Self::BatteryDischarge => Direction::Negative,
            Self::BatteryCharge | Self::GridImport | Self::GridExport => Direction::Positive,
        }
    }

    /// Instantaneous power flowing in this direction, zero when the sample is missing.
    pub fn sample(self, payload: &Value) -> Kilowatts {
        self.source().power(payload).map_or(Kilowatts::ZERO, |power| self.direction().select(power))
    }
}

/// Where to take the instantaneous power from.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Source {
    Path(&'static str),

    /// Missing operands count as zero.
    Difference { minuend: &'static str, subtrahend: &'static str },
}

impl Source {
    fn power(self, payload: &Value) -> Option<Kilowatts> {
        let watts = match self {
            Self::Path(path) => extract_f64(payload, path)?,
            Self::Difference { minuend, subtrahend } => {
                extract_f64(payload, minuend).unwrap_or_default()
                    - extract_f64(payload, subtrahend).unwrap_or_default()
            }
        };
        Some(Kilowatts::from_watts(watts))
    }
}

/// Sign of the power that counts.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Direction {
    Positive,

    /// Negative power counts with its absolute value.
    Negative,
}

impl Direction {
    fn select(self, power: Kilowatts) -> Kilowatts {
        match self {
            Self::Positive => power.max(Kilowatts::ZERO),
            Self::Negative => (-power).max(Kilowatts::ZERO),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct AccumulatorKey {
    pub flow: Flow,
    pub period: Period,
}

impl Display for AccumulatorKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.flow, self.period)
    }
}

#[must_use]
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Tick {
    /// The period boundary was crossed, the tick's sample is not counted.
    Reset,

    /// The energy added during the tick.
    Integrated(KilowattHours),
}

/// Energy accumulated over the current calendar period.
///
/// The energy never decreases except when the period resets.
#[derive(Copy, Clone, Debug)]
pub struct Accumulator {
    pub key: AccumulatorKey,
    energy: KilowattHours,
    last_reset: DateTime<Local>,
}

impl Accumulator {
    pub const fn new(key: AccumulatorKey, last_reset: DateTime<Local>) -> Self {
        Self { key, energy: KilowattHours::ZERO, last_reset }
    }

    /// Restore the persisted state, falling back to zero and `now` for whatever is missing.
    pub fn restore(
        key: AccumulatorKey,
        energy: Option<f64>,
        last_reset: Option<DateTime<Local>>,
        now: DateTime<Local>,
    ) -> Self {
        let energy = energy.filter(|energy| energy.is_finite() && *energy >= 0.0).unwrap_or(0.0);
        Self { energy: KilowattHours::from(energy), ..Self::new(key, last_reset.unwrap_or(now)) }
    }

    pub const fn energy(&self) -> KilowattHours {
        self.energy
    }

    pub const fn last_reset(&self) -> DateTime<Local> {
        self.last_reset
    }

    /// Advance by one refresh tick.
    ///
    /// `payload` is [`None`] until the first successful refresh, which contributes nothing.
    pub fn tick(&mut self, now: DateTime<Local>, payload: Option<&Value>, interval: TimeDelta) -> Tick {
        if let Some(boundary) = self.key.period.start_of(&now)
            && boundary > self.last_reset
        {
            self.energy = KilowattHours::ZERO;
            self.last_reset = boundary;
            return Tick::Reset;
        }
        let energy = payload.map_or(KilowattHours::ZERO, |payload| self.key.flow.sample(payload) * interval);
        self.energy += energy;
        Tick::Integrated(energy)
    }
}

/// All the configured accumulators, ticked together.
#[must_use]
pub struct Accumulators(Vec<Accumulator>);

impl Accumulators {
    pub fn new(
        flows: EnumSet<Flow>,
        periods: EnumSet<Period>,
        restore: impl FnMut(AccumulatorKey) -> Accumulator,
    ) -> Self {
        Self(
            periods
                .iter()
                .flat_map(|period| flows.iter().map(move |flow| AccumulatorKey { flow, period }))
                .map(restore)
                .collect(),
        )
    }

    pub fn tick(&mut self, now: DateTime<Local>, payload: Option<&Value>, interval: TimeDelta) {
        for accumulator in &mut self.0 {
            match accumulator.tick(now, payload, interval) {
                Tick::Reset => {
                    info!(key = %accumulator.key, last_reset = %accumulator.last_reset, "reset");
                }
                Tick::Integrated(energy) => {
                    trace!(key = %accumulator.key, %energy, "integrated");
                }
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Accumulator> {
        self.0.iter()
    }

    /// Battery efficiency over the period, if both battery flows are being accumulated.
    #[must_use]
    pub fn battery_efficiency(&self, period: Period) -> Option<f64> {
        let energy_of = |flow| {
            self.0
                .iter()
                .find(|accumulator| accumulator.key == AccumulatorKey { flow, period })
                .map(Accumulator::energy)
        };
        Some(battery_efficiency(energy_of(Flow::BatteryCharge)?, energy_of(Flow::BatteryDischarge)?))
    }
}
