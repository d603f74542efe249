use std::{collections::BTreeMap, fs, path::Path};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnError, serde_as};

use crate::{
    core::accumulator::{Accumulator, AccumulatorKey, Accumulators},
    prelude::*,
};

/// Accumulator state persisted between the runs.
#[must_use]
#[derive(Default, Serialize, Deserialize)]
pub struct Store {
    /// Keyed by the accumulator key, for example `battery_charge_daily`.
    #[serde(default)]
    pub accumulators: BTreeMap<String, Entry>,
}

#[serde_as]
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Entry {
    /// Accumulated energy in kilowatt-hours.
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,

    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reset: Option<DateTime<Local>>,
}

impl Store {
    /// Read the store, falling back to the empty one if the file is missing or broken.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn read_from(path: &Path) -> Self {
        Self::read_fallibly_from(path).unwrap_or_else(|error| {
            error!("failed to read the state, starting from scratch: {error:#}");
            Self::default()
        })
    }

    fn read_fallibly_from(path: &Path) -> Result<Self> {
        if path.is_file() {
            let contents = fs::read_to_string(path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            info!("no state yet");
            Ok(Self::default())
        }
    }

    /// Write the store next to the target and then move it in place.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn write_to(&self, path: &Path) -> Result {
        let temporary_path = path.with_extension("toml.tmp");
        fs::write(&temporary_path, toml::to_string(self)?)
            .with_context(|| format!("failed to write `{}`", temporary_path.display()))?;
        fs::rename(&temporary_path, path)
            .with_context(|| format!("failed to move the state to `{}`", path.display()))?;
        debug!("saved");
        Ok(())
    }

    pub fn restore(&self, key: AccumulatorKey, now: DateTime<Local>) -> Accumulator {
        let entry = self.accumulators.get(&key.to_string()).cloned().unwrap_or_default();
        Accumulator::restore(key, entry.value, entry.last_reset, now)
    }
}

impl From<&Accumulators> for Store {
    fn from(accumulators: &Accumulators) -> Self {
        let accumulators = accumulators
            .iter()
            .map(|accumulator| {
                let entry = Entry {
                    value: Some(accumulator.energy().0),
                    last_reset: Some(accumulator.last_reset()),
                };
                (accumulator.key.to_string(), entry)
            })
            .collect();
        Self { accumulators }
    }
}
