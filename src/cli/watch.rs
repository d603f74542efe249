use std::{io, path::PathBuf, time::Duration};

use bon::bon;
use chrono::{Local, TimeDelta};
use clap::Parser;
use enumset::EnumSet;
use reqwest::Url;
use tokio::signal;

use crate::{
    api::heartbeat,
    cli::gridx::GridxArgs,
    core::{
        accumulator::{Accumulators, Flow},
        period::Period,
        sensor::Sensor,
        store::Store,
    },
    prelude::*,
    refresh::{Coordinator, LiveSource, RefreshState},
    tables::build_accumulators_table,
};

#[derive(Parser)]
pub struct WatchArgs {
    #[clap(flatten)]
    gridx: GridxArgs,

    #[clap(long, env = "POLLING_INTERVAL", default_value = "1min")]
    polling_interval: humantime::Duration,

    /// Where the accumulated energy survives the restarts.
    #[clap(long, env = "STATE_FILE", default_value = "gridx-state.toml")]
    state_file: PathBuf,

    /// Energy flows to accumulate.
    #[clap(
        long,
        env = "FLOWS",
        value_delimiter = ',',
        num_args = 1..,
        default_value = "battery-charge,battery-discharge,grid-import,grid-export",
    )]
    flows: Vec<Flow>,

    /// Calendar periods to accumulate the flows over.
    #[clap(long, env = "PERIODS", value_delimiter = ',', num_args = 1.., default_value = "daily,weekly,monthly")]
    periods: Vec<Period>,

    /// Pinged after every tick.
    #[clap(long = "heartbeat-url", env = "HEARTBEAT_URL")]
    heartbeat_url: Option<Url>,
}

impl WatchArgs {
    pub async fn run(self) -> Result {
        let polling_interval: Duration = self.polling_interval.into();
        let tick = TimeDelta::from_std(polling_interval).context("the polling interval is too long")?;
        let heartbeat = heartbeat::Client::try_new(self.heartbeat_url)?;

        let api = self.gridx.new_api()?;
        let (_, gateway_id) = api.connect().await?;
        info!(%gateway_id, "connected");

        Watcher::builder()
            .coordinator(Coordinator::new(api, polling_interval))
            .flows(self.flows.into_iter().collect())
            .periods(self.periods.into_iter().collect())
            .tick(tick)
            .state_file(self.state_file)
            .heartbeat(heartbeat)
            .build()
            .await
            .run(signal::ctrl_c())
            .await
    }
}

struct Watcher<S> {
    coordinator: Coordinator<S>,

    /// Discovered from the first fresh payload.
    sensors: Vec<Sensor>,

    accumulators: Accumulators,
    periods: EnumSet<Period>,
    tick: TimeDelta,
    state_file: PathBuf,
    heartbeat: heartbeat::Client,
}

#[bon]
impl<S: LiveSource> Watcher<S> {
    /// Await the first refresh, and only then restore the accumulators.
    #[builder]
    async fn new(
        coordinator: Coordinator<S>,
        flows: EnumSet<Flow>,
        periods: EnumSet<Period>,
        tick: TimeDelta,
        state_file: PathBuf,
        heartbeat: heartbeat::Client,
    ) -> Self {
        let state = coordinator.refresh_now().await;
        let sensors = state.payload.as_deref().map(Sensor::discover).unwrap_or_default();
        info!(n_sensors = sensors.len(), "first refresh done");

        let store = Store::read_from(&state_file);
        let now = Local::now();
        let accumulators = Accumulators::new(flows, periods, |key| store.restore(key, now));

        Self { coordinator, sensors, accumulators, periods, tick, state_file, heartbeat }
    }
}

impl<S: LiveSource> Watcher<S> {
    /// Tick until `interrupted` resolves.
    ///
    /// The same `interrupted` future is polled across the iterations, so an interrupt that arrives
    /// in the middle of a refresh is still seen by the next `select!`.
    async fn run(mut self, interrupted: impl Future<Output = io::Result<()>>) -> Result {
        let mut ticker = self.coordinator.ticker();
        tokio::pin!(interrupted);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                result = &mut interrupted => {
                    result.context("failed to listen for Ctrl-C")?;
                    info!("interrupted");
                    break;
                }
            }
            let state = self.coordinator.refresh_now().await;
            self.on_refresh(&state);
            self.heartbeat.send().await;
        }
        println!("{}", build_accumulators_table(&self.accumulators, self.periods));
        Ok(())
    }

    #[instrument(skip_all, fields(refreshed_at = ?state.refreshed_at))]
    fn on_refresh(&mut self, state: &RefreshState) {
        if let Some(error) = &state.last_error {
            warn!(has_payload = state.payload.is_some(), "no fresh data: {error}");
        }
        if self.sensors.is_empty()
            && let Some(payload) = state.fresh_payload()
        {
            self.sensors = Sensor::discover(payload);
            info!(n_sensors = self.sensors.len(), "discovered");
        }

        // The last payload stays in use while the refreshes fail:
        self.accumulators.tick(Local::now(), state.payload.as_deref(), self.tick);
        if let Err(error) = Store::from(&self.accumulators).write_to(&self.state_file) {
            error!("failed to save the state: {error:#}");
        }

        for sensor in &self.sensors {
            let reading = self.coordinator.read(sensor);
            debug!(sensor = %sensor.name(), value = ?reading.value, available = reading.available);
        }
        for accumulator in self.accumulators.iter() {
            info!(key = %accumulator.key, energy = %accumulator.energy());
        }
        for period in self.periods {
            if let Some(efficiency) = self.accumulators.battery_efficiency(period) {
                info!(%period, efficiency = format!("{efficiency:.1}%"), "battery efficiency");
            }
        }
    }
}
