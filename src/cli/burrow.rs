use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::{
    cli::gridx::GridxArgs,
    core::sensor::Sensor,
    prelude::*,
    refresh::RefreshState,
    tables::build_readings_table,
};

#[derive(Parser)]
pub struct BurrowArgs {
    #[clap(flatten)]
    gridx: GridxArgs,

    #[command(subcommand)]
    command: BurrowCommand,
}

#[derive(Subcommand)]
enum BurrowCommand {
    /// Authenticate and show the token expiry.
    Token,

    /// Resolve the gateway of the account.
    Gateway,

    /// Fetch the live data once and show the readings.
    Live,
}

impl BurrowArgs {
    #[instrument(skip_all)]
    pub async fn run(self) -> Result {
        let api = self.gridx.new_api()?;

        match self.command {
            BurrowCommand::Token => {
                let token = api.authenticate().await?;
                info!(expires_at = ?token.expires_at, "gotcha");
            }
            BurrowCommand::Gateway => {
                let (_, gateway_id) = api.connect().await?;
                println!("{gateway_id}");
            }
            BurrowCommand::Live => {
                let payload = api.fetch().await?;
                let sensors = Sensor::discover(&payload);
                let state = RefreshState {
                    payload: Some(Arc::new(payload)),
                    last_success: true,
                    ..RefreshState::default()
                };
                println!("{}", build_readings_table(&sensors, &state));
            }
        }

        Ok(())
    }
}
