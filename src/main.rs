use std::sync::Arc;

use anyhow::Context;
use contract_vault::config::Config;
use contract_vault::sys_core::{run_server, AppState};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env().context("invalid configuration")?;
    if config.uses_default_secret() {
        warn!("SESSION_SECRET is not set; session cookies are signed with a built-in key");
    }
    if !config.admin_configured() {
        warn!("ADMIN_ID or ADMIN_PW is not set; admin login is disabled");
    }

    let state = AppState::init(config)
        .await
        .context("could not create the upload directory")?;
    run_server(Arc::new(state)).await
}
