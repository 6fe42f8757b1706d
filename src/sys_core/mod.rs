//! Server state, bootstrap and request routing.

pub mod response;
pub mod router;

use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use hyper::service::{make_service_fn, service_fn};
use hyper::Server;
use tracing::{info, warn};

use crate::config::Config;
use crate::sys_auth::core::SessionGate;
use crate::sys_fileapi::core::ContractRepository;

/// Everything a request handler can reach.
pub struct AppState {
    pub config: Config,
    pub repo: ContractRepository,
    pub gate: SessionGate,
}

impl AppState {
    /// Build state from `config`, creating the upload directory if needed.
    pub async fn init(config: Config) -> io::Result<Self> {
        let repo = ContractRepository::new(config.upload_dir.clone());
        repo.init().await?;
        let gate = SessionGate::new(
            config.admin_id.clone(),
            config.admin_pw.clone(),
            &config.session_secret,
        );
        Ok(Self { config, repo, gate })
    }
}

/// Serve until Ctrl-C.
pub async fn run_server(state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let upload_dir = state.repo.dir().display().to_string();

    let make_svc = make_service_fn(move |_conn| {
        let state = state.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| router::handle(req, state.clone())))
        }
    });

    let server = Server::try_bind(&addr)
        .with_context(|| format!("could not bind {addr}"))?
        .serve(make_svc);

    info!(%addr, "server listening");
    info!("main page: http://localhost:{}", addr.port());
    info!("admin page: http://localhost:{}/admin", addr.port());
    info!(%upload_dir, "contracts are stored on disk");

    server
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
