//! `buffon-server` binary: configuration, logging, and the listening socket

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use buffon_server::{cli, routes, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli::command().get_matches();
    init_tracing(matches.get_flag("json-logs"));

    let config = cli::resolve_config(&matches)?;
    let state = AppState::from_config(&config).with_context(|| {
        format!(
            "preparing scratch directory {}",
            config.scratch_dir.display()
        )
    })?;
    tracing::info!(
        "Serving {} with renderers from {}",
        config.public_dir.display(),
        state.pipeline.renderer_dir().display()
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let (bound, server) = warp::serve(routes(Arc::new(state)))
        .try_bind_with_graceful_shutdown(addr, async {
            // a failed signal handler just means no graceful shutdown
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .with_context(|| format!("binding {addr}"))?;

    tracing::info!("Listening on http://{}", bound);
    server.await;
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
