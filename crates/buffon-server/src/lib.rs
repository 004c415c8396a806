//! Buffon Server - HTTP surface
//!
//! Routes:
//! - `GET /build?simulation=<kind>&...` (also `/build.png`, `type=<kind>`):
//!   render and stream a PNG, or a plain-text diagnostic
//! - `GET /api?problem=<p>&length=&gap=&trials=`: HTML results page
//! - anything else: static files from the public directory
//!
//! Failures are reported with status 200 and a text body.

#![allow(missing_docs)]

pub mod cli;
pub mod results;

use std::collections::HashMap;
use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;

use buffon_core::{BuildPipeline, Delivery, ServiceConfig};
use warp::http::header::{HeaderValue, CONTENT_TYPE};
use warp::hyper::Body;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

pub use results::ResultsPage;

/// Shared per-process state
#[derive(Debug, Clone)]
pub struct AppState {
    pub pipeline: BuildPipeline,
    pub results: ResultsPage,
    pub public_dir: PathBuf,
}

impl AppState {
    /// Prepare directories and templates for `config`
    ///
    /// # Errors
    /// Filesystem errors while recreating the scratch directory or reading
    /// the results template.
    pub fn from_config(config: &ServiceConfig) -> std::io::Result<Self> {
        Ok(Self {
            pipeline: BuildPipeline::from_config(config)?,
            results: ResultsPage::load(&config.public_dir)?,
            public_dir: config.public_dir.clone(),
        })
    }
}

/// All routes of the service
pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let public_dir = state.public_dir.clone();
    let with_state = warp::any().map(move || Arc::clone(&state));

    let build = warp::get()
        .and(warp::path("build").or(warp::path("build.png")).unify())
        .and(warp::path::end())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_state.clone())
        .and_then(build_handler);

    let api = warp::get()
        .and(warp::path("api"))
        .and(warp::path::end())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_state)
        .and_then(api_handler);

    let static_files = warp::get().and(warp::fs::dir(public_dir));

    build
        .or(api)
        .or(static_files)
        .with(warp::trace::request())
}

async fn build_handler(
    query: HashMap<String, String>,
    state: Arc<AppState>,
) -> Result<Response, Infallible> {
    let delivery = state.pipeline.build(&query).await;
    let content_type = HeaderValue::from_static(delivery.content_type());

    let mut response = match delivery {
        // the stream deletes the artifact once hyper has finished with the body
        Delivery::Image(stream) => Response::new(Body::wrap_stream(stream)),
        Delivery::Diagnostic(text) => Response::new(Body::from(text)),
    };
    response.headers_mut().insert(CONTENT_TYPE, content_type);
    Ok(response)
}

async fn api_handler(
    query: HashMap<String, String>,
    state: Arc<AppState>,
) -> Result<Response, Infallible> {
    let report = match state.pipeline.estimate(&query).await {
        Ok(stdout) => stdout,
        Err(err) => {
            tracing::warn!("Estimate failed: {}", err);
            err.diagnostic()
        }
    };
    Ok(warp::reply::html(state.results.render(&report)).into_response())
}
