//! Command line and configuration layering

use std::path::PathBuf;

use buffon_core::config::PORT_ENV;
use buffon_core::{BuildError, ServiceConfig};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

/// Command-line definition of the `buffon-server` binary
#[must_use]
pub fn command() -> Command {
    Command::new("buffon-server")
        .version(buffon_core::VERSION)
        .about("Buffon's needle and coin simulations over HTTP")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .short('p')
                .env(PORT_ENV)
                .value_parser(value_parser!(u16))
                .help("Listening port"),
        )
        .arg(
            Arg::new("public-dir")
                .long("public-dir")
                .value_parser(value_parser!(PathBuf))
                .help("Directory of static front-end files"),
        )
        .arg(
            Arg::new("scratch-dir")
                .long("scratch-dir")
                .value_parser(value_parser!(PathBuf))
                .help("Scratch directory for rendered images (wiped at startup)"),
        )
        .arg(
            Arg::new("renderer-dir")
                .long("renderer-dir")
                .value_parser(value_parser!(PathBuf))
                .help("Directory containing the renderer scripts"),
        )
        .arg(
            Arg::new("interpreter")
                .long("interpreter")
                .help("Program that runs renderer scripts; empty to run them directly"),
        )
        .arg(
            Arg::new("timeout-secs")
                .long("timeout-secs")
                .value_parser(value_parser!(u64))
                .help("Kill renderers that run longer than this"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
}

/// Defaults, then `--config`, then `PORT`, then flags
///
/// # Errors
/// `Config` when the configuration file cannot be read or parsed.
pub fn resolve_config(matches: &ArgMatches) -> Result<ServiceConfig, BuildError> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => ServiceConfig::load(path)?,
        None => ServiceConfig::new(),
    };

    // clap already prefers the flag over the environment
    if let Some(port) = matches.get_one::<u16>("port") {
        config.port = *port;
    }
    if let Some(dir) = matches.get_one::<PathBuf>("public-dir") {
        config.public_dir.clone_from(dir);
    }
    if let Some(dir) = matches.get_one::<PathBuf>("scratch-dir") {
        config.scratch_dir.clone_from(dir);
    }
    if let Some(dir) = matches.get_one::<PathBuf>("renderer-dir") {
        config.renderer_dir.clone_from(dir);
    }
    if let Some(interpreter) = matches.get_one::<String>("interpreter") {
        config.interpreter.clone_from(interpreter);
    }
    if let Some(secs) = matches.get_one::<u64>("timeout-secs") {
        config.render_timeout_secs = Some(*secs);
    }

    Ok(config)
}
