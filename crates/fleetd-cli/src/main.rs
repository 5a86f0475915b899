//! Command-line interface for the fleetd device registry.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use fleetd_core::Config;

/// fleetd - device registry and command queue backend.
#[derive(Parser, Debug)]
#[command(name = "fleetd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// Path to a TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Start the registry server.
    Serve {
        /// Host to bind to (overrides config).
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to (overrides config).
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose);

    let mut config = Config::load(args.config.as_deref())?;

    match args.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            fleetd_api::run(config).await
        }
    }
}

/// Initialize logging. `FLEETD_LOG_JSON=true` switches to JSON output for
/// container environments.
fn init_logging(verbose: bool) {
    let json_logging = std::env::var("FLEETD_LOG_JSON")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);

    let default_directive = if verbose { "fleetd=debug" } else { "fleetd=info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(default_directive)
            .add_directive(tracing::Level::INFO.into())
    });

    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .compact()
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_parses_overrides() {
        let args =
            Args::try_parse_from(["fleetd", "serve", "--host", "0.0.0.0", "--port", "8080"])
                .unwrap();
        let Command::Serve { host, port } = args.command;
        assert_eq!(host.as_deref(), Some("0.0.0.0"));
        assert_eq!(port, Some(8080));
        assert!(!args.verbose);
    }

    #[test]
    fn global_flags_apply_anywhere() {
        let args =
            Args::try_parse_from(["fleetd", "serve", "--config", "/etc/fleetd.toml", "-v"])
                .unwrap();
        assert_eq!(args.config.as_deref(), Some(std::path::Path::new("/etc/fleetd.toml")));
        assert!(args.verbose);
    }
}
