//! `indi-serverd`: a standalone INDI server, wiring subprocess drivers and
//! upstream remotes together the way `indiserver` does on the command line.

use clap::Parser;
use indi_hub::blob_policy::BlobMode;
use indi_hub::error::Result;
use indi_hub::server::{Server, ServerConfig};
use std::process::ExitCode;

/// Command-line surface matching `indiserver`'s `-v`/driver-argument shape.
#[derive(Debug, Parser)]
#[command(name = "indi-serverd", version, about = "INDI protocol server")]
struct Cli {
    /// Address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 7624)]
    port: u16,

    /// Maximum concurrently accepted client connections (clamped to 10)
    #[arg(long, default_value_t = 5)]
    max_connections: usize,

    /// Proxy through an upstream INDI server, given as `host:port`. May be
    /// repeated.
    #[arg(long = "remote", value_name = "HOST:PORT")]
    remotes: Vec<String>,

    /// Spawn a driver executable on startup, given as a path. May be
    /// repeated; extra arguments aren't supported on this command line.
    #[arg(long = "driver-exe", value_name = "PATH")]
    driver_exes: Vec<String>,

    /// Enable debug-level logging
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "indi-serverd exited with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = ServerConfig::new(format!("{}:{}", cli.host, cli.port), cli.max_connections);
    let server = Server::new(config);

    for remote in &cli.remotes {
        let (host, port) = remote
            .rsplit_once(':')
            .ok_or_else(|| indi_hub::error::Error::Protocol(format!("invalid --remote {remote}, expected HOST:PORT")))?;
        let port: u16 = port
            .parse()
            .map_err(|_| indi_hub::error::Error::Protocol(format!("invalid --remote port in {remote}")))?;
        server.add_remote(host.to_string(), port, BlobMode::Also).await;
    }

    for exe in &cli.driver_exes {
        server.add_subprocess_driver(exe, &[]).await?;
    }

    server.run().await
}
