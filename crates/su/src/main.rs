//! RootLink su
//!
//! Superuser request client for the privilege-elevation daemon.

use protocol::request::AttyMask;
use su::cli;
use su::{defaults, session};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let cli = match cli::try_parse(std::env::args().skip(1)) {
        Ok(cli) => cli,
        // Usage errors exit 2; --help exits 0. Either way the daemon is
        // never contacted.
        Err(err) => err.exit(),
    };

    if cli.version {
        println!("{}:SU", defaults::VERSION);
        return Ok(());
    }
    if cli.version_code {
        println!("{}", defaults::VERSION_CODE);
        return Ok(());
    }

    let request = match cli::request_from_cli(&cli) {
        Ok(request) => request,
        Err(err) => {
            eprintln!("su: {}", err);
            eprintln!("Usage: {}", cli::USAGE);
            std::process::exit(defaults::EXIT_USAGE);
        }
    };

    // Computed once, before any descriptor is transmitted.
    let mask = AttyMask::detect();

    match session::run_session(&request, mask).await {
        Ok(status) => std::process::exit(status),
        Err(err) => {
            eprintln!("su: {}", err);
            std::process::exit(err.exit_code());
        }
    }
}

/// Route diagnostics to stderr so relayed output stays clean; silent
/// unless `SU_LOG` asks otherwise.
fn init_tracing() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_env("SU_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("error"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;
    Ok(())
}
