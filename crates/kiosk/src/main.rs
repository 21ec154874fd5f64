//! exhibit: run a kiosk browser until told to stop

use browser::ChromeDriver;
use clap::Parser;
use kiosk::{KioskConfig, KioskError, Supervisor};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "exhibit", version, about = "Unattended kiosk browser")]
struct Cli {
    /// Location of the TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match KioskConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = kiosk::logging::init(&config.loglevel, config.logfile()) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    match run(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "kiosk stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &KioskConfig) -> Result<(), KioskError> {
    let session = config.session()?;
    let driver = Arc::new(ChromeDriver::new(config.launch_options()));
    let supervisor = Supervisor::new(session, driver);

    if let Err(e) = supervisor.start().await {
        supervisor.shutdown().await;
        return Err(e);
    }

    tracing::info!(home = %supervisor.session().home, "kiosk running");
    println!("press ctrl+c to stop");
    shutdown_signal().await;
    tracing::info!("signal received");

    supervisor.shutdown().await;
    Ok(())
}

/// Wait for SIGTERM or SIGINT (Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot install SIGTERM handler");
                ctrl_c.await.ok();
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
}
