use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use pumpfs::{
    cli, config::Config, logging, push::PushHook, source::LineSource, store::Store,
    supervisor::Supervisor,
};
use tracing::{debug, info, Level};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    if let Some(command) = cli.command {
        match command {
            cli::Commands::ConfigExample => {
                let c = Config::example();
                println!("{}", c.serialize_pretty());
            }
        }

        return Ok(());
    }

    let file_logging = cli.log_dir.map(|dir| (Level::DEBUG, dir));
    logging::init(Level::INFO, file_logging).await;

    let mut config = if let Some(config_path) = cli.config {
        debug!(?config_path, "Config from path");
        Config::new_from_path(config_path)
    } else {
        debug!("Default config");
        Config::default()
    };

    if let Some(device) = cli.device {
        config.device = device;
    }
    if let Some(keep) = cli.keep {
        config.keep = keep;
    }

    config.validate()?;

    let store = Arc::new(Store::new(config.keep));
    store.append_log("Main program starting");
    store.append_log(&format!("Serial device = {}", config.device));
    store.append_log(&format!("Keeping {} readings", config.keep));
    if let Some(script) = &config.push_script {
        store.append_log(&format!("Receiver script = {}", script.display()));
    }

    let mut supervisor = Supervisor::new(
        store.clone(),
        LineSource::Serial(config.serial_settings()),
    );
    if let Some(path) = &config.projections {
        supervisor = supervisor.with_projections(path.clone());
    }
    if let Some(script) = &config.push_script {
        supervisor = supervisor.with_push(PushHook::new(script.clone()));
    }

    let handle = supervisor.spawn();

    wait_for_shutdown_signal().await?;

    handle.shutdown().await;
    info!("Bye");

    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<()> {
    let mut terminate = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C, quitting")
        }
        _ = terminate.recv() => {
            info!("Told to terminate, quitting")
        }
    }

    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C, quitting");

    Ok(())
}
