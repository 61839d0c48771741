use std::path::PathBuf;

use anyhow::Error;
use clap::Parser;
use log::{error, info};
use strand_signal::prelude::*;

#[derive(Parser, Debug)]
#[command(about = "Drive LED strips from a button and a status peer")]
struct Args {
    /// Strip, button and peer configuration
    #[arg(short, long, default_value = Config::DEFAULT_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    info!("Loading config from {}", args.config.display());
    let config = Config::load(&args.config)?;

    info!("Starting {} strips...", config.strips.len());
    let engine = build_engine(&config)?;

    info!("Starting button...");
    let button = button(&config)?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Could not listen for shutdown: {}", e);
        }
    };

    Controller::new(&config, engine, button).run(shutdown).await?;

    info!("All strips are cleared");
    Ok(())
}

#[cfg(feature = "pi")]
fn button(config: &Config) -> Result<Box<dyn Button>, Error> {
    Ok(Box::new(GpioButton::init(&config.button)?))
}

/// Without GPIO the button is toggled by pressing enter
#[cfg(not(feature = "pi"))]
fn button(_config: &Config) -> Result<Box<dyn Button>, Error> {
    use tokio::io::{AsyncBufReadExt, BufReader};

    let button = SimulatedButton::new();
    let handle = button.clone();

    tokio::spawn(async move {
        info!("No GPIO available, press enter to toggle the button");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(_)) = lines.next_line().await {
            let pressed = handle.toggle();
            info!("Button {}", if pressed { "pressed" } else { "released" });
        }
    });

    Ok(Box::new(button))
}
