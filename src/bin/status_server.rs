//! Coordinating peer for strand-signal controllers.
//!
//! Every controller that hands a session over (sends active) gets it back
//! after a random playback time: the server answers with idle, which
//! releases the controller's strand.

use std::{net::SocketAddr, time::Duration};

use anyhow::{bail, Error};
use clap::Parser;
use log::{info, warn};
use rand::Rng;
use strand_signal::{mode::Mode, status::codec};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    time::sleep,
};

#[derive(Parser, Debug, Clone)]
#[command(about = "Hand every active session back to idle after a while")]
struct Args {
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    #[arg(short, long, default_value_t = 8888)]
    port: u16,
    /// Shortest playback time in seconds
    #[arg(long, default_value_t = 3)]
    min_secs: u64,
    /// Longest playback time in seconds
    #[arg(long, default_value_t = 10)]
    max_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.min_secs > args.max_secs {
        bail!("--min-secs must not be above --max-secs");
    }

    let listener = TcpListener::bind((args.host.as_str(), args.port)).await?;
    info!("Serving on {}", listener.local_addr()?);

    loop {
        let (stream, addr) = listener.accept().await?;
        info!("Controller connected from {}", addr);

        let args = args.clone();
        tokio::spawn(async move {
            match handle(stream, addr, &args).await {
                Ok(()) => info!("Controller {} disconnected", addr),
                Err(e) => warn!("Controller {}: {}", addr, e),
            }
        });
    }
}

async fn handle(mut stream: TcpStream, addr: SocketAddr, args: &Args) -> Result<(), Error> {
    let mut buffer = [0u8; 100];

    loop {
        let n = stream.read(&mut buffer).await?;
        if n == 0 {
            return Ok(());
        }

        let mode = match codec::decode(&buffer[..n]) {
            Ok(mode) => mode,
            Err(e) => {
                // Hang up after the diagnostic so two peers never answer
                // each other's diagnostics
                warn!("Controller {}: {}, closing", addr, e);
                stream.write_all(&codec::diagnostic(&e.to_string())).await?;
                return Ok(());
            }
        };

        info!("Received {} from {}", mode, addr);
        if mode == Mode::Idle {
            continue;
        }

        let playback = rand::thread_rng().gen_range(args.min_secs..=args.max_secs);
        info!("Playing for {} seconds...", playback);
        sleep(Duration::from_secs(playback)).await;

        info!("Send: {} to {}", Mode::Idle, addr);
        stream.write_all(&codec::encode(Mode::Idle)).await?;
    }
}
