use std::time::Duration;

use anyhow::Error;
use log::{debug, info, warn};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::mpsc,
    time::sleep,
};

use crate::{arbiter::Outbound, config::ServerConfig};

pub mod codec;

/// Largest single read; a message is a few digits
const READ_BUFFER: usize = 100;

/// What the status channel reports to the arbitration task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    Connected,
    /// A recognized mode code
    Message(i64),
    Disconnected,
}

enum Step {
    Read(usize),
    Send(Option<Outbound>),
}

/// TCP client side of the status channel. Reads mode codes from the peer
/// and writes the arbiter's notifications back on the same connection.
pub struct StatusChannel {
    config: ServerConfig,
    events: mpsc::Sender<PeerEvent>,
    outbound: mpsc::Receiver<Outbound>,
}

impl StatusChannel {
    pub fn new(
        config: ServerConfig,
        events: mpsc::Sender<PeerEvent>,
        outbound: mpsc::Receiver<Outbound>,
    ) -> Self {
        Self {
            config,
            events,
            outbound,
        }
    }

    /// Connect and pump messages until the peer is gone for good. A refused
    /// or dropped connection leaves the controller on the button alone.
    pub async fn run(mut self) {
        let address = format!("{}:{}", self.config.host, self.config.port);

        loop {
            match TcpStream::connect(&address).await {
                Ok(stream) => {
                    info!("Status: connected to {}", address);
                    if self.events.send(PeerEvent::Connected).await.is_err() {
                        return;
                    }

                    match self.serve(stream).await {
                        Ok(()) => info!("Status: connection to {} closed", address),
                        Err(e) => warn!("Status: connection to {} lost: {}", address, e),
                    }

                    if self.events.send(PeerEvent::Disconnected).await.is_err() {
                        return;
                    }
                }
                Err(e) => warn!(
                    "Status: could not connect to {}: {}. Running on the button alone",
                    address, e
                ),
            }

            match self.config.reconnect_ms {
                Some(ms) => {
                    debug!("Status: reconnecting in {} ms", ms);
                    sleep(Duration::from_millis(ms)).await;
                }
                None => return,
            }
        }
    }

    async fn serve(&mut self, stream: TcpStream) -> Result<(), Error> {
        let (mut reader, mut writer) = stream.into_split();
        let mut buffer = [0u8; READ_BUFFER];

        loop {
            let step = tokio::select! {
                read = reader.read(&mut buffer) => Step::Read(read?),
                outbound = self.outbound.recv() => Step::Send(outbound),
            };

            match step {
                Step::Read(0) => return Ok(()),
                Step::Read(n) => match codec::decode(&buffer[..n]) {
                    Ok(mode) => {
                        debug!("Status: peer sent {}", mode);
                        self.events.send(PeerEvent::Message(mode.code())).await?;
                    }
                    Err(e) => {
                        warn!("Status: {}", e);
                        writer.write_all(&codec::diagnostic(&e.to_string())).await?;
                    }
                },
                Step::Send(Some(Outbound::Mode(mode))) => {
                    debug!("Status: sending {}", mode);
                    writer.write_all(&codec::encode(mode)).await?;
                }
                Step::Send(Some(Outbound::Diagnostic(text))) => {
                    writer.write_all(&codec::diagnostic(&text)).await?;
                }
                // The arbitration task is gone
                Step::Send(None) => return Ok(()),
            }
        }
    }
}
