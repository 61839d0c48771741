use std::{future::Future, time::Duration};

use anyhow::Error;
use log::{error, info, warn};
use tokio::{
    sync::{mpsc, watch},
    time::{interval, MissedTickBehavior},
};

#[cfg(not(feature = "pi"))]
use crate::strip::MemoryStrip;
#[cfg(feature = "pi")]
use crate::strip::SpiStrip;
use crate::{
    animation::{AnimationEngine, StripSlot},
    arbiter::{ModeArbiter, Outbound, StateCell},
    button::Button,
    config::{Config, ServerConfig},
    status::{PeerEvent, StatusChannel},
    strip::{Strip, StripDriver},
};

const CHANNEL_DEPTH: usize = 16;

/// The driver for a configured strip on this platform
pub fn strip_driver(strip: &Strip) -> Result<Box<dyn StripDriver>, Error> {
    #[cfg(feature = "pi")]
    let driver: Box<dyn StripDriver> = Box::new(SpiStrip::new(strip)?);

    #[cfg(not(feature = "pi"))]
    let driver: Box<dyn StripDriver> = Box::new(MemoryStrip::new(strip.name.clone(), strip.count));

    Ok(driver)
}

/// Build the engine for every configured strip
pub fn build_engine(config: &Config) -> Result<AnimationEngine, Error> {
    let slots = config
        .strips
        .iter()
        .map(|strip| Ok(StripSlot::new(strip.clone(), strip_driver(strip)?)))
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(AnimationEngine::new(slots)?)
}

/// Runs the arbitration, render and status channel tasks until shutdown.
pub struct Controller {
    engine: AnimationEngine,
    button: Box<dyn Button>,
    server: Option<ServerConfig>,
    poll_interval: Duration,
}

impl Controller {
    pub fn new(config: &Config, engine: AnimationEngine, button: Box<dyn Button>) -> Self {
        Self {
            engine,
            button,
            server: config.server.clone(),
            poll_interval: config.poll_interval(),
        }
    }

    /// Run until `shutdown` resolves. Every strip is cleared before this
    /// returns, whether the render task stopped for shutdown or on an error.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> Result<(), Error> {
        self.engine.init()?;

        let cell = StateCell::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (events_tx, events_rx) = mpsc::channel(CHANNEL_DEPTH);
        let (outbound_tx, outbound_rx) = mpsc::channel(CHANNEL_DEPTH);

        let status = match self.server {
            Some(server) => Some(tokio::spawn(
                StatusChannel::new(server, events_tx, outbound_rx).run(),
            )),
            None => {
                info!("No peer configured, running on the button alone");
                None
            }
        };

        let arbitration = tokio::spawn(arbitrate(
            self.button,
            self.poll_interval,
            cell.clone(),
            events_rx,
            outbound_tx,
            shutdown_rx.clone(),
        ));
        let mut render = tokio::spawn(render_frames(self.engine, cell, shutdown_rx));

        let finished = tokio::select! {
            _ = shutdown => None,
            result = &mut render => Some(result),
        };

        info!("Shutting down");
        let _ = shutdown_tx.send(true);
        if let Some(status) = status {
            status.abort();
        }

        let result = match finished {
            Some(result) => result,
            None => render.await,
        };
        arbitration.await?;

        result?
    }
}

async fn arbitrate(
    mut button: Box<dyn Button>,
    poll_interval: Duration,
    cell: StateCell,
    mut events: mpsc::Receiver<PeerEvent>,
    outbound: mpsc::Sender<Outbound>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut arbiter = ModeArbiter::new();
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }

        // Connection changes are applied in order; at most one message per tick
        let mut message = None;
        while let Ok(event) = events.try_recv() {
            match event {
                PeerEvent::Connected => arbiter.set_peer_connected(true),
                PeerEvent::Disconnected => arbiter.set_peer_connected(false),
                PeerEvent::Message(code) => {
                    message = Some(code);
                    break;
                }
            }
        }

        let state = arbiter.tick(button.read(), message);
        cell.publish(state).await;

        for item in arbiter.drain_outbound() {
            if let Err(e) = outbound.try_send(item) {
                warn!("Arbiter: could not notify the peer: {}", e);
            }
        }
    }
}

async fn render_frames(
    mut engine: AnimationEngine,
    cell: StateCell,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Error> {
    let result = loop {
        if *shutdown.borrow() {
            break Ok(());
        }

        let state = cell.take().await;
        tokio::select! {
            result = engine.render_frame(&state) => {
                if let Err(e) = result {
                    error!("Render failed: {}", e);
                    break Err(e);
                }
            }
            _ = shutdown.changed() => break Ok(()),
        }
    };

    info!("Clearing all strips");
    let cleared = engine.clear();
    result.and(cleared)
}
