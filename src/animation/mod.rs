//! Frame rendering for every configured strip.
//!
//! The engine owns the strips, their drivers and one cursor per strip. All
//! strips follow one strand-wide sweep built from the aggregated settings;
//! each strip's cursor is that sweep clipped to the strip's own bounds. Each
//! render tick the engine looks at the arbiter's snapshot, restarts the
//! animation from its base state when the mode was (re)entered, and draws
//! one frame with the renderer for the current mode.

use std::time::Duration;

use anyhow::Error;
use log::{debug, info};
use tokio::time::sleep;

use crate::{
    arbiter::ArbiterState,
    config::ConfigError,
    mode::Mode,
    strip::{Strip, StripDriver},
};

mod render;
mod settings;

pub use settings::LedSettings;

type RenderFn = fn(&mut RenderCursor, &mut [StripSlot], &LedSettings) -> Result<(), Error>;

/// Renderer per mode, indexed by `Mode::index`
const RENDERERS: [RenderFn; Mode::COUNT] = [render::idle, render::active];

/// Where one strip's animation currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderCursor {
    pub brightness: u8,
    pub pixel: usize,
    /// The idle pulse is fading out
    pub reverse: bool,
}

impl RenderCursor {
    pub fn base(strip: &Strip, mode: Mode) -> Self {
        let brightness = match mode {
            Mode::Idle => strip.floor(Mode::Idle),
            Mode::Active => strip.params(Mode::Active).brightness,
        };

        Self {
            brightness,
            pixel: 0,
            reverse: false,
        }
    }

    /// Where the shared sweep starts for a mode
    fn strand(settings: &LedSettings, mode: Mode) -> Self {
        let brightness = match mode {
            Mode::Idle => settings.start_brightness,
            Mode::Active => settings.max_brightness,
        };

        Self {
            brightness,
            pixel: 0,
            reverse: false,
        }
    }
}

pub struct StripSlot {
    pub strip: Strip,
    pub driver: Box<dyn StripDriver>,
    pub cursor: RenderCursor,
}

impl StripSlot {
    pub fn new(strip: Strip, driver: Box<dyn StripDriver>) -> Self {
        let cursor = RenderCursor::base(&strip, Mode::Idle);
        Self {
            strip,
            driver,
            cursor,
        }
    }

    /// Pixels that may be written: the count captured at startup, never
    /// more than the driver holds
    pub fn count(&self) -> usize {
        self.strip.count.min(self.driver.len())
    }
}

pub struct AnimationEngine {
    slots: Vec<StripSlot>,
    settings: [LedSettings; Mode::COUNT],
    sweep: RenderCursor,
    mode: Mode,
}

impl AnimationEngine {
    pub fn new(slots: Vec<StripSlot>) -> Result<Self, ConfigError> {
        if slots.is_empty() {
            return Err(ConfigError::NoStrips);
        }

        let settings =
            Mode::ALL.map(|mode| LedSettings::aggregate(slots.iter().map(|s| &s.strip), mode));
        for mode in Mode::ALL {
            debug!("Engine: {} settings {:?}", mode, settings[mode.index()]);
        }

        let sweep = RenderCursor::strand(&settings[Mode::Idle.index()], Mode::Idle);
        let mut engine = Self {
            slots,
            settings,
            sweep,
            mode: Mode::Idle,
        };
        engine.sync_cursors();

        Ok(engine)
    }

    /// Bring up every driver and start from a dark strand
    pub fn init(&mut self) -> Result<(), Error> {
        for slot in &mut self.slots {
            info!(
                "Strip {}: initializing {} pixels on pin {}",
                slot.strip.name, slot.strip.count, slot.strip.pin
            );
            slot.driver.init()?;
        }

        self.clear()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn settings(&self, mode: Mode) -> &LedSettings {
        &self.settings[mode.index()]
    }

    pub fn cursors(&self) -> impl Iterator<Item = &RenderCursor> + '_ {
        self.slots.iter().map(|slot| &slot.cursor)
    }

    /// Zero and flush every strip, then put every cursor back at the base
    /// of the current mode
    pub fn clear(&mut self) -> Result<(), Error> {
        for slot in &mut self.slots {
            slot.driver.clear()?;
        }
        self.sweep = RenderCursor::strand(&self.settings[self.mode.index()], self.mode);
        self.sync_cursors();

        Ok(())
    }

    fn sync_cursors(&mut self) {
        let (sweep, mode) = (self.sweep, self.mode);
        for slot in &mut self.slots {
            slot.cursor = RenderCursor {
                brightness: render::clip(sweep.brightness, &slot.strip, mode),
                ..sweep
            };
        }
    }

    /// Draw one frame and return how long to wait before the next
    pub fn draw_frame(&mut self, state: &ArbiterState) -> Result<Duration, Error> {
        if state.mode_changed || state.clear_requested || state.current_mode != self.mode {
            debug!("Engine: restarting {} from a clear strand", state.current_mode);
            self.mode = state.current_mode;
            self.clear()?;
        }

        let render = RENDERERS[self.mode.index()];
        let settings = self.settings[self.mode.index()];
        render(&mut self.sweep, &mut self.slots, &settings)?;
        self.sync_cursors();

        Ok(settings.wait)
    }

    /// Draw one frame, then sit out the frame interval
    pub async fn render_frame(&mut self, state: &ArbiterState) -> Result<(), Error> {
        let wait = self.draw_frame(state)?;
        sleep(wait).await;
        Ok(())
    }
}
