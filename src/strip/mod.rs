use anyhow::Error;
use serde::{Deserialize, Serialize};
use smart_leds::RGB8;

use crate::{config::ConfigError, mode::Mode};

mod memory;
pub mod spi;

pub use memory::MemoryStrip;
#[cfg(feature = "pi")]
pub use spi::SpiStrip;

/// Write access to one physical strip. Pixels are buffered by `set_pixel`
/// and only reach the LEDs on `show`.
pub trait StripDriver: Send {
    fn init(&mut self) -> Result<(), Error>;

    fn set_pixel(&mut self, index: usize, color: RGB8);

    /// Flush the pixel buffer to the hardware
    fn show(&mut self) -> Result<(), Error>;

    /// Zero every pixel and flush
    fn clear(&mut self) -> Result<(), Error>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Brightness and timing for one mode of one strip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeParams {
    /// Ceiling brightness for the mode
    pub brightness: u8,
    pub brightness_step: u8,
    pub wait_ms: u64,
    /// How many pixels the scan advances per frame
    pub led_step: usize,
}

/// Configuration of one addressable strip. Read once at startup and never
/// changed afterwards.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Strip {
    pub name: String,
    pub count: usize,
    pub pin: u8,
    #[serde(default = "defaults::color")]
    pub color: (u8, u8, u8),
    /// Signal frequency of the strip's data line in hertz
    #[serde(default = "defaults::frequency_hz")]
    pub frequency_hz: u32,

    #[serde(default = "defaults::black_brightness")]
    pub black_brightness: u8,
    #[serde(default = "defaults::idle_brightness")]
    pub idle_brightness: u8,
    #[serde(default = "defaults::active_brightness")]
    pub active_brightness: u8,

    #[serde(default = "defaults::idle_brightness_step")]
    pub idle_brightness_step: u8,
    #[serde(default = "defaults::active_brightness_step")]
    pub active_brightness_step: u8,

    #[serde(default = "defaults::wait_ms")]
    pub idle_wait_ms: u64,
    #[serde(default = "defaults::wait_ms")]
    pub active_wait_ms: u64,

    #[serde(default = "defaults::idle_led_step")]
    pub idle_led_step: usize,
    #[serde(default = "defaults::active_led_step")]
    pub active_led_step: usize,
}

mod defaults {
    pub fn color() -> (u8, u8, u8) {
        (255, 116, 0)
    }

    pub fn frequency_hz() -> u32 {
        800_000
    }

    pub fn black_brightness() -> u8 {
        0
    }

    pub fn idle_brightness() -> u8 {
        145
    }

    pub fn active_brightness() -> u8 {
        255
    }

    pub fn idle_brightness_step() -> u8 {
        1
    }

    pub fn active_brightness_step() -> u8 {
        5
    }

    pub fn wait_ms() -> u64 {
        10
    }

    pub fn idle_led_step() -> usize {
        1
    }

    pub fn active_led_step() -> usize {
        6
    }
}

impl Strip {
    /// A strip with stock values for everything but the required fields
    pub fn new(name: impl Into<String>, count: usize, pin: u8) -> Self {
        Self {
            name: name.into(),
            count,
            pin,
            color: defaults::color(),
            frequency_hz: defaults::frequency_hz(),
            black_brightness: defaults::black_brightness(),
            idle_brightness: defaults::idle_brightness(),
            active_brightness: defaults::active_brightness(),
            idle_brightness_step: defaults::idle_brightness_step(),
            active_brightness_step: defaults::active_brightness_step(),
            idle_wait_ms: defaults::wait_ms(),
            active_wait_ms: defaults::wait_ms(),
            idle_led_step: defaults::idle_led_step(),
            active_led_step: defaults::active_led_step(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidStrip {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.count < 1 {
            return Err(invalid("led count must be at least 1"));
        }
        if self.pin < 1 {
            return Err(invalid("led pin must be at least 1"));
        }
        if self.idle_brightness_step < 1 || self.active_brightness_step < 1 {
            return Err(invalid("brightness steps must be at least 1"));
        }
        if self.idle_led_step < 1 || self.active_led_step < 1 {
            return Err(invalid("led steps must be at least 1"));
        }
        if self.black_brightness > self.idle_brightness {
            return Err(invalid("black brightness is above the idle brightness"));
        }

        Ok(())
    }

    pub fn params(&self, mode: Mode) -> ModeParams {
        match mode {
            Mode::Idle => ModeParams {
                brightness: self.idle_brightness,
                brightness_step: self.idle_brightness_step,
                wait_ms: self.idle_wait_ms,
                led_step: self.idle_led_step,
            },
            Mode::Active => ModeParams {
                brightness: self.active_brightness,
                brightness_step: self.active_brightness_step,
                wait_ms: self.active_wait_ms,
                led_step: self.active_led_step,
            },
        }
    }

    /// The brightness a mode starts from. Active starts where idle peaks.
    pub fn floor(&self, mode: Mode) -> u8 {
        match mode {
            Mode::Idle => self.black_brightness,
            Mode::Active => self.idle_brightness,
        }
    }

    pub fn color(&self) -> RGB8 {
        let (r, g, b) = self.color;
        RGB8::new(r, g, b)
    }
}

/// Scale a color by `brightness / 256`, rounding every channel toward zero
pub fn scale(color: RGB8, brightness: u8) -> RGB8 {
    let channel = |value: u8| ((brightness as u16 * value as u16) / 256) as u8;
    RGB8::new(channel(color.r), channel(color.g), channel(color.b))
}
