use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

#[cfg(feature = "pi")]
use anyhow::Error;
#[cfg(feature = "pi")]
use log::info;
#[cfg(feature = "pi")]
use rppal::gpio::{Gpio, InputPin};

#[cfg(feature = "pi")]
use crate::config::ButtonConfig;

/// A pushbutton sampled once per arbitration tick. Debouncing, if the
/// hardware needs it, belongs to the implementation.
pub trait Button: Send {
    /// `true` while the button is held down
    fn read(&mut self) -> bool;
}

/// A button whose level is set from software. Clones share the level.
#[derive(Debug, Clone, Default)]
pub struct SimulatedButton {
    pressed: Arc<AtomicBool>,
}

impl SimulatedButton {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&self) {
        self.pressed.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.pressed.store(false, Ordering::SeqCst);
    }

    pub fn toggle(&self) -> bool {
        !self.pressed.fetch_xor(true, Ordering::SeqCst)
    }
}

impl Button for SimulatedButton {
    fn read(&mut self) -> bool {
        self.pressed.load(Ordering::SeqCst)
    }
}

#[cfg(feature = "pi")]
pub struct GpioButton {
    pin: InputPin,
    active_low: bool,
}

#[cfg(feature = "pi")]
impl GpioButton {
    pub fn init(config: &ButtonConfig) -> Result<Self, Error> {
        let pin = config.pin.gpio();
        info!("Button: initializing on pin {}", pin.0);

        let pin = Gpio::new()?.get(pin.0)?;
        let pin = if config.active_low {
            pin.into_input_pullup()
        } else {
            pin.into_input_pulldown()
        };

        Ok(Self {
            pin,
            active_low: config.active_low,
        })
    }
}

#[cfg(feature = "pi")]
impl Button for GpioButton {
    fn read(&mut self) -> bool {
        self.pin.is_low() == self.active_low
    }
}
