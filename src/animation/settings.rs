use std::time::Duration;

use crate::{mode::Mode, strip::Strip};

/// One animation cadence shared by every strip in a mode.
///
/// The strand-wide sweep runs between the extremes (max pixel count, min
/// start, max ceiling) and each strip clips it to its own configuration.
/// Step and wait are averaged so strips with different timing settle on one
/// frame rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedSettings {
    pub led_count: usize,
    pub led_step: usize,
    pub start_brightness: u8,
    pub max_brightness: u8,
    pub brightness_step: f64,
    pub wait: Duration,
}

impl LedSettings {
    pub fn aggregate<'a, I>(strips: I, mode: Mode) -> Self
    where
        I: IntoIterator<Item = &'a Strip>,
    {
        let strips: Vec<&Strip> = strips.into_iter().collect();
        let params: Vec<_> = strips.iter().map(|strip| strip.params(mode)).collect();

        let brightness_step = mean(params.iter().map(|p| p.brightness_step as f64));
        let wait_ms = mean(params.iter().map(|p| p.wait_ms as f64));

        Self {
            led_count: strips.iter().map(|s| s.count).max().unwrap_or(0),
            led_step: params.iter().map(|p| p.led_step).max().unwrap_or(0),
            start_brightness: strips.iter().map(|s| s.floor(mode)).min().unwrap_or(0),
            max_brightness: params.iter().map(|p| p.brightness).max().unwrap_or(0),
            brightness_step,
            wait: Duration::from_micros((wait_ms * 1000.0).round() as u64),
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}
