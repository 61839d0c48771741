use anyhow::Error;

use super::{LedSettings, RenderCursor, StripSlot};
use crate::{
    mode::Mode,
    strip::{scale, Strip},
};

/// The strand-wide brightness as drawn on one strip: never outside the
/// strip's own floor and ceiling for the mode
pub fn clip(brightness: u8, strip: &Strip, mode: Mode) -> u8 {
    let floor = strip.floor(mode);
    let ceiling = strip.params(mode).brightness.max(floor);
    brightness.clamp(floor, ceiling)
}

/// Breathing pulse: the strand climbs from the lowest start brightness to
/// the highest ceiling and back down, one averaged step per frame. Every
/// strip draws that brightness clipped to its own bounds.
pub fn idle(
    sweep: &mut RenderCursor,
    slots: &mut [StripSlot],
    settings: &LedSettings,
) -> Result<(), Error> {
    for slot in slots.iter_mut() {
        let brightness = clip(sweep.brightness, &slot.strip, Mode::Idle);
        let color = scale(slot.strip.color(), brightness);
        for pixel in 0..settings.led_count.min(slot.count()) {
            slot.driver.set_pixel(pixel, color);
        }
        slot.driver.show()?;
    }

    let floor = settings.start_brightness;
    let ceiling = settings.max_brightness.max(floor);
    let step = settings.brightness_step.round() as u8;
    if sweep.reverse {
        sweep.brightness = sweep.brightness.saturating_sub(step).max(floor);
        if sweep.brightness <= floor {
            sweep.reverse = false;
        }
    } else {
        sweep.brightness = sweep.brightness.saturating_add(step).min(ceiling);
        if sweep.brightness >= ceiling {
            sweep.reverse = true;
        }
    }

    Ok(())
}

/// Scanning chase: a window of `led_step` pixels at full active brightness
/// walks down the strand. Lit pixels stay lit until the scan passes the
/// longest strip, then the whole strand is cleared and the scan restarts.
pub fn active(
    sweep: &mut RenderCursor,
    slots: &mut [StripSlot],
    settings: &LedSettings,
) -> Result<(), Error> {
    sweep.brightness = settings.max_brightness;
    if sweep.pixel >= settings.led_count {
        for slot in slots.iter_mut() {
            slot.driver.clear()?;
        }
        sweep.pixel = 0;
    }

    let start = sweep.pixel;
    let end = start
        .saturating_add(settings.led_step)
        .min(settings.led_count);
    for slot in slots.iter_mut() {
        let brightness = clip(sweep.brightness, &slot.strip, Mode::Active);
        let color = scale(slot.strip.color(), brightness);
        for pixel in start..end.min(slot.count()) {
            slot.driver.set_pixel(pixel, color);
        }
        slot.driver.show()?;
    }

    sweep.pixel = start.saturating_add(settings.led_step);

    Ok(())
}
