use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Error;
use log::{debug, error};
use smart_leds::RGB8;

use super::StripDriver;

#[derive(Debug, Default)]
struct Pixels {
    /// Pending buffer, written by `set_pixel`
    buffer: Vec<RGB8>,
    /// What the strip currently shows
    shown: Vec<RGB8>,
    flushes: usize,
    clears: usize,
    /// Every index passed to `set_pixel`, in order
    writes: Vec<usize>,
    out_of_range: usize,
}

/// A strip that lives in memory. Used on hosts without LED hardware and as
/// the fake driver in tests; clones share the same pixels so a test can keep
/// a handle while the engine owns the driver.
#[derive(Debug, Clone)]
pub struct MemoryStrip {
    name: String,
    count: usize,
    pixels: Arc<Mutex<Pixels>>,
}

impl MemoryStrip {
    pub fn new(name: impl Into<String>, count: usize) -> Self {
        Self {
            name: name.into(),
            count,
            pixels: Arc::new(Mutex::new(Pixels {
                buffer: vec![RGB8::default(); count],
                shown: vec![RGB8::default(); count],
                ..Default::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Pixels> {
        self.pixels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The pixels as of the last flush
    pub fn shown(&self) -> Vec<RGB8> {
        self.lock().shown.clone()
    }

    pub fn flushes(&self) -> usize {
        self.lock().flushes
    }

    pub fn clears(&self) -> usize {
        self.lock().clears
    }

    pub fn writes(&self) -> Vec<usize> {
        self.lock().writes.clone()
    }

    pub fn out_of_range(&self) -> usize {
        self.lock().out_of_range
    }

    pub fn reset_log(&self) {
        let mut pixels = self.lock();
        pixels.writes.clear();
        pixels.flushes = 0;
        pixels.clears = 0;
    }
}

impl StripDriver for MemoryStrip {
    fn init(&mut self) -> Result<(), Error> {
        debug!("Strip {}: in-memory strip with {} pixels", self.name, self.count);
        Ok(())
    }

    fn set_pixel(&mut self, index: usize, color: RGB8) {
        let mut pixels = self.lock();
        pixels.writes.push(index);

        if index >= self.count {
            error!(
                "Strip {}: pixel {} is out of range ({} pixels)",
                self.name, index, self.count
            );
            pixels.out_of_range += 1;
            return;
        }

        pixels.buffer[index] = color;
    }

    fn show(&mut self) -> Result<(), Error> {
        let mut pixels = self.lock();
        pixels.shown = pixels.buffer.clone();
        pixels.flushes += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), Error> {
        let mut pixels = self.lock();
        pixels.buffer.fill(RGB8::default());
        pixels.shown = pixels.buffer.clone();
        pixels.flushes += 1;
        pixels.clears += 1;
        Ok(())
    }

    fn len(&self) -> usize {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_flushes_buffer() -> Result<(), Error> {
        let handle = MemoryStrip::new("test", 3);
        let mut strip = handle.clone();

        strip.set_pixel(1, RGB8::new(1, 2, 3));
        assert_eq!(vec![RGB8::default(); 3], handle.shown());

        strip.show()?;
        assert_eq!(
            vec![RGB8::default(), RGB8::new(1, 2, 3), RGB8::default()],
            handle.shown()
        );
        assert_eq!(1, handle.flushes());

        Ok(())
    }

    #[test]
    fn test_clear_twice_is_dark() -> Result<(), Error> {
        let handle = MemoryStrip::new("test", 4);
        let mut strip = handle.clone();

        for i in 0..4 {
            strip.set_pixel(i, RGB8::new(9, 9, 9));
        }
        strip.show()?;

        strip.clear()?;
        strip.clear()?;
        assert!(handle.shown().iter().all(|p| *p == RGB8::default()));
        assert_eq!(2, handle.clears());

        Ok(())
    }

    #[test]
    fn test_out_of_range_is_rejected() {
        let handle = MemoryStrip::new("test", 2);
        let mut strip = handle.clone();

        strip.set_pixel(2, RGB8::new(1, 1, 1));
        assert_eq!(1, handle.out_of_range());
        assert_eq!(vec![2], handle.writes());
    }
}
