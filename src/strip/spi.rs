//! WS2812 output over an SPI bus.
//!
//! Every data bit is stretched to three SPI bits (`110` for a one, `100` for
//! a zero) clocked at three times the strip's signal frequency, so the MOSI
//! line reproduces the strip's pulse timing. Pixels go out in GRB order.

#[cfg(feature = "pi")]
use anyhow::{anyhow, Error};
#[cfg(feature = "pi")]
use log::info;
#[cfg(feature = "pi")]
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use smart_leds::RGB8;

#[cfg(feature = "pi")]
use super::{Strip, StripDriver};

/// Zero bytes after a frame so the strip latches it
const LATCH_BYTES: usize = 40;

/// SPI bits per strip data bit
const SPI_BITS_PER_BIT: u32 = 3;

/// The SPI bus whose MOSI line sits on this BCM GPIO pin
pub fn spi_bus(pin: u8) -> Option<u8> {
    match pin {
        10 => Some(0),
        20 => Some(1),
        2 => Some(3),
        6 => Some(4),
        14 => Some(5),
        _ => None,
    }
}

pub fn encode_byte(byte: u8) -> [u8; 3] {
    let mut pattern: u32 = 0;
    for bit in (0..8).rev() {
        let symbol = if byte & (1 << bit) != 0 { 0b110 } else { 0b100 };
        pattern = (pattern << SPI_BITS_PER_BIT) | symbol;
    }

    let bytes = pattern.to_be_bytes();
    [bytes[1], bytes[2], bytes[3]]
}

/// Encode a whole frame, latch included
pub fn encode_frame(pixels: &[RGB8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(pixels.len() * 9 + LATCH_BYTES);
    for pixel in pixels {
        for channel in [pixel.g, pixel.r, pixel.b] {
            frame.extend_from_slice(&encode_byte(channel));
        }
    }
    frame.resize(frame.len() + LATCH_BYTES, 0);
    frame
}

#[cfg(feature = "pi")]
pub struct SpiStrip {
    name: String,
    spi: Option<Spi>,
    bus: Bus,
    clock_hz: u32,
    buffer: Vec<RGB8>,
}

#[cfg(feature = "pi")]
impl SpiStrip {
    pub fn new(strip: &Strip) -> Result<Self, Error> {
        let bus = match spi_bus(strip.pin) {
            Some(0) => Bus::Spi0,
            Some(1) => Bus::Spi1,
            Some(3) => Bus::Spi3,
            Some(4) => Bus::Spi4,
            Some(5) => Bus::Spi5,
            _ => {
                return Err(anyhow!(
                    "Strip {}: pin {} is not an SPI MOSI pin",
                    strip.name,
                    strip.pin
                ))
            }
        };

        Ok(Self {
            name: strip.name.clone(),
            spi: None,
            bus,
            clock_hz: strip.frequency_hz * SPI_BITS_PER_BIT,
            buffer: vec![RGB8::default(); strip.count],
        })
    }

    fn spi(&mut self) -> Result<&mut Spi, Error> {
        self.spi
            .as_mut()
            .ok_or_else(|| anyhow!("Strip {}: written before init", self.name))
    }
}

#[cfg(feature = "pi")]
impl StripDriver for SpiStrip {
    fn init(&mut self) -> Result<(), Error> {
        info!(
            "Strip {}: opening {:?} at {} Hz for {} pixels",
            self.name,
            self.bus,
            self.clock_hz,
            self.buffer.len()
        );
        self.spi = Some(Spi::new(
            self.bus,
            SlaveSelect::Ss0,
            self.clock_hz,
            Mode::Mode0,
        )?);
        Ok(())
    }

    fn set_pixel(&mut self, index: usize, color: RGB8) {
        if let Some(pixel) = self.buffer.get_mut(index) {
            *pixel = color;
        }
    }

    fn show(&mut self) -> Result<(), Error> {
        let frame = encode_frame(&self.buffer);
        self.spi()?.write(&frame)?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), Error> {
        self.buffer.fill(RGB8::default());
        self.show()
    }

    fn len(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_byte() {
        assert_eq!([0x92, 0x49, 0x24], encode_byte(0x00));
        assert_eq!([0xDB, 0x6D, 0xB6], encode_byte(0xFF));
        // 1000_0000 -> 110 100 100 100 100 100 100 100
        assert_eq!([0xD2, 0x49, 0x24], encode_byte(0x80));
    }

    #[test]
    fn test_encode_frame_is_grb_with_latch() {
        let frame = encode_frame(&[RGB8::new(0xFF, 0x00, 0x80)]);

        assert_eq!(9 + LATCH_BYTES, frame.len());
        assert_eq!(encode_byte(0x00), frame[0..3]);
        assert_eq!(encode_byte(0xFF), frame[3..6]);
        assert_eq!(encode_byte(0x80), frame[6..9]);
        assert!(frame[9..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_spi_bus() {
        assert_eq!(Some(0), spi_bus(10));
        assert_eq!(Some(1), spi_bus(20));
        assert_eq!(None, spi_bus(18));
    }
}
