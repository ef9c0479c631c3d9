/*!
    capabilities a node exposes to the frames addressed to it

    the 2 device bits of a frame identifier select the capability through fixed tables:

    | device | write      | read |
    |--------|------------|------|
    | 0      | [Leds]     | [Adc] |
    | 1      | [Lcd]      | [Adc] |
    | 2      | [Lcd]      | [Adc] |
    | 3      | [Lcd]      | [Adc] |

    the hardware itself stays behind small traits ([OutputPin], [DelayNs], [CharacterDisplay], [Converter]) so the same capabilities run on the board and in tests
*/

use core::fmt::{Debug, Write as _};
use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use heapless::String;
use log::*;
use thiserror::Error;

use crate::frame::Identifier;


/// capability receiving the payload of a write frame
#[allow(async_fn_in_trait)]
pub trait WriteDevice {
    type Error: Debug;
    async fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;
}
/// capability filling the payload of a read frame
#[allow(async_fn_in_trait)]
pub trait ReadDevice {
    type Error: Debug;
    async fn read(&mut self, buffer: &mut [u8]) -> Result<(), Self::Error>;
}

/// capabilities reachable by write frames
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WriteTarget {
    Led,
    Lcd,
}
/// capabilities reachable by read frames
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReadTarget {
    Adc,
}

/// write capability per device id, only device 0 drives the leds and every other id falls back to the lcd
pub const WRITE_TABLE: [WriteTarget; 4] = [
    WriteTarget::Led,
    WriteTarget::Lcd,
    WriteTarget::Lcd,
    WriteTarget::Lcd,
    ];
/// read capability per device id, the adc is the only input
pub const READ_TABLE: [ReadTarget; 4] = [ReadTarget::Adc; 4];

/// a capability failed after its frame was acknowledged
#[derive(Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeviceFault {
    #[error("led output failed")]
    Led,
    #[error("lcd output failed")]
    Lcd,
    #[error("adc conversion failed")]
    Adc,
}


/// the set of capabilities of a board
pub struct Registry<L, D, A> {
    pub led: L,
    pub lcd: D,
    pub adc: A,
}
impl<L: WriteDevice, D: WriteDevice, A: ReadDevice> Registry<L, D, A> {
    pub fn new(led: L, lcd: D, adc: A) -> Self {
        Self {led, lcd, adc}
    }
    pub fn write_target(identifier: Identifier) -> WriteTarget {
        WRITE_TABLE[identifier.index()]
    }
    pub fn read_target(identifier: Identifier) -> ReadTarget {
        READ_TABLE[identifier.index()]
    }
    /// hand a received payload to the capability selected by the identifier
    pub async fn write(&mut self, identifier: Identifier, data: &[u8]) -> Result<(), DeviceFault> {
        match Self::write_target(identifier) {
            WriteTarget::Led => self.led.write(data).await.map_err(|err| {
                warn!("led output failed: {:?}", err);
                DeviceFault::Led
                }),
            WriteTarget::Lcd => self.lcd.write(data).await.map_err(|err| {
                warn!("lcd output failed: {:?}", err);
                DeviceFault::Lcd
                }),
        }
    }
    /// fill a payload from the capability selected by the identifier
    pub async fn read(&mut self, identifier: Identifier, buffer: &mut [u8]) -> Result<(), DeviceFault> {
        match Self::read_target(identifier) {
            ReadTarget::Adc => self.adc.read(buffer).await.map_err(|err| {
                warn!("adc conversion failed: {:?}", err);
                DeviceFault::Adc
                }),
        }
    }
}


/// default time each led pattern stays visible
pub const LED_INTERVAL_MS: u32 = 500;

/**
    bank of 8 leds, each payload byte is shown in turn as a bit pattern

    bit `i` of a byte drives line `i`
*/
pub struct Leds<P, T> {
    lines: [P; 8],
    delay: T,
    interval_ms: u32,
}
impl<P: OutputPin, T: DelayNs> Leds<P, T> {
    pub fn new(lines: [P; 8], delay: T) -> Self {
        Self {lines, delay, interval_ms: LED_INTERVAL_MS}
    }
    pub fn with_interval(mut self, interval_ms: u32) -> Self {
        self.interval_ms = interval_ms;
        self
    }
    /// latch a pattern on the lines
    pub fn show(&mut self, pattern: u8) -> Result<(), P::Error> {
        for (bit, line) in self.lines.iter_mut().enumerate() {
            if pattern & (1 << bit) != 0
                {line.set_high()?}
            else
                {line.set_low()?}
        }
        Ok(())
    }
}
impl<P: OutputPin, T: DelayNs> WriteDevice for Leds<P, T> {
    type Error = P::Error;
    async fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        for &pattern in data {
            self.show(pattern)?;
            self.delay.delay_ms(self.interval_ms).await;
        }
        Ok(())
    }
}


/// text display with a cursor, as found on character lcds
pub trait CharacterDisplay {
    type Error: Debug;
    fn clear(&mut self) -> Result<(), Self::Error>;
    fn set_cursor(&mut self, column: u8, line: u8) -> Result<(), Self::Error>;
    fn write_str(&mut self, text: &str) -> Result<(), Self::Error>;
}

/// characters per lcd line
pub const LCD_COLUMNS: usize = 16;
/// payload bytes shown per lcd line, each takes two hexadecimal digits
pub const LCD_BYTES_PER_LINE: usize = LCD_COLUMNS / 2;

/**
    two-line character lcd showing payloads in hexadecimal

    the first 8 bytes go on the first line, the next 8 on the second line, the rest is not shown
*/
pub struct Lcd<C> {
    display: C,
}
impl<C: CharacterDisplay> Lcd<C> {
    pub fn new(display: C) -> Self {
        Self {display}
    }
    pub fn display(&self) -> &C {&self.display}
}
impl<C: CharacterDisplay> WriteDevice for Lcd<C> {
    type Error = C::Error;
    async fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.display.clear()?;
        let (first, second) = data.split_at(data.len().min(LCD_BYTES_PER_LINE));
        self.display.write_str(&hex_line(first))?;
        if !second.is_empty() {
            self.display.set_cursor(0, 1)?;
            self.display.write_str(&hex_line(second))?;
        }
        Ok(())
    }
}

/// uppercase hexadecimal text of the bytes fitting on one lcd line
pub fn hex_line(bytes: &[u8]) -> String<LCD_COLUMNS> {
    let mut line = String::new();
    for byte in bytes.iter().take(LCD_BYTES_PER_LINE) {
        // 2 digits per byte always fit in the line
        let _ = write!(line, "{:02X}", byte);
    }
    line
}


/// analog to digital converter channel
#[allow(async_fn_in_trait)]
pub trait Converter {
    type Error: Debug;
    /// start a conversion and wait for its 10 bit result
    async fn convert(&mut self) -> Result<u16, Self::Error>;
}

/// adc input, sampled once per requested byte
pub struct Adc<C> {
    converter: C,
}
impl<C: Converter> Adc<C> {
    pub fn new(converter: C) -> Self {
        Self {converter}
    }
}
impl<C: Converter> ReadDevice for Adc<C> {
    type Error = C::Error;
    async fn read(&mut self, buffer: &mut [u8]) -> Result<(), Self::Error> {
        for byte in buffer.iter_mut() {
            // only the low byte of the conversion is transmitted
            *byte = (self.converter.convert().await? & 0xFF) as u8;
        }
        Ok(())
    }
}
