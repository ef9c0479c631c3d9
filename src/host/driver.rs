use serial2_tokio::{SerialPort, CharSize, StopBits, Parity};
use tokio::io::{AsyncRead, AsyncWrite, AsyncReadExt, AsyncWriteExt};
use std::path::Path;
use log::*;

use crate::frame::{Ack, Mode};
use super::{Error, Frame};


/**
    initiating end of the link

    a host sends one [Frame] at a time and waits for each answer of the node without timeout, the link being strictly half-duplex
*/
pub struct Host<B> {
    bus: B,
}

/// what the node answered to a frame
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// the header was refused, nothing else was exchanged
    HeaderRejected,
    /// the payload was delivered and its stop byte confirmed
    Written,
    /// the payload was received from the node and the stop byte confirmed
    Read,
    /// the payload went through but the node refused the stop byte
    StopRejected,
}

impl Host<SerialPort> {
    /// open the given serial port file with the given baud rate, raw 8N1
    pub fn open(path: impl AsRef<Path>, rate: u32) -> Result<Self, std::io::Error> {
        let bus = SerialPort::open(path, |mut settings: serial2_tokio::Settings| {
                settings.set_raw();
                settings.set_baud_rate(rate)?;
                settings.set_char_size(CharSize::Bits8);
                settings.set_stop_bits(StopBits::One);
                settings.set_parity(Parity::None);
                Ok(settings)
                })?;
        Ok(Self::new(bus))
    }
}

impl<B: AsyncRead + AsyncWrite + Unpin> Host<B> {
    pub fn new(bus: B) -> Self {
        Self {bus}
    }
    pub fn into_inner(self) -> B {self.bus}

    /**
        run one complete exchange of the given frame

        a read frame gets its payload replaced by the bytes sent by the node. Any mode other than read is sent as a write, as the node does.
    */
    pub async fn exchange(&mut self, frame: &mut Frame) -> Result<Outcome, Error> {
        let length = usize::from(frame.header.length);
        let read = frame.header.mode() == Some(Mode::Read);
        if !read && frame.payload.len() != length {
            return Err(Error::Source("payload size differs from header"));
        }

        let header = frame.header.encode();
        debug!("send header {:02x?}", header);
        self.bus.write_all(&header).await?;
        self.bus.flush().await?;
        if !self.acknowledged().await? {
            return Ok(Outcome::HeaderRejected);
        }

        if read {
            frame.payload.resize(length, 0);
            self.bus.read_exact(&mut frame.payload).await?;
            debug!("received {:02x?}", frame.payload);
            self.bus.write_all(&[frame.stop]).await?;
        }
        else {
            debug!("send payload {:02x?}", frame.payload);
            self.bus.write_all(&frame.payload).await?;
            self.bus.write_all(&[frame.stop]).await?;
        }
        self.bus.flush().await?;

        Ok(match (self.acknowledged().await?, read) {
            (false, _) => Outcome::StopRejected,
            (true, true) => Outcome::Read,
            (true, false) => Outcome::Written,
        })
    }

    /// wait for an answer byte, anything but an ack is a refusal
    async fn acknowledged(&mut self) -> Result<bool, Error> {
        let byte = self.bus.read_u8().await?;
        Ok(match Ack::from_byte(byte) {
            Some(Ack::Ack) => true,
            Some(Ack::Nack) => false,
            None => {
                warn!("unexpected answer {:#04x}, taken as nack", byte);
                false
            },
        })
    }
}
