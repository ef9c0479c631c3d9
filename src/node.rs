/*!
    board side of the link

    [Node] accepts frames one at a time from its bus, checks them, dispatches their payload to the [Registry] and answers with [Ack] bytes.
    Any refused frame is answered with a [Ack::Nack] and the node goes back to waiting for a start byte, nothing is kept from one frame to the next.
*/

use embedded_io_async::{Read, Write, ReadExactError};
use log::*;

use crate::{
    frame::{self, Ack, FrameError, Header, Mode, HEADER_SIZE, MAX_PAYLOAD},
    devices::{Registry, WriteDevice, ReadDevice, WriteTarget, ReadTarget, DeviceFault},
    };


/// error stopping the node, only the bus can fail this way
#[derive(Debug, PartialEq)]
pub enum Error<E> {
    /// the bus itself failed
    Bus(E),
    /// the bus reached its end in the middle of a frame
    Closed,
}
impl<E> From<ReadExactError<E>> for Error<E> {
    fn from(error: ReadExactError<E>) -> Self {
        match error {
            ReadExactError::UnexpectedEof => Self::Closed,
            ReadExactError::Other(io) => Self::Bus(io),
        }
    }
}

/// what became of a frame
#[derive(Debug, PartialEq)]
pub enum Outcome {
    /// payload received and handed to an output
    Written {target: WriteTarget, fault: Option<DeviceFault>},
    /// payload sampled and sent back, stop byte confirmed
    Read {target: ReadTarget, fault: Option<DeviceFault>},
    /// frame answered with a nack
    Rejected(FrameError),
}

/// payload storage of the frame in progress
type Payload = heapless::Vec<u8, MAX_PAYLOAD>;

/// frame acceptor of a board
pub struct Node<B, L, D, A> {
    bus: B,
    registry: Registry<L, D, A>,
    limit: usize,
}
impl<B, L, D, A> Node<B, L, D, A>
where
    B: Read + Write,
    L: WriteDevice,
    D: WriteDevice,
    A: ReadDevice,
{
    pub fn new(bus: B, registry: Registry<L, D, A>) -> Self {
        Self {bus, registry, limit: MAX_PAYLOAD}
    }
    /// refuse payloads bigger than the given size, they are answered as allocation failures
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.min(MAX_PAYLOAD);
        self
    }
    pub fn registry(&self) -> &Registry<L, D, A> {&self.registry}
    pub fn into_parts(self) -> (B, Registry<L, D, A>) {(self.bus, self.registry)}

    /// process frames forever, only returns when the bus fails
    pub async fn run(&mut self) -> Result<(), Error<B::Error>> {
        loop {
            match self.cycle().await? {
                Outcome::Rejected(reason) => warn!("frame rejected: {}", reason),
                outcome => info!("frame done: {:?}", outcome),
            }
        }
    }

    /// wait for the next frame and process it entirely
    pub async fn cycle(&mut self) -> Result<Outcome, Error<B::Error>> {
        let raw = self.catch_header().await?;
        debug!("receive header {:02x?}", raw);

        let (header, mode) = match frame::decode_header(raw)
            .and_then(|header| Ok((header, header.validate()?)))
        {
            Ok(accepted) => accepted,
            Err(reason) => return self.reject(reason).await,
        };
        // the payload buffer only lives for this frame
        let length = usize::from(header.length);
        let mut buffer = Payload::new();
        if length > self.limit || buffer.resize(length, 0).is_err() {
            return self.reject(FrameError::AllocationFailure(header.length)).await;
        }
        match mode {
            Mode::Read => self.read_flow(header, buffer).await,
            Mode::Write => self.write_flow(header, buffer).await,
        }
    }

    /// skip bytes until a start byte, then take the rest of the header unconditionally
    async fn catch_header(&mut self) -> Result<[u8; HEADER_SIZE], Error<B::Error>> {
        let mut raw = [0; HEADER_SIZE];
        debug!("waiting header");
        loop {
            self.bus.read_exact(&mut raw[.. 1]).await?;
            if raw[0] == frame::START
                {break}
            trace!("skip {:#04x}", raw[0]);
        }
        self.bus.read_exact(&mut raw[1 ..]).await?;
        Ok(raw)
    }

    async fn write_flow(&mut self, header: Header, mut buffer: Payload) -> Result<Outcome, Error<B::Error>> {
        self.reply(Ack::Ack).await?;
        debug!("receive {} bytes", buffer.len());
        self.bus.read_exact(&mut buffer).await?;
        let stop = self.receive_byte().await?;
        if !frame::validate_stop(stop) {
            return self.reject(FrameError::StopByte(stop)).await;
        }
        self.reply(Ack::Ack).await?;

        let target = Registry::<L, D, A>::write_target(header.identifier);
        debug!("write to {:?}", target);
        let fault = self.registry.write(header.identifier, &buffer).await.err();
        Ok(Outcome::Written {target, fault})
    }

    async fn read_flow(&mut self, header: Header, mut buffer: Payload) -> Result<Outcome, Error<B::Error>> {
        self.reply(Ack::Ack).await?;

        let target = Registry::<L, D, A>::read_target(header.identifier);
        debug!("read {} bytes from {:?}", buffer.len(), target);
        let fault = self.registry.read(header.identifier, &mut buffer).await.err();
        self.bus.write_all(&buffer).await.map_err(Error::Bus)?;
        self.bus.flush().await.map_err(Error::Bus)?;
        drop(buffer);

        let stop = self.receive_byte().await?;
        if !frame::validate_stop(stop) {
            return self.reject(FrameError::StopByte(stop)).await;
        }
        self.reply(Ack::Ack).await?;
        Ok(Outcome::Read {target, fault})
    }

    async fn reject(&mut self, reason: FrameError) -> Result<Outcome, Error<B::Error>> {
        debug!("reject frame: {}", reason);
        self.reply(Ack::Nack).await?;
        Ok(Outcome::Rejected(reason))
    }

    async fn reply(&mut self, ack: Ack) -> Result<(), Error<B::Error>> {
        self.bus.write_all(&[ack as u8]).await.map_err(Error::Bus)?;
        self.bus.flush().await.map_err(Error::Bus)
    }

    async fn receive_byte(&mut self) -> Result<u8, Error<B::Error>> {
        let mut byte = [0];
        self.bus.read_exact(&mut byte).await?;
        Ok(byte[0])
    }
}
