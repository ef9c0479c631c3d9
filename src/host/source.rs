use std::{
    fs::{self, OpenOptions},
    io::{Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    vec::Vec,
    };
use log::*;

use crate::frame::{self, Header, Identifier, Mode, HEADER_SIZE, STOP};
use super::Error;


/// a complete frame as defined by the host, the node answers are not part of it
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub header: Header,
    /// data to write, or room for the data read
    pub payload: Vec<u8>,
    /// byte closing the payload, [STOP] for a well formed frame
    pub stop: u8,
}
impl Frame {
    pub fn new(header: Header, payload: Vec<u8>, stop: u8) -> Result<Self, Error> {
        if payload.len() != usize::from(header.length) {
            return Err(Error::Source("payload size differs from header"));
        }
        Ok(Self {header, payload, stop})
    }
    /// well formed frame writing the given data to a device
    pub fn write(identifier: Identifier, data: &[u8]) -> Result<Self, Error> {
        let length = u8::try_from(data.len())
            .map_err(|_| Error::Source("payload is longer than maximum allowed"))?;
        Self::new(Header::new(identifier, length, Mode::Write as u8), data.to_vec(), STOP)
    }
    /// well formed frame reading the given amount of bytes from a device
    pub fn read(identifier: Identifier, length: u8) -> Self {
        Self {
            header: Header::new(identifier, length, Mode::Read as u8),
            payload: std::vec![0; usize::from(length)],
            stop: STOP,
        }
    }

    /**
        parse a frame from its raw bytes: header, payload, stop byte

        bytes after the stop byte are ignored. Only the start byte is checked, a node would never answer a frame without it
    */
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let raw: [u8; HEADER_SIZE] = bytes.get(.. HEADER_SIZE)
            .and_then(|raw| raw.try_into().ok())
            .ok_or(Error::Source("shorter than a frame header"))?;
        let header = frame::decode_header(raw)
            .map_err(|_| Error::Source("frame does not begin with a start byte"))?;
        let body = &bytes[HEADER_SIZE ..];
        let length = usize::from(header.length);
        if body.len() <= length {
            return Err(Error::Source("frame ends before its stop byte"));
        }
        Ok(Self {
            header,
            payload: body[.. length].to_vec(),
            stop: body[length],
        })
    }
    /// raw bytes of the frame, as stored in a frame file
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE + self.payload.len() + 1);
        bytes.extend_from_slice(&self.header.encode());
        bytes.extend_from_slice(&self.payload);
        bytes.push(self.stop);
        bytes
    }
}


/**
    file holding one frame as raw bytes

    the file is read again on each [Self::load] so it can be edited between exchanges. Data received by read frames is written back in place of the payload.
*/
#[derive(Clone, Debug)]
pub struct FrameFile {
    path: PathBuf,
}
impl FrameFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {path: path.as_ref().to_path_buf()}
    }
    pub fn path(&self) -> &Path {&self.path}

    pub fn load(&self) -> Result<Frame, Error> {
        let bytes = fs::read(&self.path).map_err(Error::File)?;
        debug!("loaded {} bytes from {}", bytes.len(), self.path.display());
        Frame::decode(&bytes)
    }
    /// overwrite the whole file with the given frame
    pub fn save(&self, frame: &Frame) -> Result<(), Error> {
        fs::write(&self.path, frame.encode()).map_err(Error::File)
    }
    /// write the frame payload in place of the one in file, leaving header and stop byte untouched
    pub fn store_payload(&self, frame: &Frame) -> Result<(), Error> {
        let mut file = OpenOptions::new().write(true).open(&self.path).map_err(Error::File)?;
        file.seek(SeekFrom::Start(HEADER_SIZE as u64)).map_err(Error::File)?;
        file.write_all(&frame.payload).map_err(Error::File)?;
        debug!("stored {} bytes in {}", frame.payload.len(), self.path.display());
        Ok(())
    }
}
