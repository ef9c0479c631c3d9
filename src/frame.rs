/*!
    frame layout shared by both ends of the link

    ```text
    offset 0      start       0xFE
    offset 1      identifier  board (6 high bits) | device (2 low bits)
    offset 2      length      payload size, 0 - 255
    offset 3      mode        0x01 read, 0x02 write
    offset 4..8   reserved    carried but never interpreted
    offset 8..    payload     `length` bytes, direction depends on mode
    after payload stop        0x01
    ```

    the receiver of the header and the receiver of the stop byte each answer with a single [Ack] byte.
*/

use bilge::prelude::*;
use packbytes::{FromBytes, ToBytes, ByteArray};
use thiserror::Error;

use crate::pack_bits;


/// first byte of every frame
pub const START: u8 = 0xFE;
/// byte terminating the payload section
pub const STOP: u8 = 0x01;
/// board identifier this node answers to, compared to the masked identifier
pub const BID: u8 = 0x00;
/// identifier bits holding the board identifier
pub const BOARD_MASK: u8 = 0xFC;
/// identifier bits holding the device identifier
pub const DEVICE_MASK: u8 = 0x03;
/// size of the header on the wire, start byte included
pub const HEADER_SIZE: usize = 8;
/// biggest payload a header can announce
pub const MAX_PAYLOAD: usize = u8::MAX as usize;


/// frame header, in wire order
#[derive(Copy, Clone, FromBytes, ToBytes, Debug, PartialEq)]
pub struct Header {
    /// frame boundary, always [START] once decoded
    pub start: u8,
    /// addressed board and device
    pub identifier: Identifier,
    /// number of payload bytes following the header
    pub length: u8,
    /// raw mode byte, see [Mode]
    pub mode: u8,
    /// future use
    pub reserved: [u8; 4],
}

/// addressing byte of a header
#[bitsize(8)]
#[derive(Copy, Clone, FromBits, DebugBits, PartialEq)]
pub struct Identifier {
    /// selects the capability on the board, see [crate::devices] tables
    pub device: u2,
    /// must match [BID] for the board to accept the frame
    pub board: u6,
}
pack_bits!(Identifier);

/// direction of the payload
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode {
    /// the node samples its input and sends the payload to the host
    Read = 0x01,
    /// the host sends the payload to one of the node outputs
    Write = 0x02,
}

/// single byte answer to a header or to a stop byte
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Ack {
    Ack = 0x0F,
    Nack = 0xF0,
}

/// reasons for a frame to be refused, all of them are answered with [Ack::Nack]
#[derive(Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameError {
    #[error("expected start byte, got {0:#04x}")]
    BadStart(u8),
    #[error("identifier {0:#04x} does not address this board")]
    BadBoardId(u8),
    #[error("unknown mode {0:#04x}")]
    BadMode(u8),
    #[error("no room for a payload of {0} bytes")]
    AllocationFailure(u8),
    #[error("expected stop byte, got {0:#04x}")]
    StopByte(u8),
}


impl Header {
    pub fn new(identifier: Identifier, length: u8, mode: u8) -> Self {
        Self {
            start: START,
            identifier,
            length,
            mode,
            reserved: [0; 4],
        }
    }
    /// header bytes as sent on the wire
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut raw = [0; HEADER_SIZE];
        raw.copy_from_slice(self.to_be_bytes().as_ref());
        raw
    }
    /// payload direction, if the mode byte is one of the known ones
    pub fn mode(&self) -> Option<Mode> {
        Mode::from_byte(self.mode)
    }
    /// check the header addresses this board with a known mode, board is checked first
    pub fn validate(&self) -> Result<Mode, FrameError> {
        let identifier = u8::from(self.identifier);
        if !validate_board(identifier) {
            return Err(FrameError::BadBoardId(identifier));
        }
        self.mode().ok_or(FrameError::BadMode(self.mode))
    }
}

impl Identifier {
    /// identifier addressing the given device on this board
    pub fn device_on_board(device: u8) -> Self {
        Self::from(BID | (device & DEVICE_MASK))
    }
    /// device index in the dispatch tables
    pub fn index(&self) -> usize {
        usize::from(self.device().value())
    }
}

impl Mode {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Read),
            0x02 => Some(Self::Write),
            _ => None,
        }
    }
}

impl Ack {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x0F => Some(Self::Ack),
            0xF0 => Some(Self::Nack),
            _ => None,
        }
    }
}


/**
    decode a header from its wire bytes

    the whole header is consumed even if the start byte is wrong, there is no backtracking
*/
pub fn decode_header(raw: [u8; HEADER_SIZE]) -> Result<Header, FrameError> {
    if raw[0] != START {
        return Err(FrameError::BadStart(raw[0]));
    }
    let mut bytes = <Header as FromBytes>::Bytes::zeroed();
    bytes.as_mut().copy_from_slice(&raw);
    Ok(Header::from_be_bytes(bytes))
}

/// true if the identifier's board bits address this board
pub fn validate_board(identifier: u8) -> bool {
    identifier & BOARD_MASK == BID
}
/// true for the two modes the protocol knows
pub fn validate_mode(mode: u8) -> bool {
    Mode::from_byte(mode).is_some()
}
/// true if the byte closes a payload
pub fn validate_stop(byte: u8) -> bool {
    byte == STOP
}
