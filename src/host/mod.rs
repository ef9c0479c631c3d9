/*!
    controller side of the link, in a `std` environment

    - [Host] drives one frame at a time over any tokio byte stream, usually a serial port opened with [Host::open]
    - [Frame] is the frame a host sends, and [FrameFile] keeps it on disk between exchanges
*/

/// the protocol state machine, initiating side
mod driver;
/// frames stored as raw bytes in files
mod source;


pub use driver::{Host, Outcome};
pub use source::{Frame, FrameFile};


use thiserror::Error;

/// error regarding the host side of the link
#[derive(Error, Debug)]
pub enum Error {
    #[error("problem with serial bus")]
    Bus(std::io::Error),
    #[error("problem accessing frame file")]
    File(std::io::Error),
    #[error("problem with frame source: {0}")]
    Source(&'static str),
}
impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Bus(error)
    }
}
