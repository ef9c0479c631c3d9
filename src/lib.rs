/*!
    half-duplex framing protocol between a host controller and a peripheral board

    - [frame] defines the wire layout, shared by both ends
    - [node] is the board side, accepting frames and dispatching them to the [devices]
    - [host] is the controller side, driving one frame at a time from a frame file
*/
#![cfg_attr(not(any(test, feature = "std")), no_std)]

mod utils;

pub mod frame;
#[cfg(feature = "node")]
pub mod devices;
#[cfg(feature = "node")]
pub mod node;
#[cfg(feature = "host")]
pub mod host;
