use std::{
    error::Error,
    path::PathBuf,
    };
use clap::Parser;
use log::*;
use tokio::io::{AsyncBufReadExt, BufReader};

use framelink::{
    frame::Mode,
    host::{Host, Outcome, FrameFile},
    };


/// send the frame stored in a file to a framelink node, each time enter is pressed
#[derive(Parser, Debug)]
#[command(name = "framelink-host", version, long_about = None)]
struct Args {
    /// serial port the node is connected to
    port: PathBuf,

    /// file holding the frame as raw bytes: header, payload, stop byte
    frame: PathBuf,

    /// baud rate of the serial port
    #[arg(short, long, default_value_t = 9600)]
    baud: u32,

    /// exit after the first exchange the node went through, instead of waiting for the next trigger
    #[arg(long, default_value_t = false)]
    once: bool,

    /// enable debug logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let mut logger = pretty_env_logger::formatted_builder();
    logger.filter_level(if args.verbose {LevelFilter::Debug} else {LevelFilter::Info});
    if let Ok(filters) = std::env::var("RUST_LOG") {
        logger.parse_filters(&filters);
    }
    logger.init();

    let source = FrameFile::new(&args.frame);
    info!("opening {} at {} bauds", args.port.display(), args.baud);
    let mut host = Host::open(&args.port, args.baud)?;

    let mut triggers = BufReader::new(tokio::io::stdin()).lines();
    loop {
        println!("press enter to send {}", source.path().display());
        if triggers.next_line().await?.is_none() {
            info!("input closed, exiting");
            return Ok(());
        }
        // reloaded each time, the file may have been edited meanwhile
        let mut frame = source.load()?;
        info!("send header {:02x?}", frame.header.encode());

        let outcome = host.exchange(&mut frame).await?;
        if frame.header.mode() == Some(Mode::Read) && outcome != Outcome::HeaderRejected {
            println!("read data: {:02x?}", frame.payload);
            source.store_payload(&frame)?;
        }
        match outcome {
            Outcome::HeaderRejected => {
                warn!("header refused by node");
                continue
            },
            Outcome::StopRejected => warn!("stop bits error"),
            Outcome::Written => info!("success, wrote {} bytes", frame.payload.len()),
            Outcome::Read => info!("success, read {} bytes", frame.payload.len()),
        }
        if args.once {
            return Ok(());
        }
    }
}
