/*!
    host and node talking to each other over an in-memory link

    each test runs the host exchanges alongside the node loop, then closes the host end so the node stops on its own
*/

use std::{
    collections::VecDeque,
    convert::Infallible,
    future::Future,
    };
use embedded_io_async::ErrorKind;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use framelink::{
    frame::{Header, Identifier, Mode, STOP},
    devices::{Registry, WriteDevice, Lcd, CharacterDisplay, Adc, Converter},
    node::{self, Node},
    host::{Host, Outcome, Frame, FrameFile},
    };


/// node side of a tokio duplex, seen as an embedded bus
struct Wire(DuplexStream);
impl embedded_io_async::ErrorType for Wire {
    type Error = ErrorKind;
}
impl embedded_io_async::Read for Wire {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
        self.0.read(buf).await.map_err(|_| ErrorKind::Other)
    }
}
impl embedded_io_async::Write for Wire {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, ErrorKind> {
        self.0.write(buf).await.map_err(|_| ErrorKind::Other)
    }
    async fn flush(&mut self) -> Result<(), ErrorKind> {
        self.0.flush().await.map_err(|_| ErrorKind::Other)
    }
}

#[derive(Default)]
struct Recorder(Vec<Vec<u8>>);
impl WriteDevice for Recorder {
    type Error = Infallible;
    async fn write(&mut self, data: &[u8]) -> Result<(), Infallible> {
        self.0.push(data.to_vec());
        Ok(())
    }
}

#[derive(Default)]
struct Screen {
    lines: [String; 2],
    line: usize,
}
impl CharacterDisplay for Screen {
    type Error = Infallible;
    fn clear(&mut self) -> Result<(), Infallible> {
        *self = Self::default();
        Ok(())
    }
    fn set_cursor(&mut self, _column: u8, line: u8) -> Result<(), Infallible> {
        self.line = usize::from(line);
        Ok(())
    }
    fn write_str(&mut self, text: &str) -> Result<(), Infallible> {
        self.lines[self.line].push_str(text);
        Ok(())
    }
}

struct Samples(VecDeque<u16>);
impl Converter for Samples {
    type Error = &'static str;
    async fn convert(&mut self) -> Result<u16, &'static str> {
        self.0.pop_front().ok_or("no more samples")
    }
}

type Board = Node<Wire, Recorder, Lcd<Screen>, Adc<Samples>>;

/// run the given host task against a fresh node, and return the node once the host is done
async fn session<F, T>(samples: &[u16], task: impl FnOnce(Host<DuplexStream>) -> F) -> (T, Board)
where F: Future<Output = (T, Host<DuplexStream>)>
{
    let (host_end, node_end) = tokio::io::duplex(512);
    let mut node = Node::new(Wire(node_end), Registry::new(
        Recorder::default(),
        Lcd::new(Screen::default()),
        Adc::new(Samples(samples.iter().copied().collect())),
        ));
    let (result, stopped) = tokio::join!(
        async {
            let (result, host) = task(Host::new(host_end)).await;
            // closing the link is what stops the node
            drop(host);
            result
        },
        node.run(),
        );
    assert_eq!(stopped, Err(node::Error::Closed));
    (result, node)
}


#[tokio::test]
async fn write_to_leds() {
    let (outcome, node) = session(&[], |mut host| async move {
        let mut frame = Frame::write(Identifier::device_on_board(0), &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        (host.exchange(&mut frame).await.unwrap(), host)
    }).await;
    assert_eq!(outcome, Outcome::Written);
    assert_eq!(node.registry().led.0, [[1, 2, 3, 4, 5, 6, 7, 8]]);
}

#[tokio::test]
async fn write_to_lcd() {
    let payload: Vec<u8> = (0xA0 .. 0xB0).collect();
    let (outcome, node) = session(&[], |mut host| async move {
        let mut frame = Frame::write(Identifier::device_on_board(1), &payload).unwrap();
        (host.exchange(&mut frame).await.unwrap(), host)
    }).await;
    assert_eq!(outcome, Outcome::Written);
    assert!(node.registry().led.0.is_empty());
    assert_eq!(node.registry().lcd.display().lines, ["A0A1A2A3A4A5A6A7", "A8A9AAABACADAEAF"]);
}

#[tokio::test]
async fn read_from_adc() {
    let (frame, _) = session(&[0xA1, 0xA2, 0xA3, 0xA4], |mut host| async move {
        let mut frame = Frame::read(Identifier::device_on_board(0), 4);
        assert_eq!(host.exchange(&mut frame).await.unwrap(), Outcome::Read);
        (frame, host)
    }).await;
    assert_eq!(frame.payload, [0xA1, 0xA2, 0xA3, 0xA4]);
}

#[tokio::test]
async fn retry_after_refused_header() {
    let (outcomes, node) = session(&[], |mut host| async move {
        let mut foreign = Frame::write(Identifier::from(0x04), &[0x11]).unwrap();
        let mut local = Frame::write(Identifier::device_on_board(0), &[0x22]).unwrap();
        let outcomes = [
            host.exchange(&mut foreign).await.unwrap(),
            host.exchange(&mut local).await.unwrap(),
            ];
        (outcomes, host)
    }).await;
    assert_eq!(outcomes, [Outcome::HeaderRejected, Outcome::Written]);
    assert_eq!(node.registry().led.0, [[0x22]]);
}

#[tokio::test]
async fn unknown_mode_is_refused() {
    let (outcome, node) = session(&[], |mut host| async move {
        let mut frame = Frame::new(Header::new(Identifier::device_on_board(0), 1, 0x03), vec![0x01], STOP).unwrap();
        (host.exchange(&mut frame).await.unwrap(), host)
    }).await;
    assert_eq!(outcome, Outcome::HeaderRejected);
    assert!(node.registry().led.0.is_empty());
}

#[tokio::test]
async fn bad_stop_is_not_dispatched() {
    let (outcomes, node) = session(&[0x10, 0x20], |mut host| async move {
        let header = Header::new(Identifier::device_on_board(0), 8, Mode::Write as u8);
        let mut write = Frame::new(header, vec![1, 2, 3, 4, 5, 6, 7, 8], 0xFF).unwrap();
        let mut read = Frame::read(Identifier::device_on_board(3), 2);
        read.stop = 0x00;
        let outcomes = [
            host.exchange(&mut write).await.unwrap(),
            host.exchange(&mut read).await.unwrap(),
            ];
        (outcomes, host)
    }).await;
    assert_eq!(outcomes, [Outcome::StopRejected, Outcome::StopRejected]);
    assert!(node.registry().led.0.is_empty());
}

#[tokio::test]
async fn read_into_frame_file() {
    let file = FrameFile::new(std::env::temp_dir().join(format!("framelink-exchange-{}", std::process::id())));
    file.save(&Frame::read(Identifier::device_on_board(0), 3)).unwrap();

    let source = &file;
    let (frame, _) = session(&[0x301, 0x302, 0x303], |mut host| async move {
        let mut frame = source.load().unwrap();
        assert_eq!(host.exchange(&mut frame).await.unwrap(), Outcome::Read);
        source.store_payload(&frame).unwrap();
        (frame, host)
    }).await;
    assert_eq!(frame.payload, [0x01, 0x02, 0x03]);

    let stored = file.load().unwrap();
    assert_eq!(stored.payload, [0x01, 0x02, 0x03]);
    assert_eq!(stored.header.mode(), Some(Mode::Read));
    assert_eq!(stored.stop, STOP);
    std::fs::remove_file(file.path()).unwrap();
}
