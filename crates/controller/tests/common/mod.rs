#![allow(dead_code)]

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use zwave_console_serial_link::{LinkError, LinkStreams, PortProvider, SerialLink, SerialSettings};

pub const ACK: u8 = 0x06;
pub const NAK: u8 = 0x15;

/// Controller side of a fake serial link: bytes pushed into `tx` are read by
/// the driver, bytes the driver writes accumulate in `written`.
pub struct Wire {
    pub tx: Sender<Vec<u8>>,
    pub written: Arc<Mutex<Vec<u8>>>,
}

/// What the host wrote, split into acknowledgements and request frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Ack,
    Nak,
    Request(u8, Vec<u8>),
}

impl Wire {
    pub fn sent(&self) -> Vec<Sent> {
        parse_sent(&self.written.lock())
    }

    pub fn requests(&self) -> Vec<(u8, Vec<u8>)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Request(f, p) => Some((f, p)),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.written.lock().clear();
    }

    pub fn respond(&self, function: u8, payload: &[u8]) {
        self.tx.send(frame(0x01, function, payload)).unwrap();
    }

    pub fn callback(&self, function: u8, payload: &[u8]) {
        self.tx.send(frame(0x00, function, payload)).unwrap();
    }
}

struct ChannelReader {
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            match self.rx.recv_timeout(Duration::from_millis(20)) {
                Ok(bytes) => self.pending = bytes,
                Err(RecvTimeoutError::Timeout) => return Err(io::ErrorKind::TimedOut.into()),
                Err(RecvTimeoutError::Disconnected) => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

struct SharedWriter(Arc<Mutex<Vec<u8>>>);

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A writer that fails every write.
pub struct BrokenWriter;

impl Write for BrokenWriter {
    fn write(&mut self, _: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn wire() -> (Wire, LinkStreams) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let written = Arc::new(Mutex::new(Vec::new()));
    let streams = LinkStreams {
        reader: Box::new(ChannelReader {
            rx,
            pending: Vec::new(),
        }),
        writer: Box::new(SharedWriter(Arc::clone(&written))),
    };
    (Wire { tx, written }, streams)
}

/// A data frame of `kind` (0 request, 1 response) with a valid checksum.
pub fn frame(kind: u8, function: u8, payload: &[u8]) -> Vec<u8> {
    let len = u8::try_from(payload.len() + 3).unwrap();
    let mut out = vec![0x01, len, kind, function];
    out.extend_from_slice(payload);
    let checksum = out[1..].iter().fold(0xFF, |acc, b| acc ^ b);
    out.push(checksum);
    out
}

fn parse_sent(bytes: &[u8]) -> Vec<Sent> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            ACK => {
                out.push(Sent::Ack);
                i += 1;
            }
            NAK => {
                out.push(Sent::Nak);
                i += 1;
            }
            0x01 => {
                let len = usize::from(bytes[i + 1]);
                let body = &bytes[i + 2..i + 2 + len];
                out.push(Sent::Request(body[1], body[2..len - 1].to_vec()));
                i += 2 + len;
            }
            other => panic!("unexpected byte 0x{other:02x} in host output"),
        }
    }
    out
}

/// Poll `cond` until it holds or two seconds pass.
pub fn wait_for(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(5));
    }
}

/// `GetInitData` response listing `nodes`, chip ZW0500.
pub fn init_data(nodes: &[u8]) -> Vec<u8> {
    let mut mask = [0u8; 29];
    for &id in nodes {
        let bit = usize::from(id - 1);
        mask[bit / 8] |= 1 << (bit % 8);
    }
    let mut payload = vec![0x05, 0x08, 29];
    payload.extend(mask);
    payload.extend([0x05, 0x00]);
    payload
}

/// A single port whose link hands out prepared streams once.
pub struct WirePort {
    name: String,
    streams: Mutex<Option<LinkStreams>>,
    pub open: Arc<AtomicBool>,
}

impl WirePort {
    pub fn new(name: &str, streams: LinkStreams) -> Self {
        Self {
            name: name.to_string(),
            streams: Mutex::new(Some(streams)),
            open: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

impl PortProvider for WirePort {
    fn list_ports(&self) -> Vec<String> {
        vec![self.name.clone()]
    }

    fn open(&self, name: &str, _timeout: Duration) -> Result<Box<dyn SerialLink>, LinkError> {
        if name != self.name {
            return Err(LinkError::PortNotFound {
                port: name.to_string(),
            });
        }
        self.open.store(true, Ordering::SeqCst);
        Ok(Box::new(WireLink {
            name: self.name.clone(),
            streams: self.streams.lock().take(),
            open: Arc::clone(&self.open),
        }))
    }
}

struct WireLink {
    name: String,
    streams: Option<LinkStreams>,
    open: Arc<AtomicBool>,
}

impl SerialLink for WireLink {
    fn name(&self) -> &str {
        &self.name
    }

    fn configure(&mut self, _settings: &SerialSettings) -> Result<(), LinkError> {
        Ok(())
    }

    fn set_receive_timeout(&mut self, _timeout: Duration) -> Result<(), LinkError> {
        Ok(())
    }

    fn split(&mut self) -> Result<LinkStreams, LinkError> {
        self.streams.take().ok_or_else(|| LinkError::Closed {
            port: self.name.clone(),
        })
    }

    fn close(&mut self) {
        self.open.store(false, Ordering::SeqCst);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}
